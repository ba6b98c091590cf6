/// Core error taxonomy
///
/// One vocabulary for every domain operation in this crate. Two variants
/// carry tenant-safety rules the API layer relies on:
///
/// - `NotFound` covers both "does not exist" and "exists in another
///   organization", so a response never confirms existence across the
///   tenant boundary. `NotMember` maps the same way at the boundary.
/// - `Forbidden` carries the organization id for server-side logging
///   only; user-facing messages must stay tenant-neutral.
///
/// `InvariantViolation` is a bug class, not user error: it means a write
/// would have broken organization consistency (for example a task whose
/// project belongs to a different organization than the stamped one).
/// Callers log it loudly and answer generically.

use thiserror::Error;
use uuid::Uuid;

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the domain layer
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tenant-scoped lookup miss: nonexistent or wrong organization
    #[error("Resource not found")]
    NotFound,

    /// Authenticated caller lacks membership or role in the organization
    #[error("Access to organization {0} denied")]
    Forbidden(Uuid),

    /// Rejected input: bad field, missing value, unmet precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Role string outside the assignable set
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The user already holds a membership in the organization
    #[error("User is already a member of this organization")]
    AlreadyMember,

    /// A pending invitation for (organization, email) already exists
    #[error("A pending invitation already exists for this email")]
    DuplicateInvitation,

    /// The user holds no membership in the organization
    #[error("User is not a member of this organization")]
    NotMember,

    /// Post-write verification of a role change disagreed with the write
    #[error("Role update verification failed")]
    RoleUpdateFailed,

    /// Invitation redemption failure, deliberately unspecific
    #[error("Invalid or expired invitation")]
    InvalidOrExpired,

    /// Organization-consistency breach; indicates a logic bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
