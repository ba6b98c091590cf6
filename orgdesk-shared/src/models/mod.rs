/// Database models for Orgdesk
///
/// Each model owns its CRUD operations. Tenant-owned models (project,
/// task, document, comment) take a [`crate::tenancy::TenantScope`] on
/// every read and write; the organization id is stamped from the scope,
/// never taken from caller input.
///
/// # Models
///
/// - `user`: accounts and the active-organization pointer
/// - `organization`: the tenant boundary
/// - `membership`: user-organization join with role
/// - `invitation`: pending membership offers with bearer tokens
/// - `project`, `task`, `document`, `comment`: tenant-owned domain data

pub mod comment;
pub mod document;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod project;
pub mod task;
pub mod user;
