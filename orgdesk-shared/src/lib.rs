//! # Orgdesk Shared Library
//!
//! Shared types and business logic for the Orgdesk multi-tenant
//! project-management backend.
//!
//! ## Module Organization
//!
//! - `models`: database models and their CRUD operations
//! - `tenancy`: active-organization resolution and the tenant scope type
//! - `members`: organization membership management (attach, roles, removal)
//! - `invitations`: invitation issue/resolve/accept workflow
//! - `auth`: JWT and password primitives
//! - `storage`: blob store collaborator for document bytes
//! - `mailer`: invitation email collaborator
//! - `db`: connection pool and migration runner
//! - `error`: the core error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod invitations;
pub mod mailer;
pub mod members;
pub mod models;
pub mod storage;
pub mod tenancy;

pub use error::{CoreError, CoreResult};

/// Current version of the Orgdesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
