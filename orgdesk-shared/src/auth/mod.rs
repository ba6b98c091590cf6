/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
///
/// Tokens identify only the user. The active organization is never a
/// token claim; it is resolved from the database on every request (see
/// [`crate::tenancy`]), so a context switch or membership removal takes
/// effect immediately instead of at token expiry.

pub mod jwt;
pub mod password;
