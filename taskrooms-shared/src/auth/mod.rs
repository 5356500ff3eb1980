/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: access/refresh token generation and validation (HS256)
/// - [`middleware`]: Axum layer that turns a Bearer token into an [`middleware::AuthUser`]
/// - [`rules`]: pure role-based authorization decisions for rooms and tasks

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod rules;
