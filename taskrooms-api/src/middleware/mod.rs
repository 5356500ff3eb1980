/// HTTP middleware for the API server
///
/// - [`security`]: security response headers on every response

pub mod security;
