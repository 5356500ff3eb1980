/// Authentication middleware for Axum
///
/// Validates the `Authorization: Bearer <token>` header on protected
/// routes and inserts an [`AuthUser`] into the request extensions for
/// handlers to extract.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskrooms_shared::auth::middleware::{create_jwt_middleware, AuthUser};
///
/// async fn handler(Extension(auth): Extension<AuthUser>) -> String {
///     format!("Hello, user {}!", auth.id)
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(handler))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Authenticated user ID
    pub id: Uuid,
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not a Bearer token
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };

        (
            status,
            Json(json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

/// JWT authentication middleware
///
/// Rejects the request with 401 when the header is missing or the token is
/// invalid or expired, and with 400 when the header is not a Bearer token.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::WrongTokenType { .. } => {
            AuthError::InvalidToken("Not an access token".to_string())
        }
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    req.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Captures the secret so the middleware can be installed with
/// `axum::middleware::from_fn`.
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_codes() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
