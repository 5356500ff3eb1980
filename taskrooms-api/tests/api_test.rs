/// Router-level tests for the TaskRooms API
///
/// These tests exercise the full middleware and routing stack with a
/// lazily-connected pool, covering everything that is decided before any
/// query runs: authentication, request validation, and response shape.
/// End-to-end tests against a real database live outside this suite.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPool;
use taskrooms_api::app::{build_router, AppState};
use taskrooms_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskrooms_shared::auth::jwt::{create_token, Claims, TokenType};
use tower::Service as _;
use uuid::Uuid;

const TEST_SECRET: &str = "integration-test-secret-key-32-bytes!";

fn test_app() -> axum::Router {
    let config = Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/taskrooms_test".to_string(),
            max_connections: 2,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
    };

    // Lazy pool: no connection is made until a handler runs a query
    let pool = PgPool::connect_lazy(&config.database.url).expect("lazy pool");

    build_router(AppState::new(pool, config))
}

/// Router backed by a live database; None when DATABASE_URL is unset
async fn live_app() -> Option<axum::Router> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPool::connect(&url).await.expect("connect");
    taskrooms_shared::db::migrations::run_migrations(&pool)
        .await
        .expect("migrations");

    let config = Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url,
            max_connections: 2,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
    };

    Some(build_router(AppState::new(pool, config)))
}

fn bearer(token_type: TokenType) -> String {
    let claims = Claims::new(Uuid::new_v4(), token_type);
    let token = create_token(&claims, TEST_SECRET).expect("token");
    format!("Bearer {}", token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let mut app = test_app();

    for uri in ["/api/tasks", "/api/rooms", "/api/users/profile"] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.call(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {}",
            uri
        );

        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthorized");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/users/profile")
        .header("authorization", "Token abc123")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/users/profile")
        .header("authorization", "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_as_access_token() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/users/profile")
        .header("authorization", bearer(TokenType::Refresh))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_failure() {
    let mut app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "not-an-email",
                "password": "short",
                "full_name": ""
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");

    let details = body["details"].as_array().expect("details array");
    let fields: Vec<&str> = details
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"full_name"));
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let mut app = test_app();

    // Long enough for the length validator, but no digit
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "user@example.com",
                "password": "onlyletters",
                "full_name": "Test User"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_invalid_room_filter_is_bad_request() {
    let mut app = test_app();

    for uri in ["/api/tasks?roomId=not-a-uuid", "/api/tasks/stats?roomId=nope"] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", bearer(TokenType::Access))
            .body(Body::empty())
            .unwrap();

        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "for {}", uri);

        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_short_search_query_is_bad_request() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/users/search?q=a")
        .header("authorization", bearer(TokenType::Access))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_invite_code_is_bad_request() {
    let mut app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/rooms/join")
        .header("authorization", bearer(TokenType::Access))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "invite_code": "ABC" }).to_string()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_room_and_task_creation_return_created() {
    let Some(mut app) = live_app().await else { return };

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": format!("{}@example.com", Uuid::new_v4()),
                "password": "sturdy-passw0rd",
                "full_name": "Test User"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let auth = format!(
        "Bearer {}",
        body_json(response).await["access_token"].as_str().unwrap()
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/rooms")
        .header("authorization", &auth)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Launch prep" }).to_string()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("authorization", &auth)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "title": "Write checklist" }).to_string()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let mut app = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_present() {
    let mut app = test_app();

    // Any response carries the security headers, including errors
    let request = Request::builder()
        .method("GET")
        .uri("/api/users/profile")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    assert!(headers.get("Content-Security-Policy").is_some());
    // HSTS only in production mode
    assert!(headers.get("Strict-Transport-Security").is_none());
}
