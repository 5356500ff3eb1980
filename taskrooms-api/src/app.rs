/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskrooms_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskrooms_shared::auth::middleware::create_jwt_middleware;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into each handler via Axum's `State` extractor; the pool and
/// config are both cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health                     # Health check (public)
/// └── /api/
///     ├── /auth/                  # Public
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── /users/                 # Authenticated
///     │   ├── GET  /profile
///     │   ├── PUT  /profile
///     │   ├── PUT  /password
///     │   ├── GET  /stats
///     │   └── GET  /search
///     ├── /rooms/                 # Authenticated
///     │   ├── GET    /
///     │   ├── POST   /
///     │   ├── POST   /join
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   ├── POST   /:id/leave
///     │   ├── GET    /:id/members
///     │   └── GET    /:id/stats
///     └── /tasks/                 # Authenticated
///         ├── GET    /
///         ├── POST   /
///         ├── GET    /stats
///         ├── GET    /room/:room_id
///         ├── GET    /:id
///         ├── PUT    /:id
///         └── DELETE /:id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public: no auth required
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let user_routes = Router::new()
        .route(
            "/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/password", put(routes::users::change_password))
        .route("/stats", get(routes::users::my_stats))
        .route("/search", get(routes::users::search_users));

    let room_routes = Router::new()
        .route(
            "/",
            get(routes::rooms::list_rooms).post(routes::rooms::create_room),
        )
        .route("/join", post(routes::rooms::join_room))
        .route(
            "/:id",
            get(routes::rooms::get_room)
                .put(routes::rooms::update_room)
                .delete(routes::rooms::delete_room),
        )
        .route("/:id/leave", post(routes::rooms::leave_room))
        .route("/:id/members", get(routes::rooms::list_members))
        .route("/:id/stats", get(routes::rooms::room_stats));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/stats", get(routes::tasks::task_stats))
        .route("/room/:room_id", get(routes::tasks::list_room_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    // Everything except /auth requires a valid access token
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/rooms", room_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn(create_jwt_middleware(
            state.config.jwt.secret.clone(),
        )));

    let api_routes = Router::new().nest("/auth", auth_routes).merge(protected);

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
