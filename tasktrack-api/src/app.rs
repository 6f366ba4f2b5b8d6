/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_api::{app::{build_router, AppState}, config::Config};
/// use tasktrack_shared::notify::{LogMailer, Notifier};
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let notifier = Notifier::new(Arc::new(LogMailer), config.mail.from.clone());
/// let state = AppState::new(Arc::new(MemoryStore::new()), notifier, config);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_auth, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tasktrack_shared::{avatar::MAX_AVATAR_BYTES, notify::Notifier, store::Store};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Body limit on the avatar upload route
///
/// Well above the avatar size cap so oversized uploads are refused by the
/// avatar check with a 400 rather than by the transport with a 413.
pub const AVATAR_BODY_LIMIT: usize = 8 * MAX_AVATAR_BYTES;

/// Shared application state
///
/// Cloned per request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide persistence handle
    pub store: Arc<dyn Store>,

    pub notifier: Notifier,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier, config: Config) -> Self {
        Self {
            store,
            notifier,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET    /health
/// ├── POST   /users                  register
/// ├── POST   /users/login
/// ├── GET    /users/:id/avatar       public PNG
/// ├── GET    /users/me/avatar        always 404
/// └── (bearer token required)
///     ├── POST   /users/logout
///     ├── POST   /users/logoutAll
///     ├── GET    /users/me
///     ├── PATCH  /users/me
///     ├── DELETE /users/me
///     ├── POST   /users/me/avatar     multipart field "avatar"
///     ├── DELETE /users/me/avatar
///     ├── POST   /tasks
///     ├── GET    /tasks               ?completed&sortBy&limit&skip
///     ├── GET    /tasks/:id
///     ├── PATCH  /tasks/:id
///     └── DELETE /tasks/:id
/// ```
///
/// Layers, outermost first: security headers, CORS, tracing.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::register))
        .route("/users/login", post(routes::users::login))
        .route("/users/:id/avatar", get(routes::avatar::fetch))
        // `me` is not an id: public GET, answered like any malformed id
        .route("/users/me/avatar", get(routes::avatar::fetch));

    let protected_routes = Router::new()
        .route("/users/logout", post(routes::users::logout))
        .route("/users/logoutAll", post(routes::users::logout_all))
        .route(
            "/users/me",
            get(routes::users::profile)
                .patch(routes::users::update_profile)
                .delete(routes::users::delete_account),
        )
        .route(
            "/users/me/avatar",
            post(routes::avatar::upload)
                .delete(routes::avatar::remove)
                .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route(
            "/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
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
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
