//! FaturAi web server
//!
//! Axum REST API over the SQLite store: cookie sessions, transaction
//! persistence, CSV upload through the import pipeline, dashboard summaries.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use faturai_core::CategoryDictionary;
use faturai_import::{CategoryDetector, ImportOptions};
use faturai_storage::DbPool;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

mod auth;
mod handlers;

pub use auth::{hash_password, verify_password, CurrentUser, SESSION_COOKIE};

/// Default upload size limit (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Largest page a client may request
pub const MAX_PER_PAGE: usize = 500;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    pub session_ttl_hours: i64,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
    /// Applied to every CSV uploaded through `/api/import`.
    pub import: ImportOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            session_ttl_hours: 24 * 7,
            secure_cookies: false,
            max_upload_bytes: MAX_UPLOAD_SIZE,
            import: ImportOptions::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: DbPool,
    pub config: ServerConfig,
    pub categories: CategoryDictionary,
    pub detector: CategoryDetector,
}

impl AppState {
    pub fn new(db: DbPool, categories: CategoryDictionary, config: ServerConfig) -> Self {
        let detector = CategoryDetector::new(&categories);
        Self {
            db,
            config,
            categories,
            detector,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config.allowed_origins);
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .route(
            "/transactions",
            get(handlers::list_transactions)
                .post(handlers::create_transactions)
                .delete(handlers::delete_transactions),
        )
        .route(
            "/transactions/{id}/category",
            patch(handlers::update_category),
        )
        .route("/import", post(handlers::import_csv))
        .route("/summary", get(handlers::get_summary))
        .route("/categories", get(handlers::list_categories));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors;
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    cors.allow_origin(origins).allow_credentials(true)
}

/// Start the server
pub async fn serve(
    db: DbPool,
    categories: CategoryDictionary,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.secure_cookies {
        warn!("Session cookies are not marked Secure - serve behind HTTPS before exposing this");
    }

    match faturai_storage::purge_expired_sessions(&db, Utc::now()).await {
        Ok(count) if count > 0 => info!(count, "Removed expired sessions"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Failed to purge expired sessions"),
    }

    let app = create_router(AppState::new(db, categories, config));
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}
