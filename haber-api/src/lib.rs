//! haber-api library - news stance classification service
//!
//! Wraps one trained pipeline behind a JSON API with registration,
//! password authentication, memoized classification and per-user history.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod classifier;
pub mod db;
pub mod error;
pub mod password;

pub use classifier::ModelHandle;
pub use error::{ApiError, ApiResult};
pub use password::PasswordHasher;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Loaded classifier; `None` when the artifact could not be loaded
    pub model: Option<ModelHandle>,
    pub hasher: PasswordHasher,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, model: Option<ModelHandle>, hasher: PasswordHasher) -> Self {
        Self {
            db,
            model,
            hasher,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::auth_routes())
        .merge(api::predict_routes())
        .merge(api::history_routes())
        .merge(api::profile_routes())
        .merge(api::admin_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
