//! HTTP API handlers for haber-api

pub mod admin;
pub mod auth;
pub mod fields;
pub mod health;
pub mod history;
pub mod predict;
pub mod profile;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use health::health_routes;
pub use history::{history_routes, AnalysisView};
pub use predict::predict_routes;
pub use profile::profile_routes;
