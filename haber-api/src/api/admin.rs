//! Admin views: user listing and latest analysis

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::history::AnalysisView;
use crate::db::users::{self, UserSummary};
use crate::db::analyses;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    /// Substring of first name, last name or email
    #[serde(default)]
    pub search: String,
}

/// Listing row as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: i64,
    pub isim: String,
    pub soyisim: String,
    pub email: String,
    pub yas: i64,
    pub sehir: String,
    pub analiz_sayisi: i64,
}

impl From<UserSummary> for UserView {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            isim: user.first_name,
            soyisim: user.last_name,
            email: user.email,
            yas: user.age,
            sehir: user.city,
            analiz_sayisi: user.analysis_count,
        }
    }
}

/// GET /all-users?search=
pub async fn all_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> ApiResult<Json<Vec<UserView>>> {
    let users = users::list_users(&state.db, query.search.trim()).await?;
    info!("Listed {} users", users.len());

    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// GET /veriler-data
pub async fn veriler_data(State(state): State<AppState>) -> ApiResult<Json<AnalysisView>> {
    let latest = analyses::latest(&state.db).await?.ok_or_else(|| {
        ApiError::NotFound(
            "Henüz analiz yapılmamış! Lütfen önce bir haber analizi yapın.".to_string(),
        )
    })?;

    Ok(Json(AnalysisView::from(latest)))
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/all-users", get(all_users))
        .route("/veriler-data", get(veriler_data))
}
