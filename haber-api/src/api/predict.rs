//! Classification endpoint
//!
//! Results are memoized per `(user_id, title)`: a title the user already
//! analyzed returns the stored result without running the model again.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::fields::{parse_user_id, run_blocking, IntField};
use super::history::AnalysisView;
use crate::classifier::classify;
use crate::db::analyses::{self, NewAnalysis};
use crate::db::InsertOutcome;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Placeholder the client sends when it could not extract article text
pub const MISSING_TEXT_SENTINEL: &str = "Metin bulunamadı";

/// Title stored when the client sends none
pub const DEFAULT_TITLE: &str = "Başlık bulunamadı (Otomatik)";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ALREADY_ANALYZED: &str = "Bu haber zaten analiz edilmiş.";

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: Option<String>,
    pub user_id: Option<IntField>,
    pub title: Option<String>,
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;

    let text = req
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && t != MISSING_TEXT_SENTINEL)
        .ok_or_else(|| {
            ApiError::BadRequest("Lütfen analiz edilecek bir haber metni girin!".to_string())
        })?;
    let user_id = parse_user_id(req.user_id)?;
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let model = state.model.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("Model yüklenmedi, analiz yapılamıyor.".to_string())
    })?;

    if let Some(existing) = analyses::find_by_title(&state.db, user_id, &title).await? {
        debug!("Returning stored analysis {} for user {}", existing.id, user_id);
        return Ok(Json(AnalysisView::with_user(existing)).into_response());
    }

    let verdict = {
        let text = text.clone();
        run_blocking(move || classify(&model, &text)).await?
    };
    info!(
        "Classified '{}' for user {}: {} ({})",
        title, user_id, verdict.polarity, verdict.score
    );

    let analysis = NewAnalysis {
        user_id,
        title: &title,
        body: &text,
        polarity: verdict.polarity,
        score: verdict.score,
        created_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
    };

    let outcome = analyses::insert(&state.db, &analysis)
        .await
        .map_err(|e| match e {
            haber_common::Error::NotFound(_) => {
                ApiError::NotFound("Kullanıcı bulunamadı!".to_string())
            }
            other => ApiError::from(other),
        })?;

    match outcome {
        InsertOutcome::Inserted(id) => Ok(Json(AnalysisView {
            id,
            user_id: Some(user_id),
            baslik: title.clone(),
            metin: text.clone(),
            durum: verdict.polarity.as_str().to_string(),
            derece: i64::from(verdict.score),
            tarih: analysis.created_at,
        })
        .into_response()),
        // A concurrent request stored the same title first
        InsertOutcome::Conflict => Ok(Json(json!({ "message": ALREADY_ANALYZED })).into_response()),
    }
}

/// Build classification routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
