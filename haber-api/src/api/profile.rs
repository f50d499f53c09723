//! Profile management: password change, profile edit, account deletion

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::fields::{
    parse_user_id, required_int, required_secret, required_text, run_blocking, IntField,
};
use crate::db::users::{self, Profile, ProfileUpdate};
use crate::db::analyses;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const UNKNOWN_USER: &str = "Kullanıcı bulunamadı! Lütfen geçerli bir kullanıcı seçin.";

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub user_id: Option<IntField>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user_id: Option<IntField>,
    pub new_isim: Option<String>,
    pub new_soyisim: Option<String>,
    pub new_email: Option<String>,
    pub new_yas: Option<IntField>,
    pub new_sehir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    pub user_id: Option<IntField>,
}

/// POST /update-password
pub async fn update_password(
    State(state): State<AppState>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let user_id = parse_user_id(req.user_id)?;
    let current = required_secret(req.current_password)?;
    let new_password = required_secret(req.new_password)?;

    let user = users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(UNKNOWN_USER.to_string()))?;

    let hasher = state.hasher;
    let stored = user.password_hash;
    let new_hash = run_blocking(move || {
        hasher
            .verify(&current, &stored)
            .then(|| hasher.hash(&new_password))
    })
    .await?
    .ok_or_else(|| {
        warn!("Password change for user {} with wrong current password", user_id);
        ApiError::Unauthorized("Mevcut şifre hatalı!".to_string())
    })?;

    if !users::update_password(&state.db, user_id, &new_hash).await? {
        return Err(ApiError::NotFound(UNKNOWN_USER.to_string()));
    }

    info!("Password changed for user {}", user_id);
    Ok(Json(json!({ "message": "Şifre başarıyla güncellendi!" })))
}

/// POST /update-user
///
/// The numeric id does not change, so the user's analyses stay attached.
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let user_id = parse_user_id(req.user_id)?;
    let profile = Profile {
        email: required_text(req.new_email)?,
        first_name: required_text(req.new_isim)?,
        last_name: required_text(req.new_soyisim)?,
        age: required_int(req.new_yas, "new_yas")?,
        city: required_text(req.new_sehir)?,
    };

    match users::update_profile(&state.db, user_id, &profile).await? {
        ProfileUpdate::Updated => Ok(Json(json!({
            "message": "Kullanıcı bilgileri başarıyla güncellendi!",
            "user_id": user_id,
        }))),
        ProfileUpdate::UnknownUser => Err(ApiError::NotFound(UNKNOWN_USER.to_string())),
        ProfileUpdate::EmailTaken => Err(ApiError::BadRequest(
            "Bu e-posta adresi başka bir kullanıcı tarafından kullanılıyor!".to_string(),
        )),
    }
}

/// POST /delete-user
pub async fn delete_user(
    State(state): State<AppState>,
    payload: Result<Json<UserIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let user_id = parse_user_id(req.user_id)?;

    let deleted = users::delete_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(UNKNOWN_USER.to_string()))?;

    Ok(Json(json!({
        "message": "Kullanıcı ve analizleri başarıyla silindi!",
        "silinen_analiz": deleted,
    })))
}

/// POST /delete-all
pub async fn delete_all(
    State(state): State<AppState>,
    payload: Result<Json<UserIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let user_id = parse_user_id(req.user_id)?;

    let deleted = analyses::delete_for_user(&state.db, user_id).await?;

    Ok(Json(json!({
        "message": "Tüm analizler başarıyla silindi!",
        "silinen_analiz": deleted,
    })))
}

/// Build profile management routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/update-password", post(update_password))
        .route("/update-user", post(update_user))
        .route("/delete-user", post(delete_user))
        .route("/delete-all", post(delete_all))
}
