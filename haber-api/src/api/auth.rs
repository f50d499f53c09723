//! Registration and login
//!
//! Both responses carry the user's profile fields so the client can show
//! them without a second request.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::fields::{
    optional_flag, required_int, required_secret, required_text, run_blocking, BoolField,
    IntField,
};
use crate::db::users::{self, Profile};
use crate::db::InsertOutcome;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub isim: Option<String>,
    pub soyisim: Option<String>,
    pub yas: Option<IntField>,
    pub sehir: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<BoolField>,
}

#[derive(Debug, Deserialize)]
pub struct CheckAuthRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `body` plus the profile under the same keys registration takes
fn with_profile(mut body: Value, profile: &Profile) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert("isim".into(), json!(profile.first_name));
        map.insert("soyisim".into(), json!(profile.last_name));
        map.insert("email".into(), json!(profile.email));
        map.insert("yas".into(), json!(profile.age));
        map.insert("sehir".into(), json!(profile.city));
    }
    body
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;

    let profile = Profile {
        email: required_text(req.email)?,
        first_name: required_text(req.isim)?,
        last_name: required_text(req.soyisim)?,
        age: required_int(req.yas, "yas")?,
        city: required_text(req.sehir)?,
    };
    let password = required_secret(req.password)?;
    let is_admin = optional_flag(req.is_admin, "is_admin")?;

    let hasher = state.hasher;
    let password_hash = run_blocking(move || hasher.hash(&password)).await?;

    match users::insert_user(&state.db, &profile, &password_hash, is_admin).await? {
        InsertOutcome::Inserted(user_id) => Ok(Json(with_profile(
            json!({
                "message": "Kayıt başarılı!",
                "user_id": user_id,
                "is_admin": is_admin,
            }),
            &profile,
        ))),
        InsertOutcome::Conflict => {
            warn!("Registration with existing email: {}", profile.email);
            Err(ApiError::BadRequest(
                "Bu e-posta adresi zaten kayıtlı!".to_string(),
            ))
        }
    }
}

/// POST /check-auth
///
/// Every failure body also carries `"authenticated": false`.
pub async fn check_auth(
    State(state): State<AppState>,
    payload: Result<Json<CheckAuthRequest>, JsonRejection>,
) -> Response {
    match authenticate(&state, payload).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response_with(json!({ "authenticated": false })),
    }
}

async fn authenticate(
    state: &AppState,
    payload: Result<Json<CheckAuthRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(req) = payload?;
    let email = required_text(req.email)?;
    let password = required_secret(req.password)?;

    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Kullanıcı bulunamadı!".to_string()))?;

    let hasher = state.hasher;
    let stored = user.password_hash.clone();
    let matches = run_blocking(move || hasher.verify(&password, &stored)).await?;
    if !matches {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::Unauthorized("Hatalı şifre!".to_string()));
    }

    info!("User {} authenticated", user.id);
    Ok(with_profile(
        json!({
            "authenticated": true,
            "user_id": user.id,
            "is_admin": user.is_admin,
        }),
        &Profile::from(&user),
    ))
}

/// Build authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/check-auth", post(check_auth))
}
