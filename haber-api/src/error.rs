//! Error types for haber-api

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Body returned for every internal failure; the detail only goes to the log
const INTERNAL_MESSAGE: &str = "Sunucu hatası, lütfen tekrar deneyin.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid or incomplete request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Credentials did not match (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No classifier loaded (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message
    fn message(self) -> String {
        match self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                INTERNAL_MESSAGE.to_string()
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Error body with extra top-level fields merged in
    pub fn into_response_with(self, extra: Value) -> Response {
        let status = self.status();
        let mut body = json!({
            "code": self.code(),
            "error": self.message(),
        });
        if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
            body.extend(extra);
        }
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(Value::Null)
    }
}

impl From<haber_common::Error> for ApiError {
    fn from(err: haber_common::Error) -> Self {
        match err {
            haber_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            haber_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::NotFound("Kullanıcı bulunamadı".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Kullanıcı bulunamadı");
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_exposed() {
        let response = ApiError::Internal("disk I/O error at page 12".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_extra_fields_are_merged() {
        let response = ApiError::Unauthorized("Hatalı şifre".into())
            .into_response_with(json!({ "authenticated": false }));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[test]
    fn test_common_error_mapping() {
        let not_found: ApiError = haber_common::Error::NotFound("x".into()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = haber_common::Error::InvalidInput("x".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let config: ApiError = haber_common::Error::Config("x".into()).into();
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
