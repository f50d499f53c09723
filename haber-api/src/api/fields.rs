//! Request field parsing shared by the handlers
//!
//! Clients send numbers either as JSON numbers or as numeric strings, and
//! flags as booleans or 0/1. Missing and blank fields are reported as 400s
//! in the handler's own words rather than as extractor rejections.

use crate::error::{ApiError, ApiResult};
use serde::Deserialize;

pub const MISSING_FIELDS: &str = "Lütfen tüm alanları doldurun!";
pub const MISSING_USER_ID: &str = "Kullanıcı kimliği gerekli! Lütfen giriş yapın.";
pub const INVALID_USER_ID: &str = "Geçersiz kullanıcı kimliği!";

/// Integer sent as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntField {
    Int(i64),
    Text(String),
}

impl IntField {
    pub fn value(&self) -> Option<i64> {
        match self {
            IntField::Int(n) => Some(*n),
            IntField::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Flag sent as a boolean or as 0/1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BoolField {
    Bool(bool),
    Int(i64),
}

impl BoolField {
    pub fn value(&self) -> Option<bool> {
        match self {
            BoolField::Bool(b) => Some(*b),
            BoolField::Int(0) => Some(false),
            BoolField::Int(1) => Some(true),
            BoolField::Int(_) => None,
        }
    }
}

/// Trimmed, non-blank text
pub fn required_text(value: Option<String>) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.to_string()))
}

/// Non-empty secret, kept byte for byte
pub fn required_secret(value: Option<String>) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.to_string()))
}

pub fn required_int(value: Option<IntField>, field: &str) -> ApiResult<i64> {
    let value = value.ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.to_string()))?;
    value
        .value()
        .ok_or_else(|| ApiError::BadRequest(format!("'{}' bir tam sayı olmalı!", field)))
}

pub fn optional_flag(value: Option<BoolField>, field: &str) -> ApiResult<bool> {
    match value {
        None => Ok(false),
        Some(flag) => flag
            .value()
            .ok_or_else(|| ApiError::BadRequest(format!("'{}' true/false ya da 0/1 olmalı!", field))),
    }
}

/// Numeric user id; anything that is not an integer is rejected
pub fn parse_user_id(value: Option<IntField>) -> ApiResult<i64> {
    match value {
        None => Err(ApiError::BadRequest(MISSING_USER_ID.to_string())),
        Some(IntField::Text(s)) if s.trim().is_empty() => {
            Err(ApiError::BadRequest(MISSING_USER_ID.to_string()))
        }
        Some(field) => field
            .value()
            .ok_or_else(|| ApiError::BadRequest(INVALID_USER_ID.to_string())),
    }
}

/// Run CPU-bound work on the blocking pool
pub async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_field_accepts_numbers_and_numeric_strings() {
        let n: IntField = serde_json::from_value(json!(34)).unwrap();
        let s: IntField = serde_json::from_value(json!(" 34 ")).unwrap();
        assert_eq!(n.value(), Some(34));
        assert_eq!(s.value(), Some(34));

        let bad: IntField = serde_json::from_value(json!("otuz")).unwrap();
        assert_eq!(bad.value(), None);
    }

    #[test]
    fn test_bool_field() {
        let flags: Vec<BoolField> =
            serde_json::from_value(json!([true, false, 1, 0, 2])).unwrap();
        let values: Vec<Option<bool>> = flags.iter().map(BoolField::value).collect();
        assert_eq!(
            values,
            vec![Some(true), Some(false), Some(true), Some(false), None]
        );
    }

    #[test]
    fn test_user_id_rejects_composite_identity() {
        assert_eq!(parse_user_id(Some(IntField::Int(7))).unwrap(), 7);
        assert_eq!(parse_user_id(Some(IntField::Text("7".into()))).unwrap(), 7);

        let composite = IntField::Text("Ayşe_Kaya_ayse@x.com_34_İzmir".into());
        assert!(matches!(
            parse_user_id(Some(composite)),
            Err(ApiError::BadRequest(msg)) if msg == INVALID_USER_ID
        ));
        assert!(matches!(
            parse_user_id(None),
            Err(ApiError::BadRequest(msg)) if msg == MISSING_USER_ID
        ));
    }

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text(Some("  Ali ".into())).unwrap(), "Ali");
        assert!(required_text(Some("   ".into())).is_err());
        assert!(required_text(None).is_err());
    }
}
