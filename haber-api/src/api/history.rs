//! Analysis history

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use haber_common::db::AnalysisRecord;
use haber_common::Polarity;
use serde::{Deserialize, Serialize};

use super::fields::{parse_user_id, IntField};
use crate::db::analyses::{self, HistoryFilter};
use crate::error::ApiResult;
use crate::AppState;

/// Analysis as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub baslik: String,
    pub metin: String,
    pub durum: String,
    pub derece: i64,
    pub tarih: String,
}

impl AnalysisView {
    pub fn with_user(record: AnalysisRecord) -> Self {
        let user_id = record.user_id;
        Self {
            user_id: Some(user_id),
            ..Self::from(record)
        }
    }
}

impl From<AnalysisRecord> for AnalysisView {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            user_id: None,
            baslik: record.title,
            metin: record.body,
            durum: record.label_name,
            derece: record.score,
            tarih: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub user_id: Option<IntField>,
    pub filter_type: Option<HistoryFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub toplam_analiz: usize,
    pub olumlu_analiz: usize,
    pub olumsuz_analiz: usize,
}

impl HistoryStats {
    pub fn tally(records: &[AnalysisRecord]) -> Self {
        let count = |polarity: Polarity| {
            records
                .iter()
                .filter(|r| Polarity::parse(&r.label_name) == Some(polarity))
                .count()
        };
        Self {
            toplam_analiz: records.len(),
            olumlu_analiz: count(Polarity::Positive),
            olumsuz_analiz: count(Polarity::Negative),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub analizler: Vec<AnalysisView>,
    pub istatistikler: HistoryStats,
}

/// POST /gecmis-analizler
///
/// Statistics cover the filtered list.
pub async fn gecmis_analizler(
    State(state): State<AppState>,
    payload: Result<Json<HistoryRequest>, JsonRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Json(req) = payload?;
    let user_id = parse_user_id(req.user_id)?;
    let filter = req.filter_type.unwrap_or_default();

    let records = analyses::history(&state.db, user_id, filter).await?;
    let istatistikler = HistoryStats::tally(&records);

    Ok(Json(HistoryResponse {
        analizler: records.into_iter().map(AnalysisView::from).collect(),
        istatistikler,
    }))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/gecmis-analizler", post(gecmis_analizler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, label_name: &str) -> AnalysisRecord {
        AnalysisRecord {
            id,
            user_id: 3,
            title: format!("başlık {}", id),
            body: "metin".to_string(),
            label_name: label_name.to_string(),
            score: if label_name == "Olumlu" { 0 } else { 6 },
            created_at: "2024-05-01 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_tally() {
        let records = vec![record(1, "Olumlu"), record(2, "Olumsuz"), record(3, "Olumsuz")];
        assert_eq!(
            HistoryStats::tally(&records),
            HistoryStats {
                toplam_analiz: 3,
                olumlu_analiz: 1,
                olumsuz_analiz: 2,
            }
        );
    }

    #[test]
    fn test_view_field_names() {
        let value = serde_json::to_value(AnalysisView::from(record(1, "Olumlu"))).unwrap();
        assert_eq!(value["baslik"], "başlık 1");
        assert_eq!(value["durum"], "Olumlu");
        assert_eq!(value["derece"], 0);
        assert!(value.get("user_id").is_none());

        let value = serde_json::to_value(AnalysisView::with_user(record(2, "Olumsuz"))).unwrap();
        assert_eq!(value["user_id"], 3);
    }
}
