//! `analizler` table queries

use super::{is_foreign_key_violation, is_unique_violation, InsertOutcome};
use haber_common::db::AnalysisRecord;
use haber_common::{Error, Polarity, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

const ANALYSIS_COLUMNS: &str = "id, user_id, title, body, label_name, score, created_at";

/// Analysis about to be stored
#[derive(Debug, Clone)]
pub struct NewAnalysis<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub body: &'a str,
    pub polarity: Polarity,
    pub score: u8,
    pub created_at: String,
}

/// History filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    Olumlu,
    Olumsuz,
}

impl HistoryFilter {
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            HistoryFilter::All => None,
            HistoryFilter::Olumlu => Some(Polarity::Positive),
            HistoryFilter::Olumsuz => Some(Polarity::Negative),
        }
    }
}

/// Stored analysis for `(user_id, title)`, if any
pub async fn find_by_title(
    pool: &SqlitePool,
    user_id: i64,
    title: &str,
) -> Result<Option<AnalysisRecord>> {
    let record = sqlx::query_as::<_, AnalysisRecord>(&format!(
        "SELECT {} FROM analizler WHERE user_id = ? AND title = ?",
        ANALYSIS_COLUMNS
    ))
    .bind(user_id)
    .bind(title)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Insert an analysis.
///
/// `Conflict` when the user already has an analysis with this title; a
/// `user_id` with no user is [`Error::NotFound`].
pub async fn insert(pool: &SqlitePool, analysis: &NewAnalysis<'_>) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO analizler (user_id, title, body, label_name, score, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(analysis.user_id)
    .bind(analysis.title)
    .bind(analysis.body)
    .bind(analysis.polarity.as_str())
    .bind(i64::from(analysis.score))
    .bind(&analysis.created_at)
    .execute(pool)
    .await;

    match result {
        Ok(done) => {
            let id = done.last_insert_rowid();
            info!(
                "Stored analysis {} for user {}: {} ({})",
                id,
                analysis.user_id,
                analysis.polarity,
                analysis.score
            );
            Ok(InsertOutcome::Inserted(id))
        }
        Err(e) if is_unique_violation(&e) => {
            debug!(
                "Analysis '{}' already stored for user {}",
                analysis.title, analysis.user_id
            );
            Ok(InsertOutcome::Conflict)
        }
        Err(e) if is_foreign_key_violation(&e) => {
            Err(Error::NotFound(format!("user {}", analysis.user_id)))
        }
        Err(e) => Err(e.into()),
    }
}

/// A user's analyses, newest first
pub async fn history(
    pool: &SqlitePool,
    user_id: i64,
    filter: HistoryFilter,
) -> Result<Vec<AnalysisRecord>> {
    let records = match filter.polarity() {
        None => {
            sqlx::query_as::<_, AnalysisRecord>(&format!(
                "SELECT {} FROM analizler WHERE user_id = ? ORDER BY created_at DESC, id DESC",
                ANALYSIS_COLUMNS
            ))
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
        Some(polarity) => {
            sqlx::query_as::<_, AnalysisRecord>(&format!(
                "SELECT {} FROM analizler WHERE user_id = ? AND label_name = ? \
                 ORDER BY created_at DESC, id DESC",
                ANALYSIS_COLUMNS
            ))
            .bind(user_id)
            .bind(polarity.as_str())
            .fetch_all(pool)
            .await?
        }
    };

    Ok(records)
}

/// Delete every analysis of a user; returns how many were removed
pub async fn delete_for_user(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM analizler WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    info!("Deleted {} analyses of user {}", deleted, user_id);
    Ok(deleted)
}

/// Most recent analysis across all users
pub async fn latest(pool: &SqlitePool) -> Result<Option<AnalysisRecord>> {
    let record = sqlx::query_as::<_, AnalysisRecord>(&format!(
        "SELECT {} FROM analizler ORDER BY created_at DESC, id DESC LIMIT 1",
        ANALYSIS_COLUMNS
    ))
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{insert_user, Profile};
    use haber_common::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool, i64) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("analyses.db")).await.unwrap();
        let profile = Profile {
            email: "a@b.c".to_string(),
            first_name: "Ali".to_string(),
            last_name: "Demir".to_string(),
            age: 40,
            city: "Bursa".to_string(),
        };
        let InsertOutcome::Inserted(user_id) =
            insert_user(&pool, &profile, "h", false).await.unwrap()
        else {
            panic!("insert failed");
        };
        (dir, pool, user_id)
    }

    fn analysis(user_id: i64, title: &str, label: Polarity, minute: u32) -> NewAnalysis<'_> {
        NewAnalysis {
            user_id,
            title,
            body: "metin",
            polarity: label,
            score: if label == Polarity::Positive { 0 } else { 4 },
            created_at: format!("2024-05-01 10:{:02}:00", minute),
        }
    }

    #[tokio::test]
    async fn test_same_title_is_a_conflict() {
        let (_dir, pool, user) = setup().await;

        let first = insert(&pool, &analysis(user, "Başlık", Polarity::Positive, 0))
            .await
            .unwrap();
        let InsertOutcome::Inserted(id) = first else {
            panic!("expected insert, got {:?}", first);
        };

        let second = insert(&pool, &analysis(user, "Başlık", Polarity::Negative, 1))
            .await
            .unwrap();
        assert_eq!(second, InsertOutcome::Conflict);

        let stored = find_by_title(&pool, user, "Başlık").await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.label_name, "Olumlu");
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (_dir, pool, user) = setup().await;

        let result = insert(&pool, &analysis(user + 100, "Başlık", Polarity::Positive, 0)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_filters_newest_first() {
        let (_dir, pool, user) = setup().await;
        insert(&pool, &analysis(user, "a", Polarity::Positive, 1)).await.unwrap();
        insert(&pool, &analysis(user, "b", Polarity::Negative, 2)).await.unwrap();
        insert(&pool, &analysis(user, "c", Polarity::Negative, 3)).await.unwrap();

        let all = history(&pool, user, HistoryFilter::All).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b", "a"]);

        let negative = history(&pool, user, HistoryFilter::Olumsuz).await.unwrap();
        assert_eq!(negative.len(), 2);
        assert!(negative.iter().all(|r| r.label_name == "Olumsuz"));

        let newest = latest(&pool).await.unwrap().unwrap();
        assert_eq!(newest.title, "c");

        assert_eq!(delete_for_user(&pool, user).await.unwrap(), 3);
        assert!(latest(&pool).await.unwrap().is_none());
    }
}
