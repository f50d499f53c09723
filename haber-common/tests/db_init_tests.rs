//! Tests for database initialization
//!
//! Tests cover:
//! - Automatic database creation (including missing parent directories)
//! - Reopening an existing database
//! - Idempotent initialization keeps existing rows
//! - Foreign keys cascade analyses on user delete
//! - `(user_id, title)` uniqueness

use haber_common::db::init::init_database;
use tempfile::TempDir;

async fn insert_user(pool: &sqlx::SqlitePool, email: &str) -> i64 {
    sqlx::query(
        "INSERT INTO users (email, first_name, last_name, age, city, password_hash) \
         VALUES (?, 'Ali', 'Demir', 40, 'Ankara', 'x')",
    )
    .bind(email)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn insert_analysis(pool: &sqlx::SqlitePool, user_id: i64, title: &str) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO analizler (user_id, title, body, label_name, score, created_at) \
         VALUES (?, ?, 'metin', 'Olumsuz', 4, '2026-01-01 10:00:00')",
    )
    .bind(user_id)
    .bind(title)
    .execute(pool)
    .await
    .map(|_| ())
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("analizler.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("analizler.db");

    let pool1 = init_database(&db_path).await.unwrap();
    insert_user(&pool1, "kalici@example.com").await;
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count, 1, "Reinitialization must keep existing rows");
}

#[tokio::test]
async fn test_user_delete_cascades_to_analyses() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("analizler.db")).await.unwrap();

    let user_id = insert_user(&pool, "cascade@example.com").await;
    insert_analysis(&pool, user_id, "Baslik 1").await.unwrap();
    insert_analysis(&pool, user_id, "Baslik 2").await.unwrap();

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analizler")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_duplicate_title_per_user_rejected() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("analizler.db")).await.unwrap();

    let first = insert_user(&pool, "first@example.com").await;
    let second = insert_user(&pool, "second@example.com").await;

    insert_analysis(&pool, first, "Ayni baslik").await.unwrap();
    // Same title, other user: allowed
    insert_analysis(&pool, second, "Ayni baslik").await.unwrap();

    let err = insert_analysis(&pool, first, "Ayni baslik").await.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[tokio::test]
async fn test_analysis_for_unknown_user_rejected() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("analizler.db")).await.unwrap();

    let err = insert_analysis(&pool, 999, "Sahipsiz").await.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_foreign_key_violation());
}
