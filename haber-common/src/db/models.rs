//! Database models

use serde::{Deserialize, Serialize};

/// Row of the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub city: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
}

/// Row of the `analizler` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    /// Polarity name (`Olumlu` / `Olumsuz`)
    pub label_name: String,
    pub score: i64,
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub created_at: String,
}
