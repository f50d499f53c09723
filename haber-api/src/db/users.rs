//! `users` table queries

use super::{is_unique_violation, InsertOutcome};
use haber_common::db::UserRecord;
use haber_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, age, city, password_hash, is_admin";

/// Profile fields shared by registration and profile edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub city: String,
}

impl From<&UserRecord> for Profile {
    fn from(user: &UserRecord) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            age: user.age,
            city: user.city.clone(),
        }
    }
}

/// Admin listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i64,
    pub city: String,
    pub analysis_count: i64,
}

/// Outcome of a profile edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdate {
    Updated,
    UnknownUser,
    /// Another user already has the requested email
    EmailTaken,
}

/// Insert a user; `Conflict` when the email is already registered
pub async fn insert_user(
    pool: &SqlitePool,
    profile: &Profile,
    password_hash: &str,
    is_admin: bool,
) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, first_name, last_name, age, city, password_hash, is_admin)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&profile.email)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(profile.age)
    .bind(&profile.city)
    .bind(password_hash)
    .bind(is_admin)
    .execute(pool)
    .await;

    match result {
        Ok(done) => {
            let id = done.last_insert_rowid();
            info!("Registered user {} ({})", id, profile.email);
            Ok(InsertOutcome::Inserted(id))
        }
        Err(e) if is_unique_violation(&e) => {
            debug!("Email already registered: {}", profile.email);
            Ok(InsertOutcome::Conflict)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Replace the password hash; `false` when the user does not exist
pub async fn update_password(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<bool> {
    let done = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(done.rows_affected() > 0)
}

/// Edit a user's profile in one transaction.
///
/// Analyses reference the numeric id, so they stay attached whatever
/// fields change.
pub async fn update_profile(pool: &SqlitePool, id: i64, profile: &Profile) -> Result<ProfileUpdate> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Ok(ProfileUpdate::UnknownUser);
    }

    let taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND id != ?)")
            .bind(&profile.email)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if taken {
        return Ok(ProfileUpdate::EmailTaken);
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, first_name = ?, last_name = ?, age = ?, city = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.email)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(profile.age)
    .bind(&profile.city)
    .bind(id)
    .execute(&mut *tx)
    .await;

    match result {
        Ok(_) => {}
        // Lost a race with a concurrent registration of the same email
        Err(e) if is_unique_violation(&e) => return Ok(ProfileUpdate::EmailTaken),
        Err(e) => return Err(e.into()),
    }

    tx.commit().await?;
    info!("Updated profile of user {}", id);
    Ok(ProfileUpdate::Updated)
}

/// Delete a user and their analyses in one transaction.
///
/// Returns the number of analyses removed, or `None` for an unknown user.
pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<Option<u64>> {
    let mut tx = pool.begin().await?;

    let analyses = sqlx::query("DELETE FROM analizler WHERE user_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let users = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if users == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    info!("Deleted user {} and {} analyses", id, analyses);
    Ok(Some(analyses))
}

/// Users whose first name, last name or email contains `search`, each with
/// their analysis count
pub async fn list_users(pool: &SqlitePool, search: &str) -> Result<Vec<UserSummary>> {
    let pattern = format!("%{}%", search);

    let users = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.first_name, u.last_name, u.email, u.age, u.city,
               (SELECT COUNT(*) FROM analizler a WHERE a.user_id = u.id) AS analysis_count
        FROM users u
        WHERE u.email LIKE ? OR u.first_name LIKE ? OR u.last_name LIKE ?
        ORDER BY u.id
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use haber_common::db::init_database;
    use tempfile::TempDir;

    fn profile(email: &str) -> Profile {
        Profile {
            email: email.to_string(),
            first_name: "Ayşe".to_string(),
            last_name: "Kaya".to_string(),
            age: 34,
            city: "İzmir".to_string(),
        }
    }

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("users.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let (_dir, pool) = setup().await;

        let first = insert_user(&pool, &profile("a@b.c"), "h", false).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = insert_user(&pool, &profile("a@b.c"), "h", false).await.unwrap();
        assert_eq!(second, InsertOutcome::Conflict);
    }

    #[tokio::test]
    async fn test_update_profile_outcomes() {
        let (_dir, pool) = setup().await;
        let InsertOutcome::Inserted(ayse) = insert_user(&pool, &profile("ayse@x.com"), "h", false)
            .await
            .unwrap()
        else {
            panic!("insert failed");
        };
        insert_user(&pool, &profile("mehmet@x.com"), "h", false)
            .await
            .unwrap();

        assert_eq!(
            update_profile(&pool, ayse, &profile("mehmet@x.com")).await.unwrap(),
            ProfileUpdate::EmailTaken
        );
        assert_eq!(
            update_profile(&pool, 999, &profile("yeni@x.com")).await.unwrap(),
            ProfileUpdate::UnknownUser
        );

        let changed = Profile {
            city: "Ankara".to_string(),
            ..profile("ayse.kaya@x.com")
        };
        assert_eq!(
            update_profile(&pool, ayse, &changed).await.unwrap(),
            ProfileUpdate::Updated
        );
        let user = find_by_id(&pool, ayse).await.unwrap().unwrap();
        assert_eq!(user.email, "ayse.kaya@x.com");
        assert_eq!(user.city, "Ankara");
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let (_dir, pool) = setup().await;
        assert_eq!(delete_user(&pool, 42).await.unwrap(), None);
    }
}
