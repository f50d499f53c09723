//! Queries over the `users` and `analizler` tables

pub mod analyses;
pub mod users;

/// Result of an insert guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written; carries the new row id
    Inserted(i64),
    /// A row with the same unique key already exists
    Conflict,
}

/// Unique-constraint violation on a write
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
