//! Additive schema synchronization
//!
//! Stores written by the first release have a `users` table without
//! `password_hash` and `is_admin`. After `CREATE TABLE IF NOT EXISTS`, every
//! table in [`TABLES`] is compared with `PRAGMA table_info` and missing
//! columns are added with `ALTER TABLE ... ADD COLUMN`.
//!
//! Columns whose type affinity differs are only logged. SQLite cannot change
//! a column type without rebuilding the table.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Expected column. `add_clause` is what follows the type in the
/// `ADD COLUMN` statement, so it must be something SQLite accepts there
/// (no PRIMARY KEY, UNIQUE or non-constant DEFAULT). Columns the row
/// structs decode as non-optional carry a constant default so existing rows
/// gain a decodable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub add_clause: &'static str,
}

const fn column(name: &'static str, sql_type: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        sql_type,
        add_clause: "",
    }
}

const TEXT_DEFAULT: &str = "NOT NULL DEFAULT ''";
const INTEGER_DEFAULT: &str = "NOT NULL DEFAULT 0";

const fn column_with(
    name: &'static str,
    sql_type: &'static str,
    add_clause: &'static str,
) -> ColumnSpec {
    ColumnSpec {
        name,
        sql_type,
        add_clause,
    }
}

impl ColumnSpec {
    fn add_sql(&self, table: &str) -> String {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, self.name, self.sql_type);
        if !self.add_clause.is_empty() {
            sql.push(' ');
            sql.push_str(self.add_clause);
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const USERS_TABLE: TableSpec = TableSpec {
    name: "users",
    columns: &[
        column("id", "INTEGER"),
        column_with("email", "TEXT", TEXT_DEFAULT),
        column_with("first_name", "TEXT", TEXT_DEFAULT),
        column_with("last_name", "TEXT", TEXT_DEFAULT),
        column_with("age", "INTEGER", INTEGER_DEFAULT),
        column_with("city", "TEXT", TEXT_DEFAULT),
        column_with("password_hash", "TEXT", TEXT_DEFAULT),
        column_with("is_admin", "INTEGER", INTEGER_DEFAULT),
        // CURRENT_TIMESTAMP is not allowed as an added column's default
        column("created_at", "TIMESTAMP"),
    ],
};

pub const ANALYSES_TABLE: TableSpec = TableSpec {
    name: "analizler",
    columns: &[
        column("id", "INTEGER"),
        column_with("user_id", "INTEGER", INTEGER_DEFAULT),
        column_with("title", "TEXT", TEXT_DEFAULT),
        column_with("body", "TEXT", TEXT_DEFAULT),
        column_with("label_name", "TEXT", TEXT_DEFAULT),
        column_with("score", "INTEGER", INTEGER_DEFAULT),
        column_with("created_at", "TEXT", TEXT_DEFAULT),
    ],
};

/// Tables kept in sync on every startup
pub const TABLES: &[TableSpec] = &[USERS_TABLE, ANALYSES_TABLE];

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub sql_type: String,
}

/// Live columns of `table` in declaration order; empty when the table does
/// not exist
pub async fn live_columns(pool: &SqlitePool, table: &str) -> Result<Vec<LiveColumn>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    let mut columns: Vec<(i64, LiveColumn)> = rows
        .iter()
        .map(|row| {
            (
                row.get::<i64, _>("cid"),
                LiveColumn {
                    name: row.get("name"),
                    sql_type: row.get("type"),
                },
            )
        })
        .collect();
    columns.sort_by_key(|(cid, _)| *cid);

    Ok(columns.into_iter().map(|(_, c)| c).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    Integer,
    Text,
    Real,
    Other,
}

/// SQLite column affinity rules, reduced to the types used here
fn affinity(sql_type: &str) -> Affinity {
    let t = sql_type.to_ascii_uppercase();
    if t.contains("INT") {
        Affinity::Integer
    } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
        Affinity::Text
    } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
        Affinity::Real
    } else {
        Affinity::Other
    }
}

/// Expected columns of `spec` absent from `live`, logging any whose
/// affinity differs
fn missing_columns<'a>(spec: &'a TableSpec, live: &[LiveColumn]) -> Vec<&'a ColumnSpec> {
    spec.columns
        .iter()
        .filter(|expected| match live.iter().find(|c| c.name == expected.name) {
            None => true,
            Some(found) => {
                if affinity(&found.sql_type) != affinity(expected.sql_type) {
                    warn!(
                        "Column {}.{} is '{}', expected '{}'; left unchanged",
                        spec.name, expected.name, found.sql_type, expected.sql_type
                    );
                }
                false
            }
        })
        .collect()
}

/// Add the missing columns of one table. Returns the names added.
pub async fn sync_table(pool: &SqlitePool, spec: &TableSpec) -> Result<Vec<&'static str>> {
    let live = live_columns(pool, spec.name).await?;
    if live.is_empty() {
        warn!("Schema sync: table '{}' does not exist", spec.name);
        return Ok(Vec::new());
    }

    let mut added = Vec::new();
    for col in missing_columns(spec, &live) {
        match sqlx::query(&col.add_sql(spec.name)).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{} ({})", spec.name, col.name, col.sql_type);
                added.push(col.name);
            }
            // Added by another process since the PRAGMA read
            Err(sqlx::Error::Database(e)) if e.message().contains("duplicate column") => {
                debug!("Column {}.{} already present", spec.name, col.name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if added.is_empty() {
        debug!("Schema sync: '{}' is up to date", spec.name);
    }
    Ok(added)
}

/// Bring every table in [`TABLES`] up to date
pub async fn sync_all_tables(pool: &SqlitePool) -> Result<()> {
    let mut total = 0;
    for spec in TABLES {
        total += sync_table(pool, spec).await?.len();
    }
    info!("Schema synchronization complete ({} columns added)", total);
    Ok(())
}
