//! Key-value rows of the local criteria cache
//!
//! Values are JSON text. Keys: `criteria` for the global list and
//! `criteria_<programId>` for each program.

use crate::error::Result;
use accelera_common::ProgramId;
use sqlx::{Executor, Sqlite, SqlitePool};

/// Key of the unscoped criteria list
pub const GLOBAL_KEY: &str = "criteria";

/// Key of one program's criteria list
///
/// Uses the canonical program id, so `7` and `"7"` share a row.
pub fn program_key(program: &ProgramId) -> String {
    format!("{}_{}", GLOBAL_KEY, program.canonical())
}

/// Read one value (from a pool or inside a transaction)
pub async fn read_value<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM local_cache WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await?;
    Ok(value)
}

/// Read every criteria row (global and per-program), ordered by key
pub async fn read_all_criteria(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT key, value FROM local_cache
         WHERE key = ? OR key LIKE ? ESCAPE '\\'
         ORDER BY key",
    )
    .bind(GLOBAL_KEY)
    .bind(format!("{}\\_%", GLOBAL_KEY))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert or replace one value (on a pool or inside a transaction)
pub async fn write_value<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO local_cache (key, value, updated_at)
         VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}
