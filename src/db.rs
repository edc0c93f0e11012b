use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{is_locked, AppError, Result};

/// Attempts when the database file is locked by another writer, with a
/// linearly increasing backoff of 50ms x attempt between tries.
pub const LOCK_RETRIES: u32 = 3;
pub const LOCK_BACKOFF_MS: u64 = 50;

/// Open the SQLite pool. WAL keeps readers non-blocking during writes and
/// `synchronous=NORMAL` trades strict crash durability for write
/// availability, which is fine at this volume.
pub async fn connect(config: &AppConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(AppError::Database)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .pragma("cache_size", "-10000") // 10MB page cache
        .busy_timeout(Duration::from_secs(config.database_timeout_secs));

    let mut attempt = 1u32;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => {
                info!(url = %config.database_url, "database connected");
                return Ok(pool);
            }
            Err(e) if is_locked(&e) && attempt < LOCK_RETRIES => {
                warn!(attempt, "database locked while connecting, retrying");
                tokio::time::sleep(Duration::from_millis(LOCK_BACKOFF_MS * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Idempotent schema setup: one append-only table plus the two indexes the
/// dashboard scans rely on.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS guests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            attendance TEXT NOT NULL CHECK(attendance IN ('yes', 'no')),
            companion_name TEXT,
            food_preference TEXT,
            drink_preference TEXT,
            wishes TEXT,
            submission_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance ON guests(attendance)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submission_date ON guests(submission_date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Probe the table the application depends on. A mismatch aborts startup
/// instead of silently recreating the database file.
pub async fn check_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guests")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::Config(format!(
                "schema check failed ({e}); inspect or migrate the database file manually"
            ))
        })?;
    Ok(())
}
