use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AppConfig;
use crate::db::{self, LOCK_BACKOFF_MS, LOCK_RETRIES};
use crate::error::{is_locked, Result};

/// One persisted RSVP submission. Rows are append-only: there is no update
/// or delete path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guest {
    pub id: i64,
    pub name: String,
    pub attendance: String,
    pub companion_name: Option<String>,
    pub food_preference: Option<String>,
    pub drink_preference: Option<String>,
    pub wishes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub submission_date: OffsetDateTime,
}

impl Guest {
    pub fn is_attending(&self) -> bool {
        self.attendance == "yes"
    }

    pub fn has_companion(&self) -> bool {
        self.companion_name.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attendance {
    Yes,
    No,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Yes => "yes",
            Attendance::No => "no",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Attendance::Yes),
            "no" => Some(Attendance::No),
            _ => None,
        }
    }
}

/// A validated, normalized submission ready for storage. Produced only by
/// the validator; id and timestamp are assigned at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuest {
    pub name: String,
    pub attendance: Attendance,
    pub companion_name: Option<String>,
    pub food_preference: Option<String>,
    pub drink_preference: Option<String>,
    pub wishes: Option<String>,
}

/// Storage layer for guest responses. Owns the pool and a process-wide
/// write gate layered on top of SQLite's own locking, so concurrent
/// submissions queue here instead of piling up lock retries.
pub struct GuestStore {
    pool: SqlitePool,
    gate: Mutex<()>,
}

impl GuestStore {
    /// Connect, create the schema on first run, and verify it otherwise.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let pool = db::connect(config).await?;
        db::init_schema(&pool).await?;
        db::check_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            gate: Mutex::new(()),
        }
    }

    /// Append a new response and return the assigned id. A locked database
    /// is retried per the bounded policy; anything else propagates.
    pub async fn insert(&self, guest: &NewGuest) -> Result<i64> {
        let _gate = self.gate.lock().await;
        let submitted = OffsetDateTime::now_utc();

        let mut attempt = 1u32;
        loop {
            let result = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO guests
                    (name, attendance, companion_name, food_preference,
                     drink_preference, wishes, submission_date)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&guest.name)
            .bind(guest.attendance.as_str())
            .bind(&guest.companion_name)
            .bind(&guest.food_preference)
            .bind(&guest.drink_preference)
            .bind(&guest.wishes)
            .bind(submitted)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(id) => return Ok(id),
                Err(e) if is_locked(&e) && attempt < LOCK_RETRIES => {
                    warn!(attempt, "database locked during insert, retrying");
                    tokio::time::sleep(Duration::from_millis(LOCK_BACKOFF_MS * attempt as u64))
                        .await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ordered scan, most recent first. `id DESC` breaks same-instant ties.
    pub async fn scan(
        &self,
        filter: Option<Attendance>,
        limit: Option<i64>,
    ) -> Result<Vec<Guest>> {
        let _gate = self.gate.lock().await;
        let limit = limit.unwrap_or(-1);
        let rows = match filter {
            Some(att) => {
                sqlx::query_as::<_, Guest>(
                    r#"
                    SELECT id, name, attendance, companion_name, food_preference,
                           drink_preference, wishes, submission_date
                    FROM guests
                    WHERE attendance = ?
                    ORDER BY submission_date DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(att.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Guest>(
                    r#"
                    SELECT id, name, attendance, companion_name, food_preference,
                           drink_preference, wishes, submission_date
                    FROM guests
                    ORDER BY submission_date DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn count(&self, filter: Option<Attendance>) -> Result<i64> {
        let _gate = self.gate.lock().await;
        let count = match filter {
            Some(att) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guests WHERE attendance = ?")
                    .bind(att.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guests")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::{ConnectOptions, SqliteConnection};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn test_store() -> GuestStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        GuestStore::new(pool)
    }

    fn sample(name: &str, attendance: Attendance) -> NewGuest {
        NewGuest {
            name: name.to_string(),
            attendance,
            companion_name: None,
            food_preference: None,
            drink_preference: None,
            wishes: None,
        }
    }

    #[tokio::test]
    async fn insert_then_scan_roundtrip() {
        let store = test_store().await;
        let guest = NewGuest {
            name: "Анна".to_string(),
            attendance: Attendance::Yes,
            companion_name: Some("Борис".to_string()),
            food_preference: Some("Рыба, Паста".to_string()),
            drink_preference: Some("Вино".to_string()),
            wishes: Some("Совет да любовь".to_string()),
        };

        let id = store.insert(&guest).await.unwrap();
        let rows = store.scan(None, None).await.unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.name, guest.name);
        assert_eq!(row.attendance, "yes");
        assert_eq!(row.companion_name, guest.companion_name);
        assert_eq!(row.food_preference, guest.food_preference);
        assert_eq!(row.drink_preference, guest.drink_preference);
        assert_eq!(row.wishes, guest.wishes);
    }

    #[tokio::test]
    async fn count_honors_attendance_filter() {
        let store = test_store().await;
        for i in 0..3 {
            store
                .insert(&sample(&format!("guest {i}"), Attendance::Yes))
                .await
                .unwrap();
        }
        for i in 0..2 {
            store
                .insert(&sample(&format!("decliner {i}"), Attendance::No))
                .await
                .unwrap();
        }

        assert_eq!(store.count(None).await.unwrap(), 5);
        assert_eq!(store.count(Some(Attendance::Yes)).await.unwrap(), 3);
        assert_eq!(store.count(Some(Attendance::No)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn scan_limit_returns_most_recent() {
        let store = test_store().await;
        for i in 0..8 {
            store
                .insert(&sample(&format!("guest {i}"), Attendance::Yes))
                .await
                .unwrap();
        }

        let recent = store.scan(None, Some(5)).await.unwrap();
        assert_eq!(recent.len(), 5);
        // Insertion order ascends, scan descends.
        assert_eq!(recent[0].name, "guest 7");
        assert_eq!(recent[4].name, "guest 3");
    }

    /// File-backed store with an immediate-busy connection, so a second
    /// writer holding the lock surfaces "database is locked" right away
    /// and the insert retry policy is what gets exercised.
    async fn file_store(tag: &str) -> (GuestStore, SqliteConnectOptions, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "wedding-rsvp-{tag}-{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::ZERO);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        (GuestStore::new(pool), options, path)
    }

    #[tokio::test]
    async fn scan_filter_returns_only_matching_rows() {
        let store = test_store().await;
        store.insert(&sample("a-yes", Attendance::Yes)).await.unwrap();
        store.insert(&sample("b-no", Attendance::No)).await.unwrap();
        store.insert(&sample("c-yes", Attendance::Yes)).await.unwrap();

        let attending = store.scan(Some(Attendance::Yes), None).await.unwrap();
        assert_eq!(attending.len(), 2);
        assert!(attending.iter().all(|g| g.attendance == "yes"));
        assert_eq!(
            attending.len() as i64,
            store.count(Some(Attendance::Yes)).await.unwrap()
        );

        let declining = store.scan(Some(Attendance::No), None).await.unwrap();
        assert_eq!(declining.len(), 1);
        assert_eq!(declining[0].name, "b-no");
    }

    #[tokio::test]
    async fn insert_retries_past_short_lived_lock() {
        let (store, options, path) = file_store("short-lock").await;

        let mut holder: SqliteConnection = options.connect().await.unwrap();
        sqlx::query("BEGIN EXCLUSIVE")
            .execute(&mut holder)
            .await
            .unwrap();

        // Released inside the retry window (attempts at ~0ms, 50ms, 150ms).
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            sqlx::query("COMMIT").execute(&mut holder).await.unwrap();
        });

        let id = store
            .insert(&sample("patient guest", Attendance::Yes))
            .await
            .unwrap();
        assert!(id > 0);
        assert_eq!(store.count(None).await.unwrap(), 1);

        release.await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn insert_reports_locked_when_writer_outlasts_retries() {
        let (store, options, path) = file_store("long-lock").await;

        let mut holder: SqliteConnection = options.connect().await.unwrap();
        sqlx::query("BEGIN EXCLUSIVE")
            .execute(&mut holder)
            .await
            .unwrap();

        // Lock held for the whole retry window.
        let err = store
            .insert(&sample("unlucky guest", Attendance::Yes))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceLocked));

        sqlx::query("COMMIT").execute(&mut holder).await.unwrap();
        assert_eq!(store.count(None).await.unwrap(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn concurrent_inserts_lose_nothing() {
        let store = Arc::new(test_store().await);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(&sample(&format!("guest {i}"), Attendance::Yes))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 20);
        assert_eq!(store.count(None).await.unwrap(), 20);
    }
}
