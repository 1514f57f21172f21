//! SQLite-backed key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::infrastructure::ports::{ClockPort, KeyValueStore, StorageError};

/// Durable store in a single `kv_store` table.
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, StorageError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| StorageError::backend("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::backend("migrate", e))?;

        tracing::debug!(db_path, "Opened SQLite key-value store");
        Ok(Self { pool, clock })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::backend("get", e))?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::backend("set", e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::backend("delete", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;

    #[tokio::test]
    async fn values_survive_reopening_the_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("delve.db");
        let path = path.to_string_lossy().to_string();

        let store = SqliteStore::new(&path, Arc::new(SystemClock::new()))
            .await
            .expect("open");
        store.set("delve:runs", "[]".to_string()).await.expect("set");
        store
            .set("delve:runs", "[1]".to_string())
            .await
            .expect("upsert");
        store.set("scratch", "x".to_string()).await.expect("set");
        store.delete("scratch").await.expect("delete");
        store.close().await;

        let reopened = SqliteStore::new(&path, Arc::new(SystemClock::new()))
            .await
            .expect("reopen");
        assert_eq!(
            reopened.get("delve:runs").await.expect("get"),
            Some("[1]".to_string())
        );
        assert_eq!(reopened.get("scratch").await.expect("get"), None);
    }
}
