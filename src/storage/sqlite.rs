//! SQLite-backed key-value store and run history.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error_handling::{CoreError, CoreResult, ErrorKind};

use super::KeyValueStore;

fn db_error(context: &str, err: sqlx::Error) -> CoreError {
    CoreError::new(ErrorKind::Connection, format!("{context}: {err}"))
}

/// Opens (creating if needed) the SQLite database at `path`.
pub async fn init_db_pool(path: &Path) -> CoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .map_err(|e| db_error("invalid database path", e))?
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| db_error("failed to open database", e))
}

/// Creates the schema when missing.
pub async fn run_migrations(pool: &SqlitePool) -> CoreResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS kv_store (
            namespace TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            encrypted INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (namespace, key)
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| db_error("failed to create kv_store table", e))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS run_history (
            execution_id TEXT PRIMARY KEY,
            config_id TEXT NOT NULL,
            config_name TEXT NOT NULL,
            status TEXT NOT NULL,
            total_links INTEGER NOT NULL,
            successful_links INTEGER NOT NULL,
            failed_links INTEGER NOT NULL,
            ads_updated INTEGER NOT NULL,
            elapsed_seconds REAL NOT NULL,
            started_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| db_error("failed to create run_history table", e))?;

    Ok(())
}

/// Key-value store backed by the `kv_store` table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteKeyValueStore { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_raw(&self, namespace: &str, key: &str) -> CoreResult<Option<String>> {
        let row = sqlx::query(
            "SELECT value, encrypted FROM kv_store WHERE namespace = ? AND key = ?",
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("failed to read key", e))?;

        let Some(row) = row else { return Ok(None) };
        let value: String = row.get("value");
        let encrypted: i64 = row.get("encrypted");
        if encrypted == 0 {
            return Ok(Some(value));
        }
        let decoded = BASE64.decode(&value).map_err(|e| {
            CoreError::validation(format!("stored value for {namespace}/{key} is corrupt: {e}"))
        })?;
        String::from_utf8(decoded)
            .map(Some)
            .map_err(|e| CoreError::validation(format!("stored value is not UTF-8: {e}")))
    }

    async fn set_raw(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        encrypt: bool,
    ) -> CoreResult<()> {
        let stored = if encrypt {
            BASE64.encode(value.as_bytes())
        } else {
            value.to_string()
        };
        sqlx::query(
            "INSERT INTO kv_store (namespace, key, value, encrypted, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                encrypted = excluded.encrypted,
                updated_at = excluded.updated_at",
        )
        .bind(namespace)
        .bind(key)
        .bind(stored)
        .bind(i64::from(encrypt))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to write key", e))?;
        Ok(())
    }

    async fn delete_item(&self, namespace: &str, key: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete key", e))?;
        Ok(())
    }

    async fn get_all_keys(&self, namespace: &str) -> CoreResult<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv_store WHERE namespace = ? ORDER BY key")
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list keys", e))?;
        Ok(rows.into_iter().map(|row| row.get("key")).collect())
    }
}

/// One persisted run summary.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub execution_id: String,
    pub config_id: String,
    pub config_name: String,
    pub status: String,
    pub total_links: i64,
    pub successful_links: i64,
    pub failed_links: i64,
    pub ads_updated: i64,
    pub elapsed_seconds: f64,
    pub started_at: i64,
}

/// Persists a run summary.
pub async fn insert_run_record(pool: &SqlitePool, record: &RunRecord) -> CoreResult<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO run_history (
            execution_id, config_id, config_name, status,
            total_links, successful_links, failed_links, ads_updated,
            elapsed_seconds, started_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.execution_id)
    .bind(&record.config_id)
    .bind(&record.config_name)
    .bind(&record.status)
    .bind(record.total_links)
    .bind(record.successful_links)
    .bind(record.failed_links)
    .bind(record.ads_updated)
    .bind(record.elapsed_seconds)
    .bind(record.started_at)
    .execute(pool)
    .await
    .map_err(|e| db_error("failed to insert run record", e))?;
    Ok(())
}

/// The most recent runs, newest first.
pub async fn query_run_history(pool: &SqlitePool, limit: u32) -> CoreResult<Vec<RunRecord>> {
    let rows = sqlx::query(
        "SELECT execution_id, config_id, config_name, status,
                total_links, successful_links, failed_links, ads_updated,
                elapsed_seconds, started_at
         FROM run_history ORDER BY started_at DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
    .map_err(|e| db_error("failed to query run history", e))?;

    Ok(rows
        .into_iter()
        .map(|row| RunRecord {
            execution_id: row.get("execution_id"),
            config_id: row.get("config_id"),
            config_name: row.get("config_name"),
            status: row.get("status"),
            total_links: row.get("total_links"),
            successful_links: row.get("successful_links"),
            failed_links: row.get("failed_links"),
            ads_updated: row.get("ads_updated"),
            elapsed_seconds: row.get("elapsed_seconds"),
            started_at: row.get("started_at"),
        })
        .collect())
}
