// ABOUTME: SQLite-backed key/value store for cache payloads that survive restarts
// ABOUTME: Separate tables for string values and integer timestamps, upserted per key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{KeyValueStore, StorageError, StorageResult};

/// Durable [`KeyValueStore`] over a `SQLite` pool
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Wrap a pool and create the key/value tables if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be created.
    pub async fn new(pool: SqlitePool) -> StorageResult<Self> {
        for statement in [
            "CREATE TABLE IF NOT EXISTS kv_strings (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            "CREATE TABLE IF NOT EXISTS kv_longs (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| storage_error("Failed to create key/value tables", &e))?;
        }
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_strings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to read string", &e))?;
        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| storage_error("Failed to decode string", &e))
    }

    async fn put_string(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO kv_strings (key, value) VALUES ($1, $2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to write string", &e))?;
        Ok(())
    }

    async fn get_long(&self, key: &str) -> StorageResult<Option<i64>> {
        let row = sqlx::query("SELECT value FROM kv_longs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to read long", &e))?;
        row.map(|r| r.try_get::<i64, _>("value"))
            .transpose()
            .map_err(|e| storage_error("Failed to decode long", &e))
    }

    async fn put_long(&self, key: &str, value: i64) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO kv_longs (key, value) VALUES ($1, $2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to write long", &e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        for statement in [
            "DELETE FROM kv_strings WHERE key = $1",
            "DELETE FROM kv_longs WHERE key = $1",
        ] {
            sqlx::query(statement)
                .bind(key)
                .execute(&self.pool)
                .await
                .map_err(|e| write_error("Failed to remove key", &e))?;
        }
        Ok(())
    }
}

fn storage_error(context: &str, err: &sqlx::Error) -> StorageError {
    StorageError::Database(format!("{context}: {err}"))
}

fn write_error(context: &str, err: &sqlx::Error) -> StorageError {
    StorageError::WriteRejected(format!("{context}: {err}"))
}
