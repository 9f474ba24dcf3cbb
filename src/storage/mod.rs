// ABOUTME: Durable key/value contract used for the disk cache tier and last-used slot
// ABOUTME: String payloads and integer timestamps under flat string keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Persistent Key/Value Store
//!
//! The cache layer serializes its own payloads; the store only moves strings
//! and `i64` timestamps. Every caller treats a [`StorageError`] as a miss or a
//! skipped write, so implementations may fail freely.

/// In-memory implementation backed by `DashMap`
pub mod memory;
/// `SQLite` implementation for durable storage
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use workout_templates_core::errors::AppError;

pub use memory::InMemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Errors from a key/value store
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying database failed
    #[error("key/value database error: {0}")]
    Database(String),

    /// Store is out of space or refused the write
    #[error("key/value write rejected: {0}")]
    WriteRejected(String),
}

/// Result alias for key/value operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::database(err.to_string())
    }
}

/// Durable key/value store surviving process restarts
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a string value
    async fn get_string(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a string value, replacing any previous one
    async fn put_string(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read an integer value
    async fn get_long(&self, key: &str) -> StorageResult<Option<i64>>;

    /// Write an integer value, replacing any previous one
    async fn put_long(&self, key: &str, value: i64) -> StorageResult<()>;

    /// Remove a key of either kind; absent keys are not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
