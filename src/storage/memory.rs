// ABOUTME: Process-local key/value store for tests and ephemeral embedding
// ABOUTME: Two DashMaps, one for string payloads and one for integer timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use dashmap::DashMap;

use super::{KeyValueStore, StorageResult};

/// Non-durable [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    strings: DashMap<String, String>,
    longs: DashMap<String, i64>,
}

impl InMemoryKeyValueStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys of either kind
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len() + self.longs.len()
    }

    /// Whether no keys are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.longs.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.strings.get(key).map(|v| v.value().clone()))
    }

    async fn put_string(&self, key: &str, value: &str) -> StorageResult<()> {
        self.strings.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get_long(&self, key: &str) -> StorageResult<Option<i64>> {
        Ok(self.longs.get(key).map(|v| *v.value()))
    }

    async fn put_long(&self, key: &str, value: i64) -> StorageResult<()> {
        self.longs.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.strings.remove(key);
        self.longs.remove(key);
        Ok(())
    }
}
