// ABOUTME: Tests for the SQLite-backed key/value store on a real database file
// ABOUTME: Values survive reconnects, overwrite in place and can be removed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use common::{full_body, manual_clock, seed_catalog};
use tempfile::TempDir;
use workout_templates::clock::Clock;
use workout_templates::config::CacheConfig;
use workout_templates::remote::SqliteRemoteStore;
use workout_templates::storage::{KeyValueStore, SqliteKeyValueStore};
use workout_templates::TemplateService;
use workout_templates_core::models::OwnerId;

async fn open(path: &Path) -> Result<(SqliteRemoteStore, SqliteKeyValueStore)> {
    let remote = SqliteRemoteStore::connect(&format!("sqlite:{}", path.display())).await?;
    let storage = SqliteKeyValueStore::new(remote.pool().clone()).await?;
    Ok((remote, storage))
}

#[tokio::test]
async fn test_values_survive_reconnect() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("templates.db");

    {
        let (_, storage) = open(&path).await?;
        storage.put_string("greeting", "hello").await?;
        storage.put_long("counter", 42).await?;
    }

    let (_, storage) = open(&path).await?;
    assert_eq!(storage.get_string("greeting").await?.as_deref(), Some("hello"));
    assert_eq!(storage.get_long("counter").await?, Some(42));
    assert!(storage.get_string("missing").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_put_overwrites_and_remove_deletes() -> Result<()> {
    let dir = TempDir::new()?;
    let (_, storage) = open(&dir.path().join("kv.db")).await?;

    storage.put_string("k", "first").await?;
    storage.put_string("k", "second").await?;
    storage.put_long("k", 7).await?;
    storage.put_long("k", -7).await?;
    assert_eq!(storage.get_string("k").await?.as_deref(), Some("second"));
    assert_eq!(storage.get_long("k").await?, Some(-7));

    storage.remove("k").await?;
    assert!(storage.get_string("k").await?.is_none());
    assert!(storage.get_long("k").await?.is_none());

    // Removing an absent key is not an error
    storage.remove("k").await?;
    Ok(())
}

#[tokio::test]
async fn test_user_snapshot_survives_process_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("templates.db");
    let owner = OwnerId::new("u1");
    let clock: Arc<dyn Clock> = manual_clock();
    let config = CacheConfig::default();

    {
        let (remote, storage) = open(&path).await?;
        seed_catalog(&remote).await;
        let service =
            TemplateService::with_clock(Arc::new(remote), Arc::new(storage), config, Arc::clone(&clock));
        service.save_template(&full_body("Durable"), Some(&owner)).await?;
        assert_eq!(service.load_user_templates(&owner).await?.len(), 1);
    }

    let (remote, storage) = open(&path).await?;
    let service = TemplateService::with_clock(Arc::new(remote), Arc::new(storage), config, clock);
    let templates = service.load_user_templates(&owner).await?;
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "Durable");
    Ok(())
}
