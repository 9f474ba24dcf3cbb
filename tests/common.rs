// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory SQLite stores, counting/failing store wrappers, manual clock and draft builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `workout_templates`
//!
//! Every harness gets its own in-memory `SQLite` database, so tests never
//! share state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use workout_templates::clock::{Clock, ManualClock};
use workout_templates::config::CacheConfig;
use workout_templates::remote::{
    CatalogRow, CatalogSource, Column, Condition, ExerciseSetRow, NewExerciseSetRow,
    NewTemplateExerciseRow, NewTemplateRow, RemoteError, RemoteResult, RemoteStore, RowFilter,
    SqliteRemoteStore, TemplateExerciseRow, TemplateRow,
};
use workout_templates::storage::{
    InMemoryKeyValueStore, KeyValueStore, StorageError, StorageResult,
};
use workout_templates::TemplateService;
use workout_templates_core::models::{
    CatalogEntry, NewExerciseSet, NewTemplate, NewTemplateExercise,
};

/// Catalog ids seeded by [`seed_catalog`]
pub const SQUAT: &str = "back-squat";
pub const BENCH: &str = "bench-press";
pub const ROW: &str = "barbell-row";
pub const PLANK: &str = "plank";
/// Only present in the legacy catalog
pub const SWING: &str = "kb-swing";

/// Remote store wrapper counting reads per table and injecting failures
pub struct InstrumentedRemoteStore {
    inner: SqliteRemoteStore,
    pub template_selects: AtomicUsize,
    pub exercise_selects: AtomicUsize,
    pub set_selects: AtomicUsize,
    pub catalog_selects: AtomicUsize,
    pub legacy_catalog_selects: AtomicUsize,
    /// Every select fails with `Unavailable`
    pub fail_reads: AtomicBool,
    /// Every write fails with `Unavailable`
    pub fail_writes: AtomicBool,
    /// Set inserts fail after the template and exercise rows went in
    pub fail_set_inserts: AtomicBool,
    /// Exercise selects filtered on this template id fail
    pub fail_exercises_for: Mutex<Option<String>>,
}

impl InstrumentedRemoteStore {
    pub fn new(inner: SqliteRemoteStore) -> Self {
        Self {
            inner,
            template_selects: AtomicUsize::new(0),
            exercise_selects: AtomicUsize::new(0),
            set_selects: AtomicUsize::new(0),
            catalog_selects: AtomicUsize::new(0),
            legacy_catalog_selects: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_set_inserts: AtomicBool::new(false),
            fail_exercises_for: Mutex::new(None),
        }
    }

    pub fn sqlite(&self) -> &SqliteRemoteStore {
        &self.inner
    }

    /// Total selects across every table
    pub fn reads(&self) -> usize {
        self.template_selects.load(Ordering::SeqCst)
            + self.exercise_selects.load(Ordering::SeqCst)
            + self.set_selects.load(Ordering::SeqCst)
            + self.catalog_selects.load(Ordering::SeqCst)
            + self.legacy_catalog_selects.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        for counter in [
            &self.template_selects,
            &self.exercise_selects,
            &self.set_selects,
            &self.catalog_selects,
            &self.legacy_catalog_selects,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn check_read(&self) -> RemoteResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected read failure".to_owned()));
        }
        Ok(())
    }

    fn check_write(&self) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected write failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InstrumentedRemoteStore {
    async fn select_templates(&self, filter: &RowFilter) -> RemoteResult<Vec<TemplateRow>> {
        self.template_selects.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.select_templates(filter).await
    }

    async fn select_template_exercises(
        &self,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<TemplateExerciseRow>> {
        self.exercise_selects.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        let failing = self.fail_exercises_for.lock().unwrap().clone();
        if let Some(template_id) = failing {
            let targeted = filter.conditions().iter().any(|condition| {
                matches!(condition, Condition::Eq(Column::TemplateId, value) if *value == template_id)
            });
            if targeted {
                return Err(RemoteError::Query {
                    context: format!("injected failure for {template_id}"),
                });
            }
        }
        self.inner.select_template_exercises(filter).await
    }

    async fn select_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<Vec<ExerciseSetRow>> {
        self.set_selects.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.select_exercise_sets(filter).await
    }

    async fn select_catalog(
        &self,
        source: CatalogSource,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<CatalogRow>> {
        match source {
            CatalogSource::Primary => self.catalog_selects.fetch_add(1, Ordering::SeqCst),
            CatalogSource::Legacy => self.legacy_catalog_selects.fetch_add(1, Ordering::SeqCst),
        };
        self.check_read()?;
        self.inner.select_catalog(source, filter).await
    }

    async fn insert_template(&self, row: &NewTemplateRow) -> RemoteResult<TemplateRow> {
        self.check_write()?;
        self.inner.insert_template(row).await
    }

    async fn insert_template_exercise(
        &self,
        row: &NewTemplateExerciseRow,
    ) -> RemoteResult<TemplateExerciseRow> {
        self.check_write()?;
        self.inner.insert_template_exercise(row).await
    }

    async fn insert_exercise_sets(
        &self,
        rows: &[NewExerciseSetRow],
    ) -> RemoteResult<Vec<ExerciseSetRow>> {
        self.check_write()?;
        if self.fail_set_inserts.load(Ordering::SeqCst) {
            return Err(RemoteError::Query {
                context: "injected set insert failure".to_owned(),
            });
        }
        self.inner.insert_exercise_sets(rows).await
    }

    async fn delete_templates(&self, filter: &RowFilter) -> RemoteResult<u64> {
        self.check_write()?;
        self.inner.delete_templates(filter).await
    }

    async fn delete_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<u64> {
        self.check_write()?;
        self.inner.delete_exercise_sets(filter).await
    }
}

/// Key/value store where every operation fails
#[derive(Debug, Default)]
pub struct FailingKeyValueStore;

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get_string(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Database("disk unavailable".to_owned()))
    }

    async fn put_string(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::WriteRejected("disk full".to_owned()))
    }

    async fn get_long(&self, _key: &str) -> StorageResult<Option<i64>> {
        Err(StorageError::Database("disk unavailable".to_owned()))
    }

    async fn put_long(&self, _key: &str, _value: i64) -> StorageResult<()> {
        Err(StorageError::WriteRejected("disk full".to_owned()))
    }

    async fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::WriteRejected("disk full".to_owned()))
    }
}

/// Everything a service-level test needs
pub struct Harness {
    pub service: TemplateService,
    pub remote: Arc<InstrumentedRemoteStore>,
    pub storage: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Another service over the same stores with empty in-memory state
    pub fn restarted(&self) -> TemplateService {
        self.restarted_with(CacheConfig::default())
    }

    pub fn restarted_with(&self, config: CacheConfig) -> TemplateService {
        let clock: Arc<dyn Clock> = self.clock.clone();
        TemplateService::with_clock(
            self.remote.clone(),
            Arc::clone(&self.storage),
            config,
            clock,
        )
    }
}

/// Fresh in-memory remote store with the standard catalog seeded
pub async fn remote_store() -> Arc<InstrumentedRemoteStore> {
    let sqlite = SqliteRemoteStore::connect("sqlite::memory:").await.unwrap();
    seed_catalog(&sqlite).await;
    Arc::new(InstrumentedRemoteStore::new(sqlite))
}

/// Fixed starting point for manual clocks
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ))
}

pub async fn harness() -> Harness {
    harness_with(CacheConfig::default(), Arc::new(InMemoryKeyValueStore::new())).await
}

pub async fn harness_with(config: CacheConfig, storage: Arc<dyn KeyValueStore>) -> Harness {
    let remote = remote_store().await;
    let clock = manual_clock();
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let service =
        TemplateService::with_clock(remote.clone(), Arc::clone(&storage), config, dyn_clock);
    Harness {
        service,
        remote,
        storage,
        clock,
    }
}

pub fn catalog_entry(id: &str, name: &str, muscle_group: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_owned(),
        name: name.to_owned(),
        muscle_group: Some(muscle_group.to_owned()),
        equipment: None,
    }
}

pub async fn seed_catalog(store: &SqliteRemoteStore) {
    for entry in [
        catalog_entry(SQUAT, "Back Squat", "legs"),
        catalog_entry(BENCH, "Bench Press", "chest"),
        catalog_entry(ROW, "Barbell Row", "back"),
        catalog_entry(PLANK, "Plank", "core"),
    ] {
        store
            .upsert_catalog_entry(CatalogSource::Primary, &entry)
            .await
            .unwrap();
    }
    store
        .upsert_catalog_entry(
            CatalogSource::Legacy,
            &catalog_entry(SWING, "Kettlebell Swing", "posterior chain"),
        )
        .await
        .unwrap();
}

/// A set with the given number and reps, other fields defaulted
pub fn set(set_number: u32, target_reps: u32) -> NewExerciseSet {
    NewExerciseSet {
        set_number,
        target_reps,
        ..NewExerciseSet::default()
    }
}

/// Exercise with `sets` numbered 1..=sets
pub fn exercise(exercise_id: &str, order_index: u32, sets: u32) -> NewTemplateExercise {
    (1..=sets).fold(NewTemplateExercise::new(exercise_id, order_index), |e, n| {
        e.with_set(set(n, 10))
    })
}

/// Squat, bench and row with three, two and one sets
pub fn full_body(name: &str) -> NewTemplate {
    NewTemplate::named(name)
        .with_exercise(exercise(SQUAT, 0, 3))
        .with_exercise(exercise(BENCH, 1, 2))
        .with_exercise(exercise(ROW, 2, 1))
}
