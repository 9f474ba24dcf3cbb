// ABOUTME: Exercise catalog resolution with a process-local cache in front of the remote store
// ABOUTME: Batched primary lookups for bulk assembly, primary-then-legacy fallback for single lookups
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use workout_templates_core::errors::AppResult;
use workout_templates_core::models::CatalogEntry;

use crate::remote::{CatalogSource, Column, RemoteStore, RowFilter};

/// Exercise metadata lookups
///
/// Entries fetched from either catalog are remembered for the lifetime of the
/// instance. Catalog rows are treated as immutable, so there is no expiry.
pub struct ExerciseCatalog {
    remote: Arc<dyn RemoteStore>,
    entries: DashMap<String, CatalogEntry>,
}

impl ExerciseCatalog {
    /// Create a catalog with an empty local cache
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            entries: DashMap::new(),
        }
    }

    /// Number of locally cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the local cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry in the local cache only
    #[must_use]
    pub fn cached(&self, exercise_id: &str) -> Option<CatalogEntry> {
        self.entries.get(exercise_id).map(|e| e.value().clone())
    }

    /// Warm the local cache with the full primary catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the remote select fails.
    pub async fn preload(&self) -> AppResult<usize> {
        let rows = self
            .remote
            .select_catalog(CatalogSource::Primary, &RowFilter::all())
            .await?;
        let count = rows.len();
        self.remember(rows);
        info!(target: "workout_templates::catalog", entries = count, "Exercise catalog preloaded");
        Ok(count)
    }

    /// Resolve many ids with at most one remote round trip
    ///
    /// Ids found in neither the local cache nor the primary catalog are simply
    /// absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote lookup fails.
    pub async fn resolve_batch<'a, I>(
        &self,
        exercise_ids: I,
    ) -> AppResult<HashMap<String, CatalogEntry>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = HashMap::new();
        let mut missing: HashSet<&str> = HashSet::new();

        for id in exercise_ids {
            if resolved.contains_key(id) || missing.contains(id) {
                continue;
            }
            match self.cached(id) {
                Some(entry) => {
                    resolved.insert(id.to_owned(), entry);
                }
                None => {
                    missing.insert(id);
                }
            }
        }

        if missing.is_empty() {
            debug!(target: "workout_templates::catalog", hits = resolved.len(), "Catalog resolved locally");
            return Ok(resolved);
        }

        let filter = RowFilter::all().is_in(Column::Id, missing.iter().copied());
        let rows = self
            .remote
            .select_catalog(CatalogSource::Primary, &filter)
            .await?;

        debug!(
            target: "workout_templates::catalog",
            local_hits = resolved.len(),
            requested = missing.len(),
            fetched = rows.len(),
            "Catalog batch lookup"
        );

        for row in &rows {
            resolved.insert(row.id.clone(), row.clone());
        }
        self.remember(rows);
        Ok(resolved)
    }

    /// Resolve one id: local cache, then the primary catalog, then the legacy view
    ///
    /// # Errors
    ///
    /// Returns an error if a remote lookup fails.
    pub async fn resolve_one(&self, exercise_id: &str) -> AppResult<Option<CatalogEntry>> {
        if let Some(entry) = self.cached(exercise_id) {
            return Ok(Some(entry));
        }

        for source in [CatalogSource::Primary, CatalogSource::Legacy] {
            let filter = RowFilter::all().eq(Column::Id, exercise_id);
            let found = self
                .remote
                .select_catalog(source, &filter)
                .await?
                .into_iter()
                .next();
            if let Some(entry) = found {
                if source == CatalogSource::Legacy {
                    debug!(
                        target: "workout_templates::catalog",
                        exercise_id,
                        "Resolved exercise from legacy catalog"
                    );
                }
                self.entries.insert(entry.id.clone(), entry.clone());
                return Ok(Some(entry));
            }
        }

        Ok(None)
    }

    fn remember(&self, rows: Vec<CatalogEntry>) {
        for row in rows {
            self.entries.insert(row.id.clone(), row);
        }
    }
}
