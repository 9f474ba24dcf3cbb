// ABOUTME: Caller-facing template API wiring the assembler, tier cache, mutations and last-used slot
// ABOUTME: Explicitly constructed, cheaply cloneable handle with no process-wide state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Template Service
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use workout_templates::config::CacheConfig;
//! use workout_templates::remote::SqliteRemoteStore;
//! use workout_templates::service::TemplateService;
//! use workout_templates::storage::SqliteKeyValueStore;
//! use workout_templates_core::errors::AppResult;
//!
//! # async fn example() -> AppResult<()> {
//! let remote = SqliteRemoteStore::connect("sqlite:./data/templates.db").await?;
//! let storage = SqliteKeyValueStore::new(remote.pool().clone()).await?;
//! let service = TemplateService::new(Arc::new(remote), Arc::new(storage), CacheConfig::default());
//!
//! let public = service.load_public_templates(false).await?;
//! println!("{} public templates", public.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, info, instrument, warn};
use workout_templates_core::errors::AppResult;
use workout_templates_core::models::{
    ExerciseRowId, LastUsedRecord, NewExerciseSet, NewTemplate, OwnerId, Template, TemplateId,
};

use crate::assembler::{keep_populated, BulkAssembler};
use crate::cache::{CacheDomain, CacheRead, CacheSource, TierCache};
use crate::catalog::ExerciseCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::last_used::LastUsedTracker;
use crate::mutations::{MutationCoordinator, ProgramPushReport};
use crate::remote::RemoteStore;
use crate::storage::KeyValueStore;

struct ServiceInner {
    catalog: Arc<ExerciseCatalog>,
    assembler: BulkAssembler,
    cache: Arc<TierCache>,
    mutations: MutationCoordinator,
    last_used: LastUsedTracker,
    /// Domains with a background refresh in flight
    refreshing: DashSet<CacheDomain>,
}

/// Template data access for one process
///
/// Clones share the same caches.
#[derive(Clone)]
pub struct TemplateService {
    inner: Arc<ServiceInner>,
}

impl TemplateService {
    /// Build a service over the given stores using the system clock
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        storage: Arc<dyn KeyValueStore>,
        config: CacheConfig,
    ) -> Self {
        Self::with_clock(remote, storage, config, Arc::new(SystemClock))
    }

    /// Build a service with an explicit clock
    #[must_use]
    pub fn with_clock(
        remote: Arc<dyn RemoteStore>,
        storage: Arc<dyn KeyValueStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Arc::new(ExerciseCatalog::new(Arc::clone(&remote)));
        let cache = Arc::new(TierCache::new(
            Arc::clone(&storage),
            Arc::clone(&clock),
            config,
        ));
        let inner = ServiceInner {
            assembler: BulkAssembler::new(Arc::clone(&remote), Arc::clone(&catalog)),
            mutations: MutationCoordinator::new(remote, Arc::clone(&cache)),
            last_used: LastUsedTracker::new(storage, clock),
            refreshing: DashSet::new(),
            catalog,
            cache,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Public templates, cache first unless `force_refresh`
    ///
    /// # Errors
    ///
    /// Returns the remote error when no cached entry could serve the read.
    #[instrument(skip(self))]
    pub async fn load_public_templates(&self, force_refresh: bool) -> AppResult<Vec<Template>> {
        Ok(self.load_domain(CacheDomain::Public, force_refresh).await?.templates)
    }

    /// Templates of `owner`, cache first
    ///
    /// A disk hit is returned immediately and, by default, refreshed from the
    /// remote store in the background.
    ///
    /// # Errors
    ///
    /// Returns the remote error when no cached entry could serve the read.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn load_user_templates(&self, owner: &OwnerId) -> AppResult<Vec<Template>> {
        Ok(self
            .load_domain(CacheDomain::User(owner.clone()), false)
            .await?
            .templates)
    }

    /// Templates of `owner` straight from the remote store, refreshing both tiers
    ///
    /// # Errors
    ///
    /// Returns the remote error; cached entries are left untouched.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn refresh_user_templates(&self, owner: &OwnerId) -> AppResult<Vec<Template>> {
        Ok(self
            .load_domain(CacheDomain::User(owner.clone()), true)
            .await?
            .templates)
    }

    /// In-memory templates of `owner`, without any I/O
    ///
    /// `None` when nothing is cached for this owner, including when another
    /// owner's templates occupy the memory tier.
    #[must_use]
    pub fn cached_user_templates(&self, owner: &OwnerId) -> Option<Vec<Template>> {
        self.inner.cache.cached(&CacheDomain::User(owner.clone()))
    }

    /// One template by id, always from the remote store
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown id or the remote error.
    #[instrument(skip(self), fields(template_id = %id))]
    pub async fn load_template_by_id(&self, id: &TemplateId) -> AppResult<Template> {
        self.inner.assembler.assemble_by_id(id).await
    }

    /// Create a template owned by `owner`, or a public one for `None`
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::create`].
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn save_template(
        &self,
        draft: &NewTemplate,
        owner: Option<&OwnerId>,
    ) -> AppResult<TemplateId> {
        self.inner.mutations.create(draft, owner).await
    }

    /// Replace template `id` with `draft`; returns the new id
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::update`].
    #[instrument(skip(self, draft), fields(template_id = %id))]
    pub async fn update_template(
        &self,
        id: &TemplateId,
        draft: &NewTemplate,
        owner: Option<&OwnerId>,
    ) -> AppResult<TemplateId> {
        self.inner.mutations.update(id, draft, owner).await
    }

    /// Delete template `id`; `false` when nothing matched
    ///
    /// # Errors
    ///
    /// Returns the remote error.
    #[instrument(skip(self), fields(template_id = %id))]
    pub async fn delete_template(
        &self,
        id: &TemplateId,
        owner: Option<&OwnerId>,
    ) -> AppResult<bool> {
        self.inner.mutations.delete(id, owner).await
    }

    /// Replace all sets of one exercise row
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::replace_sets`].
    #[instrument(skip(self, sets), fields(exercise_row_id = %row_id, sets = sets.len()))]
    pub async fn update_exercise_sets(
        &self,
        row_id: &ExerciseRowId,
        sets: &[NewExerciseSet],
    ) -> AppResult<()> {
        self.inner.mutations.replace_sets(row_id, sets).await
    }

    /// Create several templates at once, reporting failures per template
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::push_program`].
    #[instrument(skip(self, drafts), fields(templates = drafts.len()))]
    pub async fn push_program(
        &self,
        owner: Option<&OwnerId>,
        drafts: &[NewTemplate],
    ) -> AppResult<ProgramPushReport> {
        self.inner.mutations.push_program(owner, drafts).await
    }

    /// Delete every template of `owner`; returns the number removed
    ///
    /// # Errors
    ///
    /// Returns the remote error.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn delete_owner_templates(&self, owner: &OwnerId) -> AppResult<u64> {
        self.inner.mutations.delete_owner_templates(owner).await
    }

    /// Load the whole primary exercise catalog into the local cache
    ///
    /// # Errors
    ///
    /// Returns the remote error.
    pub async fn preload_catalog(&self) -> AppResult<usize> {
        self.inner.catalog.preload().await
    }

    /// Drop the in-memory public templates
    pub fn invalidate_public(&self) {
        self.inner.cache.invalidate(&CacheDomain::Public);
    }

    /// Drop the in-memory templates of `owner`
    pub fn invalidate_user(&self, owner: &OwnerId) {
        self.inner.cache.invalidate(&CacheDomain::User(owner.clone()));
    }

    /// Remember `template` as the one to resume
    pub async fn save_last_used(&self, template: &Template) {
        self.inner.last_used.save(template).await;
    }

    /// Template to resume, if any; never touches the network
    pub async fn last_used(&self) -> Option<LastUsedRecord> {
        self.inner.last_used.get().await
    }

    /// Forget the template to resume
    pub async fn clear_last_used(&self) {
        self.inner.last_used.clear().await;
    }

    async fn load_domain(&self, domain: CacheDomain, force_refresh: bool) -> AppResult<CacheRead> {
        if force_refresh {
            return self.reload(&domain).await;
        }

        let cache = &self.inner.cache;
        let read = cache
            .get_or_load(&domain, false, || self.assemble(&domain))
            .await?;

        if read.source == CacheSource::Disk && cache.policy(&domain).refresh_after_disk_hit {
            self.spawn_refresh(domain);
        }
        Ok(read)
    }

    async fn reload(&self, domain: &CacheDomain) -> AppResult<CacheRead> {
        self.inner
            .cache
            .get_or_load(domain, true, || self.assemble(domain))
            .await
    }

    async fn assemble(&self, domain: &CacheDomain) -> AppResult<Vec<Template>> {
        match domain {
            CacheDomain::Public => self.inner.assembler.assemble_public().await,
            CacheDomain::User(owner) => {
                let graphs = self.inner.assembler.assemble_owned(owner).await?;
                Ok(keep_populated(graphs))
            }
        }
    }

    fn spawn_refresh(&self, domain: CacheDomain) {
        if !self.inner.refreshing.insert(domain.clone()) {
            debug!(target: "workout_templates::cache", key = %domain, "Background refresh already running");
            return;
        }
        let service = self.clone();
        debug!(target: "workout_templates::cache", key = %domain, "Scheduling background refresh");
        tokio::spawn(async move {
            let result = service.reload(&domain).await;
            service.inner.refreshing.remove(&domain);
            match result {
                Ok(read) => info!(
                    target: "workout_templates::cache",
                    key = %domain,
                    templates = read.templates.len(),
                    "Background refresh complete"
                ),
                Err(e) => warn!(
                    target: "workout_templates::cache",
                    key = %domain,
                    error = %e,
                    "Background refresh failed"
                ),
            }
        });
    }
}
