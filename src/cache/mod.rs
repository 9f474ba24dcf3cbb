// ABOUTME: Two-tier template cache: short-lived in-memory entries over a durable disk tier
// ABOUTME: Tier-ordered reads with per-domain TTL policy and explicit invalidation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tier Cache
//!
//! Reads are served memory first, then disk, then from a caller-supplied
//! loader (normally the bulk assembler):
//!
//! 1. memory entry younger than the domain's memory TTL: returned, no I/O
//! 2. disk entry within the domain's disk TTL (or any age when the domain has
//!    none): decoded, promoted to memory, returned
//! 3. otherwise the loader runs and its result is written to both tiers
//!
//! Disk problems never fail a read. Undecodable payloads are a miss and failed
//! writes are logged and skipped.
//!
//! Invalidation drops the memory entry and marks the domain dirty. A dirty
//! domain skips the disk tier until the next successful load, so writes made
//! by this process are visible on the next read while the disk entry stays
//! available to the next launch as a first frame.
//!
//! The memory tier has one slot for public templates and one slot for the
//! active owner. Reading for another owner is a miss and the slot is replaced
//! on that owner's next load.

/// Disk payload envelope
pub mod payload;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};
use workout_templates_core::errors::AppResult;
use workout_templates_core::models::{OwnerId, Template};

use crate::clock::{from_millis, is_fresh, Clock};
use crate::config::{CacheConfig, DomainCachePolicy};
use crate::constants::cache_keys::{LOADED_AT_SUFFIX, PAYLOAD_SUFFIX, TEMPLATES_PREFIX};
use crate::storage::KeyValueStore;

/// Which set of templates a cache entry holds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    /// Templates without an owner
    Public,
    /// Templates belonging to one user
    User(OwnerId),
}

impl CacheDomain {
    /// Stable key used for disk entries and logs
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Public => "public".to_owned(),
            Self::User(owner) => format!("user:{owner}"),
        }
    }

    const fn slot(&self) -> MemorySlot {
        match self {
            Self::Public => MemorySlot::Public,
            Self::User(_) => MemorySlot::User,
        }
    }

    const fn owner(&self) -> Option<&OwnerId> {
        match self {
            Self::Public => None,
            Self::User(owner) => Some(owner),
        }
    }

    fn payload_key(&self) -> String {
        format!("{TEMPLATES_PREFIX}.{}.{PAYLOAD_SUFFIX}", self.key())
    }

    fn loaded_at_key(&self) -> String {
        format!("{TEMPLATES_PREFIX}.{}.{LOADED_AT_SUFFIX}", self.key())
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Tier that answered a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Fresh in-memory entry
    Memory,
    /// Disk entry promoted to memory
    Disk,
    /// Loader result
    Remote,
}

/// Templates returned by [`TierCache::get_or_load`] with their origin
#[derive(Debug, Clone)]
pub struct CacheRead {
    /// Cached or freshly loaded templates
    pub templates: Vec<Template>,
    /// Tier that served them
    pub source: CacheSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MemorySlot {
    Public,
    User,
}

#[derive(Debug)]
struct MemoryEntry {
    owner: Option<OwnerId>,
    templates: Arc<Vec<Template>>,
    loaded_at: DateTime<Utc>,
}

/// Memory plus disk cache of template lists
pub struct TierCache {
    memory: DashMap<MemorySlot, Arc<MemoryEntry>>,
    /// Invalidated domains and the generation of their latest invalidation
    dirty: DashMap<CacheDomain, u64>,
    generation: AtomicU64,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl TierCache {
    /// Create a cache over `storage` using `config` for TTLs
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            memory: DashMap::new(),
            dirty: DashMap::new(),
            generation: AtomicU64::new(0),
            storage,
            clock,
            config,
        }
    }

    /// Policy applied to `domain`
    #[must_use]
    pub const fn policy(&self, domain: &CacheDomain) -> &DomainCachePolicy {
        match domain {
            CacheDomain::Public => &self.config.public,
            CacheDomain::User(_) => &self.config.user,
        }
    }

    /// Serve `domain` from the first tier that has a fresh entry, else run `loader`
    ///
    /// With `force_refresh` both tiers are skipped. The disk tier is also
    /// skipped while the domain is dirty. A loader error is returned as-is and
    /// leaves both tiers untouched. A load that overlapped an invalidation of
    /// the same domain is returned but not cached.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn get_or_load<F, Fut>(
        &self,
        domain: &CacheDomain,
        force_refresh: bool,
        loader: F,
    ) -> AppResult<CacheRead>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = AppResult<Vec<Template>>> + Send,
    {
        let key = domain.key();

        if force_refresh {
            debug!(target: "workout_templates::cache", key = %key, "Cache bypass requested");
        } else {
            if let Some(templates) = self.fresh_memory(domain) {
                debug!(
                    target: "workout_templates::cache",
                    cache_hit = true,
                    tier = "memory",
                    key = %key,
                    "Cache hit"
                );
                return Ok(CacheRead {
                    templates,
                    source: CacheSource::Memory,
                });
            }

            let dirty = self.dirty.contains_key(domain);
            if dirty {
                debug!(target: "workout_templates::cache", key = %key, "Domain invalidated, skipping disk tier");
            } else if let Some(templates) = self.read_disk(domain).await {
                debug!(
                    target: "workout_templates::cache",
                    cache_hit = true,
                    tier = "disk",
                    key = %key,
                    "Cache hit"
                );
                return Ok(CacheRead {
                    templates,
                    source: CacheSource::Disk,
                });
            }

            debug!(
                target: "workout_templates::cache",
                cache_hit = false,
                key = %key,
                "Cache miss, loading from remote"
            );
        }

        let started = self.generation.load(Ordering::SeqCst);
        let templates = loader().await?;
        if self.invalidated_since(domain, started) {
            debug!(
                target: "workout_templates::cache",
                key = %key,
                "Load overlapped an invalidation, not caching it"
            );
        } else {
            self.store(domain, templates.clone()).await;
        }
        Ok(CacheRead {
            templates,
            source: CacheSource::Remote,
        })
    }

    /// Write `templates` to both tiers stamped with the current time
    ///
    /// Disk failures are logged and otherwise ignored. The memory entry is
    /// always written and the domain stops being dirty.
    pub async fn store(&self, domain: &CacheDomain, templates: Vec<Template>) {
        let generation = self.generation.load(Ordering::SeqCst);
        let loaded_at = self.clock.now();
        let key = domain.key();

        let payload = payload::encode(&templates);
        let count = templates.len();
        self.put_memory(domain, Arc::new(templates), loaded_at);
        self.dirty.remove_if(domain, |_, marked| *marked <= generation);

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: "workout_templates::cache", key = %key, error = %e, "Cache write skipped");
                return;
            }
        };

        let written = async {
            self.storage
                .put_string(&domain.payload_key(), &payload)
                .await?;
            self.storage
                .put_long(&domain.loaded_at_key(), loaded_at.timestamp_millis())
                .await
        }
        .await;

        match written {
            Ok(()) => debug!(target: "workout_templates::cache", key = %key, templates = count, "Cached templates"),
            Err(e) => warn!(target: "workout_templates::cache", key = %key, error = %e, "Cache write skipped"),
        }
    }

    /// Drop the memory entry for `domain` and mark it dirty
    ///
    /// The disk entry is kept as last known good for the next launch but is
    /// not served by this instance until the domain has been reloaded.
    pub fn invalidate(&self, domain: &CacheDomain) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dirty.insert(domain.clone(), generation);
        let owner = domain.owner();
        let removed = self
            .memory
            .remove_if(&domain.slot(), |_, entry| entry.owner.as_ref() == owner)
            .is_some();
        debug!(target: "workout_templates::cache", key = %domain, removed, "Memory entry invalidated");
    }

    /// Drop both tiers for `domain`
    pub async fn clear(&self, domain: &CacheDomain) {
        self.invalidate(domain);
        for key in [domain.payload_key(), domain.loaded_at_key()] {
            if let Err(e) = self.storage.remove(&key).await {
                warn!(target: "workout_templates::cache", key = %key, error = %e, "Failed to remove disk entry");
            }
        }
    }

    /// Whether `domain` was invalidated after `generation` was observed
    fn invalidated_since(&self, domain: &CacheDomain, generation: u64) -> bool {
        self.dirty
            .get(domain)
            .is_some_and(|marked| *marked.value() > generation)
    }

    /// Memory entry for `domain` regardless of age; never touches disk
    #[must_use]
    pub fn cached(&self, domain: &CacheDomain) -> Option<Vec<Template>> {
        self.memory_entry(domain)
            .map(|entry| entry.templates.as_ref().clone())
    }

    fn memory_entry(&self, domain: &CacheDomain) -> Option<Arc<MemoryEntry>> {
        let entry = self.memory.get(&domain.slot())?;
        (entry.owner.as_ref() == domain.owner()).then(|| Arc::clone(entry.value()))
    }

    fn fresh_memory(&self, domain: &CacheDomain) -> Option<Vec<Template>> {
        let entry = self.memory_entry(domain)?;
        let ttl = self.policy(domain).memory_ttl;
        is_fresh(entry.loaded_at, self.clock.now(), ttl).then(|| entry.templates.as_ref().clone())
    }

    fn put_memory(
        &self,
        domain: &CacheDomain,
        templates: Arc<Vec<Template>>,
        loaded_at: DateTime<Utc>,
    ) {
        let entry = MemoryEntry {
            owner: domain.owner().cloned(),
            templates,
            loaded_at,
        };
        self.memory.insert(domain.slot(), Arc::new(entry));
    }

    /// Decode the disk entry if present and within TTL, promoting it to memory
    async fn read_disk(&self, domain: &CacheDomain) -> Option<Vec<Template>> {
        let payload_key = domain.payload_key();

        let raw = match self.storage.get_string(&payload_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(
                    target: "workout_templates::cache",
                    key = %payload_key,
                    error = %e,
                    "Disk read failed, treating as miss"
                );
                return None;
            }
        };

        let loaded_at = match self.storage.get_long(&domain.loaded_at_key()).await {
            Ok(millis) => millis.map(from_millis),
            Err(e) => {
                warn!(
                    target: "workout_templates::cache",
                    key = %payload_key,
                    error = %e,
                    "Disk read failed, treating as miss"
                );
                return None;
            }
        };

        let policy = self.policy(domain);
        let loaded_at = match (policy.disk_ttl, loaded_at) {
            (None, stamp) => stamp.unwrap_or(DateTime::UNIX_EPOCH),
            (Some(ttl), Some(stamp)) if is_fresh(stamp, self.clock.now(), ttl) => stamp,
            (Some(_), _) => {
                debug!(target: "workout_templates::cache", key = %payload_key, "Disk entry expired");
                return None;
            }
        };

        let templates = payload::decode(&payload_key, &raw)?;
        self.put_memory(domain, Arc::new(templates.clone()), loaded_at);
        Some(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_keys() {
        assert_eq!(CacheDomain::Public.key(), "public");
        let user = CacheDomain::User(OwnerId::new("u1"));
        assert_eq!(user.key(), "user:u1");
        assert_eq!(user.payload_key(), "templates.user:u1.payload");
        assert_eq!(user.loaded_at_key(), "templates.user:u1.loaded_at");
    }
}
