// ABOUTME: Environment-driven configuration for cache policies, storage location and logging
// ABOUTME: Per-domain cache policy is data so public and user domains differ without branches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Configuration
//!
//! Environment-only configuration. Every variable is optional; unset variables
//! fall back to the defaults in [`crate::constants`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use workout_templates_core::errors::{AppError, AppResult};

use crate::constants::{cache_ttl, env_config};

/// Freshness policy of one cache domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainCachePolicy {
    /// How long a memory entry is served without I/O
    pub memory_ttl: Duration,
    /// How long a disk entry is trusted; `None` means presence is enough
    pub disk_ttl: Option<Duration>,
    /// Reload from the remote store in the background after serving a disk hit
    pub refresh_after_disk_hit: bool,
}

impl DomainCachePolicy {
    /// Public templates: TTL on both tiers
    #[must_use]
    pub const fn public_default() -> Self {
        Self {
            memory_ttl: Duration::from_secs(cache_ttl::MEMORY_TTL_SECS),
            disk_ttl: Some(Duration::from_secs(cache_ttl::PUBLIC_DISK_TTL_SECS)),
            refresh_after_disk_hit: false,
        }
    }

    /// User templates: TTL on memory only, disk is a first-frame snapshot
    #[must_use]
    pub const fn user_default() -> Self {
        Self {
            memory_ttl: Duration::from_secs(cache_ttl::MEMORY_TTL_SECS),
            disk_ttl: None,
            refresh_after_disk_hit: true,
        }
    }
}

/// Cache policies for both domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Policy for ownerless templates
    pub public: DomainCachePolicy,
    /// Policy for per-owner templates
    pub user: DomainCachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            public: DomainCachePolicy::public_default(),
            user: DomainCachePolicy::user_default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(AppError::config(format!("unknown log format `{other}`"))),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `workout_templates=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStoreConfig {
    /// URL of the bundled `SQLite` stores
    pub database_url: String,
    /// Cache policies
    pub cache: CacheConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for TemplateStoreConfig {
    fn default() -> Self {
        Self {
            database_url: env_config::DEFAULT_DATABASE_URL.to_owned(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TemplateStoreConfig {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let defaults = CacheConfig::default();

        let public_disk_ttl = match env_secs(env_config::PUBLIC_DISK_TTL_SECS)? {
            Some(ttl) if ttl.is_zero() => None,
            Some(ttl) => Some(ttl),
            None => defaults.public.disk_ttl,
        };

        let cache = CacheConfig {
            public: DomainCachePolicy {
                memory_ttl: env_secs(env_config::PUBLIC_MEMORY_TTL_SECS)?
                    .unwrap_or(defaults.public.memory_ttl),
                disk_ttl: public_disk_ttl,
                refresh_after_disk_hit: defaults.public.refresh_after_disk_hit,
            },
            user: DomainCachePolicy {
                memory_ttl: env_secs(env_config::USER_MEMORY_TTL_SECS)?
                    .unwrap_or(defaults.user.memory_ttl),
                disk_ttl: defaults.user.disk_ttl,
                refresh_after_disk_hit: env_bool(env_config::USER_BACKGROUND_REFRESH)?
                    .unwrap_or(defaults.user.refresh_after_disk_hit),
            },
        };

        let logging = LoggingConfig {
            level: env::var(env_config::LOG_LEVEL).unwrap_or_else(|_| "info".to_owned()),
            format: env::var(env_config::LOG_FORMAT)
                .ok()
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            database_url: env::var(env_config::DATABASE_URL)
                .unwrap_or_else(|_| env_config::DEFAULT_DATABASE_URL.to_owned()),
            cache,
            logging,
        })
    }
}

fn env_secs(name: &str) -> AppResult<Option<Duration>> {
    env::var(name).ok().map_or(Ok(None), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| AppError::config(format!("{name} must be whole seconds: {e}")))
    })
}

fn env_bool(name: &str) -> AppResult<Option<bool>> {
    env::var(name)
        .ok()
        .map_or(Ok(None), |raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(AppError::config(format!("{name} must be a boolean, got `{other}`"))),
        })
}
