// ABOUTME: Application constants for cache keys, default TTLs and environment variable names
// ABOUTME: Keeps persisted key layout and freshness defaults in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Persisted key layout
pub mod cache_keys {
    /// Version tag written into every disk payload envelope
    pub const CACHE_SCHEMA_VERSION: u32 = 1;
    /// Prefix shared by every template-list cache key
    pub const TEMPLATES_PREFIX: &str = "templates";
    /// Suffix for the serialized payload of a domain
    pub const PAYLOAD_SUFFIX: &str = "payload";
    /// Suffix for the loaded-at timestamp of a domain
    pub const LOADED_AT_SUFFIX: &str = "loaded_at";
    /// Key of the last-used template snapshot
    pub const LAST_USED_PAYLOAD: &str = "last_used_template.payload";
    /// Key of the last-used template timestamp
    pub const LAST_USED_SAVED_AT: &str = "last_used_template.saved_at";
}

/// Freshness defaults
pub mod cache_ttl {
    /// Memory tier lifetime for both domains
    pub const MEMORY_TTL_SECS: u64 = 5 * 60;
    /// Disk tier lifetime for public templates
    pub const PUBLIC_DISK_TTL_SECS: u64 = 24 * 60 * 60;
}

/// Environment variables read by `TemplateStoreConfig::from_env`
pub mod env_config {
    /// Database URL for the bundled `SQLite` stores
    pub const DATABASE_URL: &str = "TEMPLATES_DATABASE_URL";
    /// Public memory TTL in seconds
    pub const PUBLIC_MEMORY_TTL_SECS: &str = "TEMPLATES_PUBLIC_MEMORY_TTL_SECS";
    /// Public disk TTL in seconds; 0 disables the TTL
    pub const PUBLIC_DISK_TTL_SECS: &str = "TEMPLATES_PUBLIC_DISK_TTL_SECS";
    /// User memory TTL in seconds
    pub const USER_MEMORY_TTL_SECS: &str = "TEMPLATES_USER_MEMORY_TTL_SECS";
    /// Whether a user disk hit schedules a background refresh
    pub const USER_BACKGROUND_REFRESH: &str = "TEMPLATES_USER_BACKGROUND_REFRESH";
    /// Log filter directive
    pub const LOG_LEVEL: &str = "TEMPLATES_LOG_LEVEL";
    /// `pretty` or `json`
    pub const LOG_FORMAT: &str = "TEMPLATES_LOG_FORMAT";
    /// Default database URL
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/templates.db";
}
