// ABOUTME: Template seeding utility loading catalog entries and programs from a JSON file
// ABOUTME: Writes catalog rows and pushes each program through the template service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Template Seeder
//!
//! Loads a seed file and syncs it to a `SQLite` template database.
//!
//! ```json
//! {
//!   "catalog": [{ "id": "squat", "name": "Back Squat", "muscle_group": "legs" }],
//!   "legacy_catalog": [],
//!   "programs": [
//!     {
//!       "name": "Strength base",
//!       "owner_id": null,
//!       "workouts": [
//!         { "name": "Day 1", "exercises": [{ "exercise_id": "squat", "sets": [{}, { "set_number": 2 }] }] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Seed from the default file
//! cargo run --bin seed-templates
//!
//! # Override database URL
//! cargo run --bin seed-templates -- --database-url sqlite:./data/templates.db
//!
//! # Verbose output
//! cargo run --bin seed-templates -- -v
//!
//! # Dry run (validate and show what would be done)
//! cargo run --bin seed-templates -- --dry-run
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use workout_templates::config::{LogFormat, LoggingConfig, TemplateStoreConfig};
use workout_templates::logging::init_logging;
use workout_templates::remote::{CatalogSource, RemoteError, SqliteRemoteStore};
use workout_templates::storage::{SqliteKeyValueStore, StorageError};
use workout_templates::TemplateService;
use workout_templates_core::errors::AppError;
use workout_templates_core::models::{CatalogEntry, NewTemplate, OwnerId};

/// CLI-specific error type for the seed binary
#[derive(Error, Debug)]
enum SeedError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Key/value store error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    App(#[from] AppError),
}

type SeedResult<T> = Result<T, SeedError>;

#[derive(Parser)]
#[command(
    name = "seed-templates",
    about = "Workout template seeder",
    long_about = "Load exercise catalog entries and template programs from a JSON file"
)]
struct SeedArgs {
    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,

    /// Path to the seed file
    #[arg(long, default_value = "seed/templates.json")]
    seed_file: PathBuf,

    /// Dry run - validate the seed file without writing
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Deserialize)]
struct SeedFile {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
    #[serde(default)]
    legacy_catalog: Vec<CatalogEntry>,
    #[serde(default)]
    programs: Vec<SeedProgram>,
}

#[derive(Deserialize)]
struct SeedProgram {
    name: String,
    #[serde(default)]
    owner_id: Option<OwnerId>,
    #[serde(default)]
    workouts: Vec<NewTemplate>,
}

/// Seeding result statistics
#[derive(Default)]
struct SeedStats {
    catalog_entries: usize,
    templates_created: usize,
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> SeedResult<()> {
    let args = SeedArgs::parse();

    let mut config = TemplateStoreConfig::from_env()?;
    if args.verbose {
        config.logging = LoggingConfig {
            level: "debug".to_owned(),
            format: LogFormat::Pretty,
        };
    }
    init_logging(&config.logging)?;

    info!("=== Workout Template Seeder ===");
    if args.dry_run {
        info!("DRY RUN - no changes will be made");
    }

    let raw = fs::read_to_string(&args.seed_file).map_err(|source| SeedError::Io {
        path: args.seed_file.clone(),
        source,
    })?;
    let seed: SeedFile = serde_json::from_str(&raw)?;
    info!(
        "Seed file: {} catalog entries, {} legacy entries, {} programs",
        seed.catalog.len(),
        seed.legacy_catalog.len(),
        seed.programs.len()
    );

    if args.dry_run {
        let stats = validate_programs(&seed.programs);
        print_summary(&stats, true);
        return Ok(());
    }

    let database_url = args.database_url.unwrap_or(config.database_url);
    info!("Connecting to database: {}", database_url);
    let remote = SqliteRemoteStore::connect(&database_url).await?;

    let mut stats = SeedStats::default();
    for (source, entries) in [
        (CatalogSource::Primary, &seed.catalog),
        (CatalogSource::Legacy, &seed.legacy_catalog),
    ] {
        for entry in entries {
            remote.upsert_catalog_entry(source, entry).await?;
            stats.catalog_entries += 1;
        }
    }
    info!("Catalog synced: {} entries", stats.catalog_entries);

    let storage = SqliteKeyValueStore::new(remote.pool().clone()).await?;
    let service = TemplateService::new(Arc::new(remote), Arc::new(storage), config.cache);

    for program in &seed.programs {
        push_program(&service, program, &mut stats).await?;
    }

    print_summary(&stats, false);
    Ok(())
}

/// Push one program and record its outcome
async fn push_program(
    service: &TemplateService,
    program: &SeedProgram,
    stats: &mut SeedStats,
) -> SeedResult<()> {
    info!("");
    info!("=== Program: {} ===", program.name);
    let report = service
        .push_program(program.owner_id.as_ref(), &program.workouts)
        .await?;

    for id in &report.created {
        info!("  + {}", id);
    }
    for failed in &report.failed {
        warn!("  ✗ {} - {}: {}", failed.name, failed.code, failed.message);
        if let Some(orphan) = &failed.orphaned_template {
            warn!("    partially written template left behind: {}", orphan);
        }
        stats
            .errors
            .push(format!("{}/{}: {}", program.name, failed.name, failed.message));
    }
    stats.templates_created += report.created.len();
    Ok(())
}

/// Validate every workout draft without touching the database
fn validate_programs(programs: &[SeedProgram]) -> SeedStats {
    let mut stats = SeedStats::default();
    for program in programs {
        for workout in &program.workouts {
            match workout.validate() {
                Ok(()) => info!("  ✓ {}/{}", program.name, workout.name),
                Err(e) => {
                    warn!("  ✗ {}/{} - {}", program.name, workout.name, e);
                    stats
                        .errors
                        .push(format!("{}/{}: {}", program.name, workout.name, e));
                }
            }
        }
    }
    stats
}

fn print_summary(stats: &SeedStats, dry_run: bool) {
    info!("");
    info!("=== Seeding Complete ===");
    info!(
        "Catalog entries: {}, templates created: {}",
        stats.catalog_entries, stats.templates_created
    );
    if !stats.errors.is_empty() {
        warn!("Errors: {}", stats.errors.len());
        for error in &stats.errors {
            warn!("  - {}", error);
        }
    }
    if dry_run {
        info!("DRY RUN complete - no changes were made");
    }
}
