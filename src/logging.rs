// ABOUTME: Tracing subscriber setup for binaries and embedding applications
// ABOUTME: EnvFilter-driven level with pretty or JSON output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};
use workout_templates_core::errors::{AppError, AppResult};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level when set.
///
/// # Errors
///
/// Returns `ConfigError` if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::config(format!("invalid log filter `{}`: {e}", config.level)))?;

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    result.map_err(|e| AppError::config(format!("failed to install tracing subscriber: {e}")))
}
