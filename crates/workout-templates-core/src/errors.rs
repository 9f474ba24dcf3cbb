// ABOUTME: Unified error type for template loading, caching and mutation operations
// ABOUTME: Error codes classify failures so callers can tell transient from partial writes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TemplateId;

/// Standard error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Requested template, exercise row or catalog entry does not exist
    ResourceNotFound,
    /// Caller supplied a draft or argument that fails validation
    InvalidInput,
    /// Remote store rejected or failed a query
    DatabaseError,
    /// Remote store could not be reached
    RemoteUnavailable,
    /// Multi-step write stopped after some rows were already written
    PartialWrite,
    /// Environment configuration is missing or malformed
    ConfigError,
    /// Serialization or other internal failure
    InternalError,
}

impl ErrorCode {
    /// Stable snake-case identifier for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceNotFound => "resource_not_found",
            Self::InvalidInput => "invalid_input",
            Self::DatabaseError => "database_error",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::PartialWrite => "partial_write",
            Self::ConfigError => "config_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Whether retrying the same call later may succeed
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RemoteUnavailable | Self::DatabaseError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What had already been written when a multi-step create stopped
///
/// Nothing is rolled back: the template row identified here stays in the
/// remote store until the caller deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialWrite {
    /// Template row that was created before the failure
    pub template_id: TemplateId,
    /// Exercise rows inserted under that template
    pub exercises_written: usize,
    /// Set rows inserted across those exercises
    pub sets_written: usize,
}

/// Application error with a classification code
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Classification of the failure
    pub code: ErrorCode,
    /// Human readable detail
    pub message: String,
    /// Rows left behind by an interrupted create, when `code` is `PartialWrite`
    pub partial: Option<PartialWrite>,
}

/// Result alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an error with an explicit code
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            partial: None,
        }
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }

    /// Validation failure
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Remote query failure
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Remote store unreachable
    #[must_use]
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RemoteUnavailable, message)
    }

    /// Configuration failure
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal failure
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Interrupted multi-step write
    #[must_use]
    pub fn partial_write(partial: PartialWrite, cause: &Self) -> Self {
        Self {
            code: ErrorCode::PartialWrite,
            message: format!(
                "template {} left partially written ({} exercises, {} sets): {cause}",
                partial.template_id, partial.exercises_written, partial.sets_written
            ),
            partial: Some(partial),
        }
    }

    /// Template row orphaned by an interrupted create, if any
    #[must_use]
    pub const fn orphaned_template(&self) -> Option<&TemplateId> {
        match &self.partial {
            Some(partial) => Some(&partial.template_id),
            None => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {err}"))
    }
}
