// ABOUTME: Versioned JSON envelope for template lists written to the disk tier
// ABOUTME: Undecodable or foreign-version payloads read back as a miss instead of an error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use tracing::debug;
use workout_templates_core::errors::AppResult;
use workout_templates_core::models::Template;

use crate::constants::cache_keys::CACHE_SCHEMA_VERSION;

#[derive(Serialize)]
struct PayloadRef<'a> {
    schema: u32,
    templates: &'a [Template],
}

#[derive(Deserialize)]
struct PayloadOwned {
    schema: u32,
    templates: Vec<Template>,
}

/// Serialize templates into a disk payload
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(templates: &[Template]) -> AppResult<String> {
    Ok(serde_json::to_string(&PayloadRef {
        schema: CACHE_SCHEMA_VERSION,
        templates,
    })?)
}

/// Deserialize a disk payload, `None` when it is corrupt or from another schema
#[must_use]
pub fn decode(key: &str, raw: &str) -> Option<Vec<Template>> {
    match serde_json::from_str::<PayloadOwned>(raw) {
        Ok(payload) if payload.schema == CACHE_SCHEMA_VERSION => Some(payload.templates),
        Ok(payload) => {
            debug!(
                target: "workout_templates::cache",
                key,
                found = payload.schema,
                expected = CACHE_SCHEMA_VERSION,
                "Ignoring disk payload from another schema version"
            );
            None
        }
        Err(e) => {
            debug!(
                target: "workout_templates::cache",
                key,
                error = %e,
                "Ignoring undecodable disk payload"
            );
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn foreign_schema_is_a_miss() {
        let raw = format!(r#"{{"schema":{},"templates":[]}}"#, CACHE_SCHEMA_VERSION + 1);
        assert!(decode("k", &raw).is_none());
    }

    #[test]
    fn garbage_is_a_miss() {
        assert!(decode("k", "{not json").is_none());
        assert!(decode("k", r#"{"templates":[]}"#).is_none());
    }

    #[test]
    fn empty_list_survives() {
        let raw = encode(&[]).unwrap();
        assert_eq!(decode("k", &raw), Some(Vec::new()));
    }
}
