// ABOUTME: Single persisted "resume this" template snapshot, independent of the tier cache
// ABOUTME: Reads never touch the network; storage failures degrade to a skipped save or absence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tracing::{debug, warn};
use workout_templates_core::models::{LastUsedRecord, Template};

use crate::clock::{from_millis, Clock};
use crate::constants::cache_keys::{LAST_USED_PAYLOAD, LAST_USED_SAVED_AT};
use crate::storage::KeyValueStore;

/// Remembers the most recently started template
///
/// There is one slot. Saving overwrites it, clearing empties it, and nothing
/// expires it.
pub struct LastUsedTracker {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl LastUsedTracker {
    /// Create a tracker over `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Overwrite the slot with `template`
    pub async fn save(&self, template: &Template) {
        let payload = match serde_json::to_string(template) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: "workout_templates::last_used", error = %e, "Last used template not saved");
                return;
            }
        };
        let saved_at = self.clock.now();

        let written = async {
            self.storage.put_string(LAST_USED_PAYLOAD, &payload).await?;
            self.storage
                .put_long(LAST_USED_SAVED_AT, saved_at.timestamp_millis())
                .await
        }
        .await;

        match written {
            Ok(()) => debug!(
                target: "workout_templates::last_used",
                template_id = %template.id,
                "Last used template saved"
            ),
            Err(e) => warn!(
                target: "workout_templates::last_used",
                template_id = %template.id,
                error = %e,
                "Last used template not saved"
            ),
        }
    }

    /// Read the slot; `None` when empty, unreadable or undecodable
    pub async fn get(&self) -> Option<LastUsedRecord> {
        let raw = match self.storage.get_string(LAST_USED_PAYLOAD).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(target: "workout_templates::last_used", error = %e, "Last used template unreadable");
                return None;
            }
        };

        let template: Template = match serde_json::from_str(&raw) {
            Ok(template) => template,
            Err(e) => {
                debug!(target: "workout_templates::last_used", error = %e, "Ignoring undecodable last used template");
                return None;
            }
        };

        let saved_at = match self.storage.get_long(LAST_USED_SAVED_AT).await {
            Ok(millis) => millis.map_or(template.created_at, from_millis),
            Err(e) => {
                warn!(target: "workout_templates::last_used", error = %e, "Last used timestamp unreadable");
                template.created_at
            }
        };

        Some(LastUsedRecord { template, saved_at })
    }

    /// Empty the slot
    pub async fn clear(&self) {
        for key in [LAST_USED_PAYLOAD, LAST_USED_SAVED_AT] {
            if let Err(e) = self.storage.remove(key).await {
                warn!(target: "workout_templates::last_used", key, error = %e, "Failed to clear last used template");
            }
        }
    }
}
