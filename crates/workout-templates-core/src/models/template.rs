// ABOUTME: Read-side template graph assembled from the remote relational rows
// ABOUTME: Template -> ordered exercises -> ordered sets, plus catalog and last-used records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ExerciseRowId, OwnerId, TemplateId};

/// A workout template with its fully assembled exercise list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template identifier
    pub id: TemplateId,
    /// Display name
    pub name: String,
    /// When the template row was created
    pub created_at: DateTime<Utc>,
    /// Owning user; `None` marks a public template
    pub owner_id: Option<OwnerId>,
    /// Intensity tag (e.g. "moderate", "high")
    pub intensity: Option<String>,
    /// Sport tags
    #[serde(default)]
    pub sport_tags: Vec<String>,
    /// Exercises sorted by `order_index`
    pub exercises: Vec<TemplateExercise>,
}

impl Template {
    /// Whether this template is shared with every user
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Total number of sets across all exercises
    #[must_use]
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// One exercise slot inside a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercise {
    /// Backing `template_exercises` row
    pub row_id: ExerciseRowId,
    /// Exercise catalog id
    pub exercise_id: String,
    /// Catalog display name
    pub name: String,
    /// Primary muscle group
    pub muscle_group: Option<String>,
    /// Equipment description
    pub equipment: Option<String>,
    /// 0-based execution order
    pub order_index: u32,
    /// Sets sorted by `set_number`
    pub sets: Vec<ExerciseSet>,
}

/// A single prescribed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    /// Set row identifier
    pub id: String,
    /// 1-based position within the exercise
    pub set_number: u32,
    /// Target repetitions
    pub target_reps: u32,
    /// Target load
    pub target_weight: f64,
    /// Rest after the set, in seconds
    pub rest_seconds: u32,
}

/// Exercise metadata from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Catalog id referenced by `template_exercises.exercise_id`
    pub id: String,
    /// Display name
    pub name: String,
    /// Primary muscle group
    pub muscle_group: Option<String>,
    /// Equipment description
    pub equipment: Option<String>,
}

/// The single persisted "resume this" snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUsedRecord {
    /// Template as it was when the session started
    pub template: Template,
    /// When the snapshot was written
    pub saved_at: DateTime<Utc>,
}
