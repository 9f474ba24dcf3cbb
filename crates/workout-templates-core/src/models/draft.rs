// ABOUTME: Write-side drafts used to create or recreate templates
// ABOUTME: Validation runs before any remote write so invalid drafts never leave orphans
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Default repetitions for a set with no explicit target
pub const DEFAULT_TARGET_REPS: u32 = 10;
/// Default rest between sets, in seconds
pub const DEFAULT_REST_SECONDS: u32 = 90;

/// A template to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    /// Display name
    pub name: String,
    /// Intensity tag
    #[serde(default)]
    pub intensity: Option<String>,
    /// Sport tags
    #[serde(default)]
    pub sport_tags: Vec<String>,
    /// Exercises; written in `order_index` order
    #[serde(default)]
    pub exercises: Vec<NewTemplateExercise>,
}

/// An exercise slot to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplateExercise {
    /// Catalog id
    pub exercise_id: String,
    /// 0-based execution order
    #[serde(default)]
    pub order_index: u32,
    /// Sets to attach
    #[serde(default)]
    pub sets: Vec<NewExerciseSet>,
}

/// A set to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewExerciseSet {
    /// 1-based position
    pub set_number: u32,
    /// Target repetitions
    pub target_reps: u32,
    /// Target load
    pub target_weight: f64,
    /// Rest after the set, in seconds
    pub rest_seconds: u32,
}

impl Default for NewExerciseSet {
    fn default() -> Self {
        Self {
            set_number: 1,
            target_reps: DEFAULT_TARGET_REPS,
            target_weight: 0.0,
            rest_seconds: DEFAULT_REST_SECONDS,
        }
    }
}

impl NewExerciseSet {
    /// Validate a whole-replacement set list for one exercise
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a set number is zero or repeated, or a weight
    /// is negative or not finite.
    pub fn validate_list(sets: &[Self]) -> AppResult<()> {
        let mut seen = HashSet::with_capacity(sets.len());
        for set in sets {
            if set.set_number == 0 {
                return Err(AppError::invalid_input("set numbers start at 1"));
            }
            if !seen.insert(set.set_number) {
                return Err(AppError::invalid_input(format!(
                    "duplicate set number {}",
                    set.set_number
                )));
            }
            if !set.target_weight.is_finite() || set.target_weight < 0.0 {
                return Err(AppError::invalid_input(format!(
                    "set {} has invalid target weight {}",
                    set.set_number, set.target_weight
                )));
            }
        }
        Ok(())
    }
}

impl NewTemplate {
    /// Create an empty draft with the given name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intensity: None,
            sport_tags: Vec::new(),
            exercises: Vec::new(),
        }
    }

    /// Append an exercise slot
    #[must_use]
    pub fn with_exercise(mut self, exercise: NewTemplateExercise) -> Self {
        self.exercises.push(exercise);
        self
    }

    /// Validate the whole draft
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on a blank name, blank exercise id, repeated
    /// order index, or any invalid set list.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_input("template name must not be blank"));
        }

        let mut orders = HashSet::with_capacity(self.exercises.len());
        for exercise in &self.exercises {
            if exercise.exercise_id.trim().is_empty() {
                return Err(AppError::invalid_input("exercise id must not be blank"));
            }
            if !orders.insert(exercise.order_index) {
                return Err(AppError::invalid_input(format!(
                    "duplicate order index {}",
                    exercise.order_index
                )));
            }
            NewExerciseSet::validate_list(&exercise.sets)?;
        }
        Ok(())
    }

    /// Exercises sorted by execution order
    #[must_use]
    pub fn ordered_exercises(&self) -> Vec<&NewTemplateExercise> {
        let mut ordered: Vec<&NewTemplateExercise> = self.exercises.iter().collect();
        ordered.sort_by_key(|e| e.order_index);
        ordered
    }
}

impl NewTemplateExercise {
    /// Create an exercise slot with no sets
    #[must_use]
    pub fn new(exercise_id: impl Into<String>, order_index: u32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            order_index,
            sets: Vec::new(),
        }
    }

    /// Append a set
    #[must_use]
    pub fn with_set(mut self, set: NewExerciseSet) -> Self {
        self.sets.push(set);
        self
    }
}
