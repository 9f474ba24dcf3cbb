// ABOUTME: Domain models for workout templates, their exercises and sets
// ABOUTME: Re-exports identifiers, the read-side graph and write-side drafts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

mod draft;
mod ids;
mod template;

pub use draft::{
    NewExerciseSet, NewTemplate, NewTemplateExercise, DEFAULT_REST_SECONDS, DEFAULT_TARGET_REPS,
};
pub use ids::{ExerciseRowId, OwnerId, TemplateId};
pub use template::{CatalogEntry, ExerciseSet, LastUsedRecord, Template, TemplateExercise};
