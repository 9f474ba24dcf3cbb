// ABOUTME: Builds fully populated templates from the normalized remote rows
// ABOUTME: Four-query bulk path for public templates, per-template path for owners and single ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Bulk Assembler
//!
//! Template data lives in three remote tables (`templates`, `template_exercises`,
//! `exercise_sets`) plus the exercise catalog. Fetching children one template at
//! a time costs `1 + M + M*E` round trips, so the public catalog is assembled
//! with one query per table instead:
//!
//! 1. all template rows, filtered to public ones
//! 2. exercise rows with `template_id IN (..)`
//! 3. catalog metadata for exercises not already cached locally
//! 4. set rows with `template_exercise_id IN (..)`
//!
//! Steps are skipped when they have no input. Exercises whose catalog entry
//! cannot be found are dropped from their template; the template itself stays.
//!
//! The assembler only reads. It never touches the tiered cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};
use workout_templates_core::errors::{AppError, AppResult};
use workout_templates_core::models::{
    CatalogEntry, ExerciseRowId, ExerciseSet, OwnerId, Template, TemplateExercise, TemplateId,
};

use crate::catalog::ExerciseCatalog;
use crate::remote::{
    Column, ExerciseSetRow, RemoteStore, RowFilter, TemplateExerciseRow, TemplateRow,
};

/// A template whose exercise list may have failed to load
///
/// `exercises` is `None` when the child queries for this template failed.
/// Such graphs must never reach the cache or the caller; [`keep_populated`]
/// filters them out.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGraph {
    /// Template identifier
    pub id: TemplateId,
    /// Display name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Owner, `None` for public templates
    pub owner_id: Option<OwnerId>,
    /// Intensity tag
    pub intensity: Option<String>,
    /// Sport tags
    pub sport_tags: Vec<String>,
    /// Exercise list, `None` when it could not be loaded
    pub exercises: Option<Vec<TemplateExercise>>,
}

impl TemplateGraph {
    fn from_row(row: TemplateRow, exercises: Option<Vec<TemplateExercise>>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            owner_id: row.owner_id,
            intensity: row.intensity,
            sport_tags: row.sport_tags,
            exercises,
        }
    }

    /// Whether the exercise list was loaded
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.exercises.is_some()
    }

    /// Convert into a [`Template`], or `None` if the exercises never loaded
    #[must_use]
    pub fn into_template(self) -> Option<Template> {
        let exercises = self.exercises?;
        Some(Template {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            owner_id: self.owner_id,
            intensity: self.intensity,
            sport_tags: self.sport_tags,
            exercises,
        })
    }
}

/// Drop graphs whose exercises failed to load, logging each one
#[must_use]
pub fn keep_populated(graphs: Vec<TemplateGraph>) -> Vec<Template> {
    graphs
        .into_iter()
        .filter_map(|graph| {
            let id = graph.id.clone();
            let template = graph.into_template();
            if template.is_none() {
                warn!(
                    target: "workout_templates::assembler",
                    template_id = %id,
                    "Dropping template with unloaded exercises"
                );
            }
            template
        })
        .collect()
}

/// Read-only template assembly over the remote store
pub struct BulkAssembler {
    remote: Arc<dyn RemoteStore>,
    catalog: Arc<ExerciseCatalog>,
}

impl BulkAssembler {
    /// Create an assembler sharing `catalog` with other components
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, catalog: Arc<ExerciseCatalog>) -> Self {
        Self { remote, catalog }
    }

    /// Assemble every public template in at most four remote reads
    ///
    /// # Errors
    ///
    /// Returns an error if any of the remote reads fails. Nothing partial is
    /// returned in that case.
    pub async fn assemble_public(&self) -> AppResult<Vec<Template>> {
        let template_rows: Vec<TemplateRow> = self
            .remote
            .select_templates(&RowFilter::all())
            .await?
            .into_iter()
            .filter(|row| row.owner_id.is_none())
            .collect();

        if template_rows.is_empty() {
            debug!(target: "workout_templates::assembler", "No public templates");
            return Ok(Vec::new());
        }

        let template_ids = template_rows.iter().map(|row| row.id.as_str());
        let exercise_rows = self
            .remote
            .select_template_exercises(&RowFilter::all().is_in(Column::TemplateId, template_ids))
            .await?;

        let (catalog, mut sets_by_row) = if exercise_rows.is_empty() {
            (HashMap::new(), HashMap::new())
        } else {
            let catalog = self
                .catalog
                .resolve_batch(exercise_rows.iter().map(|row| row.exercise_id.as_str()))
                .await?;
            let set_rows = self.select_sets_for(&exercise_rows).await?;
            (catalog, group_sets(set_rows))
        };

        let mut exercises_by_template = group_exercises(exercise_rows);

        let templates: Vec<Template> = template_rows
            .into_iter()
            .map(|row| {
                let rows = exercises_by_template.remove(&row.id).unwrap_or_default();
                let exercises = rows
                    .into_iter()
                    .filter_map(|exercise_row| {
                        let sets = sets_by_row.remove(&exercise_row.id).unwrap_or_default();
                        let entry = catalog.get(&exercise_row.exercise_id);
                        build_exercise(&row.id, exercise_row, entry, sets)
                    })
                    .collect();
                Template {
                    id: row.id,
                    name: row.name,
                    created_at: row.created_at,
                    owner_id: row.owner_id,
                    intensity: row.intensity,
                    sport_tags: row.sport_tags,
                    exercises,
                }
            })
            .collect();

        debug!(
            target: "workout_templates::assembler",
            templates = templates.len(),
            catalog_entries = catalog.len(),
            "Assembled public templates"
        );
        Ok(templates)
    }

    /// Assemble every template belonging to `owner`
    ///
    /// Each template's children load concurrently. A template whose child
    /// queries fail comes back with `exercises: None` instead of failing the
    /// whole call; pass the result through [`keep_populated`].
    ///
    /// # Errors
    ///
    /// Returns an error if the owner's template rows cannot be selected.
    pub async fn assemble_owned(&self, owner: &OwnerId) -> AppResult<Vec<TemplateGraph>> {
        let template_rows = self
            .remote
            .select_templates(&RowFilter::all().eq(Column::OwnerId, owner.as_str()))
            .await?;

        let loads = template_rows.into_iter().map(|row| async move {
            match self.load_exercises(&row.id).await {
                Ok(exercises) => TemplateGraph::from_row(row, Some(exercises)),
                Err(e) => {
                    warn!(
                        target: "workout_templates::assembler",
                        template_id = %row.id,
                        error = %e,
                        "Failed to load template exercises"
                    );
                    TemplateGraph::from_row(row, None)
                }
            }
        });

        let graphs = join_all(loads).await;
        debug!(
            target: "workout_templates::assembler",
            owner_id = %owner,
            templates = graphs.len(),
            "Assembled owner templates"
        );
        Ok(graphs)
    }

    /// Assemble one template by id
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no such template exists, or the remote
    /// error if a query fails.
    pub async fn assemble_by_id(&self, id: &TemplateId) -> AppResult<Template> {
        let row = self
            .remote
            .select_templates(&RowFilter::all().eq(Column::Id, id.as_str()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("template {id}")))?;

        let exercises = self.load_exercises(&row.id).await?;
        TemplateGraph::from_row(row, Some(exercises))
            .into_template()
            .ok_or_else(|| AppError::internal(format!("template {id} has no exercise list")))
    }

    /// Exercises of one template, resolving metadata one exercise at a time
    ///
    /// Falls back to the legacy catalog for ids the primary catalog lacks.
    async fn load_exercises(&self, template_id: &TemplateId) -> AppResult<Vec<TemplateExercise>> {
        let mut exercise_rows = self
            .remote
            .select_template_exercises(
                &RowFilter::all().eq(Column::TemplateId, template_id.as_str()),
            )
            .await?;
        if exercise_rows.is_empty() {
            return Ok(Vec::new());
        }
        exercise_rows.sort_by_key(|row| row.order_index);

        let mut sets_by_row = group_sets(self.select_sets_for(&exercise_rows).await?);

        let mut exercises = Vec::with_capacity(exercise_rows.len());
        for exercise_row in exercise_rows {
            let entry = self.catalog.resolve_one(&exercise_row.exercise_id).await?;
            let sets = sets_by_row.remove(&exercise_row.id).unwrap_or_default();
            if let Some(exercise) = build_exercise(template_id, exercise_row, entry.as_ref(), sets) {
                exercises.push(exercise);
            }
        }
        Ok(exercises)
    }

    async fn select_sets_for(
        &self,
        exercise_rows: &[TemplateExerciseRow],
    ) -> AppResult<Vec<ExerciseSetRow>> {
        let row_ids = exercise_rows.iter().map(|row| row.id.as_str());
        Ok(self
            .remote
            .select_exercise_sets(&RowFilter::all().is_in(Column::TemplateExerciseId, row_ids))
            .await?)
    }
}

/// Group exercise rows by template, each group sorted by `order_index`
fn group_exercises(
    rows: Vec<TemplateExerciseRow>,
) -> HashMap<TemplateId, Vec<TemplateExerciseRow>> {
    let mut grouped: HashMap<TemplateId, Vec<TemplateExerciseRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.template_id.clone()).or_default().push(row);
    }
    for group in grouped.values_mut() {
        group.sort_by_key(|row| row.order_index);
    }
    grouped
}

/// Group set rows by exercise row, each group sorted by `set_number`
///
/// Rows with out-of-range values are dropped. When two rows share a set
/// number the first one returned by the store wins.
fn group_sets(rows: Vec<ExerciseSetRow>) -> HashMap<ExerciseRowId, Vec<ExerciseSet>> {
    let mut grouped: HashMap<ExerciseRowId, Vec<ExerciseSet>> = HashMap::new();
    for row in rows {
        if let Some(set) = convert_set(&row) {
            grouped.entry(row.template_exercise_id).or_default().push(set);
        }
    }
    for (row_id, sets) in &mut grouped {
        sets.sort_by_key(|set| set.set_number);
        let before = sets.len();
        sets.dedup_by_key(|set| set.set_number);
        if sets.len() != before {
            warn!(
                target: "workout_templates::assembler",
                exercise_row_id = %row_id,
                dropped = before - sets.len(),
                "Dropped sets with duplicate set numbers"
            );
        }
    }
    grouped
}

fn convert_set(row: &ExerciseSetRow) -> Option<ExerciseSet> {
    let converted = set_values(row);
    if converted.is_none() {
        warn!(
            target: "workout_templates::assembler",
            set_id = %row.id,
            set_number = row.set_number,
            "Dropping set with out-of-range values"
        );
    }
    converted
}

fn set_values(row: &ExerciseSetRow) -> Option<ExerciseSet> {
    Some(ExerciseSet {
        id: row.id.clone(),
        set_number: u32::try_from(row.set_number).ok().filter(|n| *n >= 1)?,
        target_reps: u32::try_from(row.target_reps).ok()?,
        target_weight: Some(row.target_weight).filter(|w| w.is_finite())?,
        rest_seconds: u32::try_from(row.rest_seconds).ok()?,
    })
}

fn build_exercise(
    template_id: &TemplateId,
    row: TemplateExerciseRow,
    entry: Option<&CatalogEntry>,
    sets: Vec<ExerciseSet>,
) -> Option<TemplateExercise> {
    let Some(entry) = entry else {
        warn!(
            target: "workout_templates::assembler",
            template_id = %template_id,
            exercise_id = %row.exercise_id,
            "Exercise missing from catalog, dropping it from template"
        );
        return None;
    };
    let Ok(order_index) = u32::try_from(row.order_index) else {
        warn!(
            target: "workout_templates::assembler",
            template_id = %template_id,
            exercise_row_id = %row.id,
            order_index = row.order_index,
            "Dropping exercise with negative order index"
        );
        return None;
    };
    Some(TemplateExercise {
        row_id: row.id,
        exercise_id: row.exercise_id,
        name: entry.name.clone(),
        muscle_group: entry.muscle_group.clone(),
        equipment: entry.equipment.clone(),
        order_index,
        sets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_row(id: &str, parent: &str, number: i64) -> ExerciseSetRow {
        ExerciseSetRow {
            id: id.to_owned(),
            template_exercise_id: ExerciseRowId::new(parent),
            set_number: number,
            target_reps: 8,
            target_weight: 20.0,
            rest_seconds: 60,
        }
    }

    #[test]
    fn sets_are_sorted_and_deduplicated() {
        let grouped = group_sets(vec![
            set_row("s3", "r1", 3),
            set_row("s1", "r1", 1),
            set_row("s1b", "r1", 1),
            set_row("s2", "r1", 2),
            set_row("t1", "r2", 1),
        ]);

        let r1: Vec<u32> = grouped[&ExerciseRowId::new("r1")]
            .iter()
            .map(|s| s.set_number)
            .collect();
        assert_eq!(r1, vec![1, 2, 3]);
        assert_eq!(grouped[&ExerciseRowId::new("r2")].len(), 1);
    }

    #[test]
    fn invalid_sets_are_dropped() {
        let mut negative = set_row("bad", "r1", 1);
        negative.target_reps = -4;
        let zero = set_row("zero", "r1", 0);
        let grouped = group_sets(vec![negative, zero, set_row("ok", "r1", 2)]);
        let sets = &grouped[&ExerciseRowId::new("r1")];
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].id, "ok");
    }

    #[test]
    fn unpopulated_graphs_are_filtered() {
        let row = |id: &str| TemplateRow {
            id: TemplateId::new(id),
            name: id.to_owned(),
            owner_id: Some(OwnerId::new("u1")),
            intensity: None,
            sport_tags: Vec::new(),
            created_at: Utc::now(),
        };
        let graphs = vec![
            TemplateGraph::from_row(row("a"), Some(Vec::new())),
            TemplateGraph::from_row(row("b"), None),
        ];
        let kept = keep_populated(graphs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, TemplateId::new("a"));
    }
}
