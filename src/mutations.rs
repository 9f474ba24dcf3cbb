// ABOUTME: Ordered multi-table writes for templates with cache invalidation afterwards
// ABOUTME: Create, delete, delete-then-recreate update, set replacement and program pushes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Mutation Coordinator
//!
//! The remote store has no multi-table transactions, so a create is a
//! sequence of inserts: template row, then each exercise row in `order_index`
//! order followed by its sets. A failure after the template row exists is
//! reported as `ErrorCode::PartialWrite` carrying the orphaned template id.
//! Nothing is rolled back.
//!
//! Every mutation that changed remote state invalidates the memory tier of
//! the affected domain: the owner's user domain, or the public domain for
//! ownerless templates. This includes partial writes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use workout_templates_core::errors::{AppError, AppResult, PartialWrite};
use workout_templates_core::models::{
    ExerciseRowId, NewExerciseSet, NewTemplate, OwnerId, TemplateId,
};

use crate::cache::{CacheDomain, TierCache};
use crate::remote::{
    Column, NewExerciseSetRow, NewTemplateExerciseRow, NewTemplateRow, RemoteStore, RowFilter,
};

/// A program template that could not be created
#[derive(Debug, Clone, Serialize)]
pub struct FailedTemplate {
    /// Draft name
    pub name: String,
    /// Error code name
    pub code: &'static str,
    /// Failure detail
    pub message: String,
    /// Template row left behind, for partial writes
    pub orphaned_template: Option<TemplateId>,
}

impl FailedTemplate {
    fn from_error(name: &str, error: &AppError) -> Self {
        Self {
            name: name.to_owned(),
            code: error.code.as_str(),
            message: error.message.clone(),
            orphaned_template: error.orphaned_template().cloned(),
        }
    }
}

/// Outcome of pushing several templates as one program
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramPushReport {
    /// Templates created, in draft order
    pub created: Vec<TemplateId>,
    /// Drafts that failed, in draft order
    pub failed: Vec<FailedTemplate>,
}

impl ProgramPushReport {
    /// Whether every draft was created
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn wrote_anything(&self) -> bool {
        !self.created.is_empty() || self.failed.iter().any(|f| f.orphaned_template.is_some())
    }
}

/// Template writes against the remote store
pub struct MutationCoordinator {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<TierCache>,
}

impl MutationCoordinator {
    /// Create a coordinator invalidating `cache` after writes
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<TierCache>) -> Self {
        Self { remote, cache }
    }

    /// Create a template from `draft`, owned by `owner` or public when `None`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` before any write if the draft is invalid, the
    /// remote error if the template row insert fails, or `PartialWrite` if a
    /// later insert fails.
    pub async fn create(
        &self,
        draft: &NewTemplate,
        owner: Option<&OwnerId>,
    ) -> AppResult<TemplateId> {
        draft.validate()?;
        let result = self.insert_graph(draft, owner).await;
        let wrote = match &result {
            Ok(_) => true,
            Err(e) => e.partial.is_some(),
        };
        if wrote {
            self.invalidate_for(owner);
        }
        result
    }

    /// Delete a template owned by `owner` (public when `None`)
    ///
    /// Exercise and set rows go with it through the store's cascade.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the delete fails.
    pub async fn delete(&self, id: &TemplateId, owner: Option<&OwnerId>) -> AppResult<bool> {
        let removed = self.delete_row(id, owner).await?;
        if removed {
            self.invalidate_for(owner);
        }
        Ok(removed)
    }

    /// Replace a template by deleting it and creating `draft` in its place
    ///
    /// The returned id differs from `id`. Readers may briefly see neither.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the draft is invalid, `ResourceNotFound` if
    /// nothing was deleted, or any error from the recreate.
    pub async fn update(
        &self,
        id: &TemplateId,
        draft: &NewTemplate,
        owner: Option<&OwnerId>,
    ) -> AppResult<TemplateId> {
        draft.validate()?;

        if !self.delete_row(id, owner).await? {
            return Err(AppError::not_found(format!("template {id}")));
        }

        match self.insert_graph(draft, owner).await {
            Ok(new_id) => {
                self.invalidate_for(owner);
                info!(
                    target: "workout_templates::mutations",
                    old_id = %id,
                    new_id = %new_id,
                    "Template replaced"
                );
                Ok(new_id)
            }
            Err(e) => {
                // The old row is already gone, so the cached list is wrong either way.
                self.invalidate_for(owner);
                warn!(
                    target: "workout_templates::mutations",
                    old_id = %id,
                    error = %e,
                    "Template deleted but recreate failed"
                );
                Err(e)
            }
        }
    }

    /// Replace every set of one exercise row with `sets`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an invalid set list, `ResourceNotFound` for
    /// an unknown row, or the remote error.
    pub async fn replace_sets(
        &self,
        row_id: &ExerciseRowId,
        sets: &[NewExerciseSet],
    ) -> AppResult<()> {
        NewExerciseSet::validate_list(sets)?;

        let exercise_row = self
            .remote
            .select_template_exercises(&RowFilter::all().eq(Column::Id, row_id.as_str()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("exercise row {row_id}")))?;

        let template_filter = RowFilter::all().eq(Column::Id, exercise_row.template_id.as_str());
        let template = self
            .remote
            .select_templates(&template_filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("template {}", exercise_row.template_id)))?;

        let removed = self
            .remote
            .delete_exercise_sets(&RowFilter::all().eq(Column::TemplateExerciseId, row_id.as_str()))
            .await?;

        let inserted = if sets.is_empty() {
            Ok(Vec::new())
        } else {
            self.remote.insert_exercise_sets(&set_rows(row_id, sets)).await
        };
        // The old sets are gone even if the insert failed.
        self.invalidate_for(template.owner_id.as_ref());
        let inserted = inserted?.len();

        info!(
            target: "workout_templates::mutations",
            exercise_row_id = %row_id,
            template_id = %template.id,
            removed,
            inserted,
            "Exercise sets replaced"
        );
        Ok(())
    }

    /// Create several templates for `owner`, collecting failures instead of stopping
    ///
    /// # Errors
    ///
    /// Only individual drafts fail; their errors are in the report.
    pub async fn push_program(
        &self,
        owner: Option<&OwnerId>,
        drafts: &[NewTemplate],
    ) -> AppResult<ProgramPushReport> {
        let mut report = ProgramPushReport::default();

        for draft in drafts {
            let result = match draft.validate() {
                Ok(()) => self.insert_graph(draft, owner).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(id) => report.created.push(id),
                Err(e) => {
                    warn!(
                        target: "workout_templates::mutations",
                        name = %draft.name,
                        error = %e,
                        "Program template failed"
                    );
                    report.failed.push(FailedTemplate::from_error(&draft.name, &e));
                }
            }
        }

        if report.wrote_anything() {
            self.invalidate_for(owner);
        }
        info!(
            target: "workout_templates::mutations",
            created = report.created.len(),
            failed = report.failed.len(),
            "Program pushed"
        );
        Ok(report)
    }

    /// Delete every template belonging to `owner`
    ///
    /// # Errors
    ///
    /// Returns the remote error if the delete fails.
    pub async fn delete_owner_templates(&self, owner: &OwnerId) -> AppResult<u64> {
        let removed = self
            .remote
            .delete_templates(&RowFilter::all().eq(Column::OwnerId, owner.as_str()))
            .await?;
        if removed > 0 {
            self.invalidate_for(Some(owner));
        }
        info!(
            target: "workout_templates::mutations",
            owner_id = %owner,
            removed,
            "Owner templates deleted"
        );
        Ok(removed)
    }

    async fn delete_row(&self, id: &TemplateId, owner: Option<&OwnerId>) -> AppResult<bool> {
        let filter = RowFilter::all().eq(Column::Id, id.as_str());
        let filter = match owner {
            Some(owner) => filter.eq(Column::OwnerId, owner.as_str()),
            None => filter.is_null(Column::OwnerId),
        };
        let removed = self.remote.delete_templates(&filter).await?;
        debug!(
            target: "workout_templates::mutations",
            template_id = %id,
            removed,
            "Template delete"
        );
        Ok(removed > 0)
    }

    /// Insert the template row and its children; no validation, no invalidation
    async fn insert_graph(
        &self,
        draft: &NewTemplate,
        owner: Option<&OwnerId>,
    ) -> AppResult<TemplateId> {
        let template = self
            .remote
            .insert_template(&NewTemplateRow {
                name: draft.name.trim().to_owned(),
                owner_id: owner.cloned(),
                intensity: draft.intensity.clone(),
                sport_tags: draft.sport_tags.clone(),
            })
            .await?;

        let mut progress = PartialWrite {
            template_id: template.id.clone(),
            exercises_written: 0,
            sets_written: 0,
        };

        for exercise in draft.ordered_exercises() {
            let row = self
                .remote
                .insert_template_exercise(&NewTemplateExerciseRow {
                    template_id: template.id.clone(),
                    exercise_id: exercise.exercise_id.clone(),
                    order_index: i64::from(exercise.order_index),
                })
                .await
                .map_err(|e| AppError::partial_write(progress.clone(), &AppError::from(e)))?;
            progress.exercises_written += 1;

            if exercise.sets.is_empty() {
                continue;
            }
            let written = self
                .remote
                .insert_exercise_sets(&set_rows(&row.id, &exercise.sets))
                .await
                .map_err(|e| AppError::partial_write(progress.clone(), &AppError::from(e)))?;
            progress.sets_written += written.len();
        }

        info!(
            target: "workout_templates::mutations",
            template_id = %template.id,
            owner_id = ?owner,
            exercises = progress.exercises_written,
            sets = progress.sets_written,
            "Template created"
        );
        Ok(template.id)
    }

    fn invalidate_for(&self, owner: Option<&OwnerId>) {
        let domain = owner.map_or(CacheDomain::Public, |owner| CacheDomain::User(owner.clone()));
        self.cache.invalidate(&domain);
    }
}

fn set_rows(row_id: &ExerciseRowId, sets: &[NewExerciseSet]) -> Vec<NewExerciseSetRow> {
    let mut rows: Vec<NewExerciseSetRow> = sets
        .iter()
        .map(|set| NewExerciseSetRow {
            template_exercise_id: row_id.clone(),
            set_number: i64::from(set.set_number),
            target_reps: i64::from(set.target_reps),
            target_weight: set.target_weight,
            rest_seconds: i64::from(set.rest_seconds),
        })
        .collect();
    rows.sort_by_key(|row| row.set_number);
    rows
}
