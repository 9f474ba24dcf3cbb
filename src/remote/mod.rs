// ABOUTME: Narrow query contract over the remote relational template store
// ABOUTME: Row-filtered selects, insert-with-return and filtered deletes on four tables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Remote Store
//!
//! The data-access layer only depends on the [`RemoteStore`] trait. Filters are
//! conjunctions of simple conditions over a closed [`Column`] set, which is all a
//! REST-style relational backend needs to expose. [`sqlite::SqliteRemoteStore`]
//! is the bundled implementation.

/// `SQLite` implementation with referential cascade
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use workout_templates_core::errors::AppError;
use workout_templates_core::models::{CatalogEntry, ExerciseRowId, OwnerId, TemplateId};

pub use sqlite::SqliteRemoteStore;

/// Errors returned by a remote store
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Store could not be reached
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Query was rejected or failed
    #[error("remote query failed: {context}")]
    Query {
        /// What was being done
        context: String,
    },

    /// A filter referenced a column the table does not have
    #[error("column `{column}` is not filterable on `{table}`")]
    InvalidFilter {
        /// Table queried
        table: Table,
        /// Offending column
        column: Column,
    },

    /// A returned row could not be decoded
    #[error("malformed `{table}` row: {detail}")]
    MalformedRow {
        /// Table queried
        table: Table,
        /// Decoding problem
        detail: String,
    },
}

/// Result alias for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(_) => Self::remote_unavailable(err.to_string()),
            RemoteError::Query { .. } | RemoteError::MalformedRow { .. } => {
                Self::database(err.to_string())
            }
            RemoteError::InvalidFilter { .. } => Self::internal(err.to_string()),
        }
    }
}

/// Tables and views the layer reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Template header rows
    Templates,
    /// Exercise slots belonging to templates
    TemplateExercises,
    /// Sets belonging to exercise slots
    ExerciseSets,
    /// Current exercise catalog
    ExerciseCatalog,
    /// Catalog as it was before the catalog migration
    LegacyExerciseCatalog,
}

impl Table {
    /// Physical table name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Templates => "templates",
            Self::TemplateExercises => "template_exercises",
            Self::ExerciseSets => "exercise_sets",
            Self::ExerciseCatalog => "exercise_catalog",
            Self::LegacyExerciseCatalog => "exercises_legacy",
        }
    }

    /// Whether `column` may appear in a filter on this table
    #[must_use]
    pub const fn has_column(self, column: Column) -> bool {
        match self {
            Self::Templates => matches!(column, Column::Id | Column::OwnerId),
            Self::TemplateExercises => {
                matches!(column, Column::Id | Column::TemplateId | Column::ExerciseId)
            }
            Self::ExerciseSets => matches!(column, Column::Id | Column::TemplateExerciseId),
            Self::ExerciseCatalog | Self::LegacyExerciseCatalog => matches!(column, Column::Id),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filterable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Primary key of any table
    Id,
    /// `templates.owner_id`
    OwnerId,
    /// `template_exercises.template_id`
    TemplateId,
    /// `template_exercises.exercise_id`
    ExerciseId,
    /// `exercise_sets.template_exercise_id`
    TemplateExerciseId,
}

impl Column {
    /// Physical column name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::OwnerId => "owner_id",
            Self::TemplateId => "template_id",
            Self::ExerciseId => "exercise_id",
            Self::TemplateExerciseId => "template_exercise_id",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One filter condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `column = value`
    Eq(Column, String),
    /// `column IN (values)`; an empty list matches nothing
    In(Column, Vec<String>),
    /// `column IS NULL`
    IsNull(Column),
}

impl Condition {
    /// Column the condition applies to
    #[must_use]
    pub const fn column(&self) -> Column {
        match self {
            Self::Eq(column, _) | Self::In(column, _) | Self::IsNull(column) => *column,
        }
    }
}

/// Conjunction of conditions; no conditions selects every row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    conditions: Vec<Condition>,
}

impl RowFilter {
    /// Match every row
    #[must_use]
    pub const fn all() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Add `column = value`
    #[must_use]
    pub fn eq(mut self, column: Column, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    /// Add `column IN (values)`
    #[must_use]
    pub fn is_in<I, S>(mut self, column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.push(Condition::In(
            column,
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add `column IS NULL`
    #[must_use]
    pub fn is_null(mut self, column: Column) -> Self {
        self.conditions.push(Condition::IsNull(column));
        self
    }

    /// Conditions in insertion order
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Check every condition references a column of `table`
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` for the first foreign column.
    pub fn validate_for(&self, table: Table) -> RemoteResult<()> {
        match self
            .conditions
            .iter()
            .map(Condition::column)
            .find(|column| !table.has_column(*column))
        {
            Some(column) => Err(RemoteError::InvalidFilter { table, column }),
            None => Ok(()),
        }
    }
}

/// Which catalog to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Current catalog
    Primary,
    /// Pre-migration catalog view
    Legacy,
}

impl CatalogSource {
    /// Backing table
    #[must_use]
    pub const fn table(self) -> Table {
        match self {
            Self::Primary => Table::ExerciseCatalog,
            Self::Legacy => Table::LegacyExerciseCatalog,
        }
    }
}

/// Row of `templates`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRow {
    /// Primary key
    pub id: TemplateId,
    /// Display name
    pub name: String,
    /// Owner, `None` for public templates
    pub owner_id: Option<OwnerId>,
    /// Intensity tag
    pub intensity: Option<String>,
    /// Sport tags
    pub sport_tags: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Row of `template_exercises`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExerciseRow {
    /// Primary key
    pub id: ExerciseRowId,
    /// Parent template
    pub template_id: TemplateId,
    /// Catalog id
    pub exercise_id: String,
    /// 0-based execution order
    pub order_index: i64,
}

/// Row of `exercise_sets`
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSetRow {
    /// Primary key
    pub id: String,
    /// Parent exercise slot
    pub template_exercise_id: ExerciseRowId,
    /// 1-based position
    pub set_number: i64,
    /// Target repetitions
    pub target_reps: i64,
    /// Target load
    pub target_weight: f64,
    /// Rest in seconds
    pub rest_seconds: i64,
}

/// Row of either catalog table
pub type CatalogRow = CatalogEntry;

/// Insert payload for `templates`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplateRow {
    /// Display name
    pub name: String,
    /// Owner, `None` for public templates
    pub owner_id: Option<OwnerId>,
    /// Intensity tag
    pub intensity: Option<String>,
    /// Sport tags
    pub sport_tags: Vec<String>,
}

/// Insert payload for `template_exercises`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplateExerciseRow {
    /// Parent template
    pub template_id: TemplateId,
    /// Catalog id
    pub exercise_id: String,
    /// 0-based execution order
    pub order_index: i64,
}

/// Insert payload for `exercise_sets`
#[derive(Debug, Clone, PartialEq)]
pub struct NewExerciseSetRow {
    /// Parent exercise slot
    pub template_exercise_id: ExerciseRowId,
    /// 1-based position
    pub set_number: i64,
    /// Target repetitions
    pub target_reps: i64,
    /// Target load
    pub target_weight: f64,
    /// Rest in seconds
    pub rest_seconds: i64,
}

/// Query interface of the remote relational store
///
/// Deleting a template row must cascade to its exercise and set rows; the
/// data-access layer never deletes children itself.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Select template rows
    async fn select_templates(&self, filter: &RowFilter) -> RemoteResult<Vec<TemplateRow>>;

    /// Select exercise slot rows
    async fn select_template_exercises(
        &self,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<TemplateExerciseRow>>;

    /// Select set rows
    async fn select_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<Vec<ExerciseSetRow>>;

    /// Select catalog rows from the given catalog
    async fn select_catalog(
        &self,
        source: CatalogSource,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<CatalogRow>>;

    /// Insert a template row and return it with its generated id
    async fn insert_template(&self, row: &NewTemplateRow) -> RemoteResult<TemplateRow>;

    /// Insert an exercise slot row and return it with its generated id
    async fn insert_template_exercise(
        &self,
        row: &NewTemplateExerciseRow,
    ) -> RemoteResult<TemplateExerciseRow>;

    /// Insert set rows and return them with their generated ids
    async fn insert_exercise_sets(
        &self,
        rows: &[NewExerciseSetRow],
    ) -> RemoteResult<Vec<ExerciseSetRow>>;

    /// Delete template rows; returns the number removed
    async fn delete_templates(&self, filter: &RowFilter) -> RemoteResult<u64>;

    /// Delete set rows; returns the number removed
    async fn delete_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<u64>;
}
