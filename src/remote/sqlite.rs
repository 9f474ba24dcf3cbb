// ABOUTME: SQLite-backed remote store for templates, exercise slots, sets and catalogs
// ABOUTME: Builds filtered queries with sqlx QueryBuilder and relies on ON DELETE CASCADE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;
use workout_templates_core::models::CatalogEntry;

use super::{
    CatalogRow, CatalogSource, Condition, ExerciseSetRow, NewExerciseSetRow,
    NewTemplateExerciseRow, NewTemplateRow, RemoteError, RemoteResult, RemoteStore, RowFilter,
    Table, TemplateExerciseRow, TemplateRow,
};

const SCHEMA: [&str; 7] = [
    r"
    CREATE TABLE IF NOT EXISTS templates (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        owner_id TEXT,
        intensity TEXT,
        sport_tags TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS template_exercises (
        id TEXT PRIMARY KEY,
        template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
        exercise_id TEXT NOT NULL,
        order_index INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS exercise_sets (
        id TEXT PRIMARY KEY,
        template_exercise_id TEXT NOT NULL REFERENCES template_exercises(id) ON DELETE CASCADE,
        set_number INTEGER NOT NULL,
        target_reps INTEGER NOT NULL,
        target_weight REAL NOT NULL,
        rest_seconds INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS exercise_catalog (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        muscle_group TEXT,
        equipment TEXT
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS exercises_legacy (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        muscle_group TEXT,
        equipment TEXT
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_template_exercises_template ON template_exercises(template_id)",
    "CREATE INDEX IF NOT EXISTS idx_exercise_sets_exercise ON exercise_sets(template_exercise_id)",
];

/// Remote store over a `SQLite` pool
#[derive(Clone)]
pub struct SqliteRemoteStore {
    pool: SqlitePool,
}

impl SqliteRemoteStore {
    /// Wrap an existing pool; call [`Self::migrate`] before first use
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect, enabling foreign keys, and create the schema
    ///
    /// In-memory URLs get a single long-lived connection so the database
    /// survives for the lifetime of the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed, the connection fails or the
    /// schema cannot be created.
    pub async fn connect(database_url: &str) -> RemoteResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RemoteError::Unavailable(format!("invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| RemoteError::Unavailable(format!("failed to connect: {e}")))?;

        let store = Self::new(pool);
        store.migrate().await?;
        info!(database_url, "Template store connected");
        Ok(store)
    }

    /// Underlying pool, shared with the key/value store in single-file setups
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if missing
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn migrate(&self) -> RemoteResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("Failed to migrate schema", &e))?;
        }
        Ok(())
    }

    /// Insert or replace a catalog entry
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert_catalog_entry(
        &self,
        source: CatalogSource,
        entry: &CatalogEntry,
    ) -> RemoteResult<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (id, name, muscle_group, equipment) VALUES ($1, $2, $3, $4)",
            source.table().name()
        );
        sqlx::query(&sql)
            .bind(&entry.id)
            .bind(&entry.name)
            .bind(&entry.muscle_group)
            .bind(&entry.equipment)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("Failed to upsert catalog entry", &e))?;
        Ok(())
    }

    async fn fetch_rows(
        &self,
        table: Table,
        columns: &str,
        filter: &RowFilter,
        order_by: Option<&str>,
    ) -> RemoteResult<Vec<SqliteRow>> {
        filter.validate_for(table)?;

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {columns} FROM {}", table.name()));
        push_filter(&mut builder, filter);
        if let Some(order_by) = order_by {
            builder.push(" ORDER BY ").push(order_by);
        }

        debug!(table = table.name(), conditions = filter.conditions().len(), "Remote select");
        builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(&format!("Failed to select from {table}"), &e))
    }

    async fn delete_rows(&self, table: Table, filter: &RowFilter) -> RemoteResult<u64> {
        filter.validate_for(table)?;
        if filter.conditions().is_empty() {
            return Err(RemoteError::Query {
                context: format!("refusing unfiltered delete on {table}"),
            });
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("DELETE FROM {}", table.name()));
        push_filter(&mut builder, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(&format!("Failed to delete from {table}"), &e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RemoteStore for SqliteRemoteStore {
    async fn select_templates(&self, filter: &RowFilter) -> RemoteResult<Vec<TemplateRow>> {
        let rows = self
            .fetch_rows(
                Table::Templates,
                "id, name, owner_id, intensity, sport_tags, created_at",
                filter,
                Some("created_at DESC, id"),
            )
            .await?;
        rows.iter().map(row_to_template).collect()
    }

    async fn select_template_exercises(
        &self,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<TemplateExerciseRow>> {
        let rows = self
            .fetch_rows(
                Table::TemplateExercises,
                "id, template_id, exercise_id, order_index",
                filter,
                None,
            )
            .await?;
        rows.iter().map(row_to_template_exercise).collect()
    }

    async fn select_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<Vec<ExerciseSetRow>> {
        let rows = self
            .fetch_rows(
                Table::ExerciseSets,
                "id, template_exercise_id, set_number, target_reps, target_weight, rest_seconds",
                filter,
                None,
            )
            .await?;
        rows.iter().map(row_to_exercise_set).collect()
    }

    async fn select_catalog(
        &self,
        source: CatalogSource,
        filter: &RowFilter,
    ) -> RemoteResult<Vec<CatalogRow>> {
        let table = source.table();
        let rows = self
            .fetch_rows(table, "id, name, muscle_group, equipment", filter, Some("id"))
            .await?;
        rows.iter().map(|row| row_to_catalog(table, row)).collect()
    }

    async fn insert_template(&self, row: &NewTemplateRow) -> RemoteResult<TemplateRow> {
        let inserted = TemplateRow {
            id: Uuid::new_v4().to_string().into(),
            name: row.name.clone(),
            owner_id: row.owner_id.clone(),
            intensity: row.intensity.clone(),
            sport_tags: row.sport_tags.clone(),
            created_at: Utc::now(),
        };
        let tags_json = serde_json::to_string(&inserted.sport_tags).map_err(|e| {
            RemoteError::Query {
                context: format!("Failed to encode sport tags: {e}"),
            }
        })?;

        sqlx::query(
            r"
            INSERT INTO templates (id, name, owner_id, intensity, sport_tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(inserted.id.as_str())
        .bind(&inserted.name)
        .bind(inserted.owner_id.as_ref().map(|o| o.as_str().to_owned()))
        .bind(&inserted.intensity)
        .bind(&tags_json)
        .bind(inserted.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("Failed to insert template", &e))?;

        Ok(inserted)
    }

    async fn insert_template_exercise(
        &self,
        row: &NewTemplateExerciseRow,
    ) -> RemoteResult<TemplateExerciseRow> {
        let inserted = TemplateExerciseRow {
            id: Uuid::new_v4().to_string().into(),
            template_id: row.template_id.clone(),
            exercise_id: row.exercise_id.clone(),
            order_index: row.order_index,
        };

        sqlx::query(
            r"
            INSERT INTO template_exercises (id, template_id, exercise_id, order_index)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(inserted.id.as_str())
        .bind(inserted.template_id.as_str())
        .bind(&inserted.exercise_id)
        .bind(inserted.order_index)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("Failed to insert template exercise", &e))?;

        Ok(inserted)
    }

    async fn insert_exercise_sets(
        &self,
        rows: &[NewExerciseSetRow],
    ) -> RemoteResult<Vec<ExerciseSetRow>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let inserted: Vec<ExerciseSetRow> = rows
            .iter()
            .map(|row| ExerciseSetRow {
                id: Uuid::new_v4().to_string(),
                template_exercise_id: row.template_exercise_id.clone(),
                set_number: row.set_number,
                target_reps: row.target_reps,
                target_weight: row.target_weight,
                rest_seconds: row.rest_seconds,
            })
            .collect();

        // Single multi-row statement: either every set lands or none does
        {
            let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
                "INSERT INTO exercise_sets (id, template_exercise_id, set_number, target_reps, target_weight, rest_seconds) ",
            );
            builder.push_values(&inserted, |mut values, set| {
                values
                    .push_bind(set.id.as_str())
                    .push_bind(set.template_exercise_id.as_str())
                    .push_bind(set.set_number)
                    .push_bind(set.target_reps)
                    .push_bind(set.target_weight)
                    .push_bind(set.rest_seconds);
            });

            builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("Failed to insert exercise sets", &e))?;
        }

        Ok(inserted)
    }

    async fn delete_templates(&self, filter: &RowFilter) -> RemoteResult<u64> {
        // Exercise slots and sets go with the template via ON DELETE CASCADE
        self.delete_rows(Table::Templates, filter).await
    }

    async fn delete_exercise_sets(&self, filter: &RowFilter) -> RemoteResult<u64> {
        self.delete_rows(Table::ExerciseSets, filter).await
    }
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a RowFilter) {
    for (idx, condition) in filter.conditions().iter().enumerate() {
        builder.push(if idx == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::Eq(column, value) => {
                builder
                    .push(column.name())
                    .push(" = ")
                    .push_bind(value.as_str());
            }
            Condition::In(_, values) if values.is_empty() => {
                builder.push("1 = 0");
            }
            Condition::In(column, values) => {
                builder.push(column.name()).push(" IN (");
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(value.as_str());
                }
                separated.push_unseparated(")");
            }
            Condition::IsNull(column) => {
                builder.push(column.name()).push(" IS NULL");
            }
        }
    }
}

fn query_error(context: &str, err: &sqlx::Error) -> RemoteError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RemoteError::Unavailable(format!("{context}: {err}"))
        }
        _ => RemoteError::Query {
            context: format!("{context}: {err}"),
        },
    }
}

fn malformed(table: Table, detail: impl Display) -> RemoteError {
    RemoteError::MalformedRow {
        table,
        detail: detail.to_string(),
    }
}

fn row_to_template(row: &SqliteRow) -> RemoteResult<TemplateRow> {
    let table = Table::Templates;
    let id: String = row.try_get("id").map_err(|e| malformed(table, e))?;
    let owner_id: Option<String> = row.try_get("owner_id").map_err(|e| malformed(table, e))?;
    let tags_json: String = row.try_get("sport_tags").map_err(|e| malformed(table, e))?;
    let created_at_str: String = row.try_get("created_at").map_err(|e| malformed(table, e))?;

    let sport_tags: Vec<String> =
        serde_json::from_str(&tags_json).map_err(|e| malformed(table, e))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| malformed(table, format!("invalid created_at: {e}")))?
        .with_timezone(&Utc);

    Ok(TemplateRow {
        id: id.into(),
        name: row.try_get("name").map_err(|e| malformed(table, e))?,
        owner_id: owner_id.map(Into::into),
        intensity: row.try_get("intensity").map_err(|e| malformed(table, e))?,
        sport_tags,
        created_at,
    })
}

fn row_to_template_exercise(row: &SqliteRow) -> RemoteResult<TemplateExerciseRow> {
    let table = Table::TemplateExercises;
    let id: String = row.try_get("id").map_err(|e| malformed(table, e))?;
    let template_id: String = row.try_get("template_id").map_err(|e| malformed(table, e))?;

    Ok(TemplateExerciseRow {
        id: id.into(),
        template_id: template_id.into(),
        exercise_id: row.try_get("exercise_id").map_err(|e| malformed(table, e))?,
        order_index: row.try_get("order_index").map_err(|e| malformed(table, e))?,
    })
}

fn row_to_exercise_set(row: &SqliteRow) -> RemoteResult<ExerciseSetRow> {
    let table = Table::ExerciseSets;
    let parent: String = row
        .try_get("template_exercise_id")
        .map_err(|e| malformed(table, e))?;

    Ok(ExerciseSetRow {
        id: row.try_get("id").map_err(|e| malformed(table, e))?,
        template_exercise_id: parent.into(),
        set_number: row.try_get("set_number").map_err(|e| malformed(table, e))?,
        target_reps: row.try_get("target_reps").map_err(|e| malformed(table, e))?,
        target_weight: row.try_get("target_weight").map_err(|e| malformed(table, e))?,
        rest_seconds: row.try_get("rest_seconds").map_err(|e| malformed(table, e))?,
    })
}

fn row_to_catalog(table: Table, row: &SqliteRow) -> RemoteResult<CatalogRow> {
    Ok(CatalogEntry {
        id: row.try_get("id").map_err(|e| malformed(table, e))?,
        name: row.try_get("name").map_err(|e| malformed(table, e))?,
        muscle_group: row.try_get("muscle_group").map_err(|e| malformed(table, e))?,
        equipment: row.try_get("equipment").map_err(|e| malformed(table, e))?,
    })
}
