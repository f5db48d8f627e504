// ABOUTME: Persistence gateway for workouts, exercises and sets on SQLite
// ABOUTME: Owns the connection pool, schema migration, and bounded-wait/bounded-timeout transactions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! [`Database`] hands out transactions with two bounds taken from
//! [`TransactionLimits`]: [`Database::begin`] gives up after `max_wait`, and
//! [`Database::within_timeout`] abandons (and thereby rolls back) a transaction
//! body that runs past `timeout`. Both surface as `TRANSACTION_TIMEOUT`.

/// Scoped existence probes
pub mod existence;
/// Bounded batch deletion of child collections
pub mod purge;
/// RAII transaction guard
pub mod transactions;
/// Row-level statements for the workout tree
pub mod workouts;

use crate::config::database::DatabaseUrl;
use crate::config::environment::{DatabaseConfig, TransactionLimits};
use crate::errors::{AppError, AppResult};
use crate::models::{Workout, WorkoutSummary};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub use transactions::SqliteTransactionGuard;

/// Database manager for the workout tree
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    limits: TransactionLimits,
}

impl Database {
    /// Connect, create the schema if needed, and return the gateway
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn new(config: &DatabaseConfig, limits: TransactionLimits) -> AppResult<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url.to_connection_string())?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(limits.max_wait);

        // Every in-memory connection is its own database, so keep exactly one alive
        let pool_options = if config.url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(limits.max_wait)
            .connect_with(connect_options)
            .await?;

        let db = Self { pool, limits };
        db.migrate().await?;

        info!(database.url = %config.url, "Database ready");
        Ok(db)
    }

    /// In-memory database with default bounds
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn in_memory(limits: TransactionLimits) -> AppResult<Self> {
        let config = DatabaseConfig {
            url: DatabaseUrl::Memory,
            ..DatabaseConfig::default()
        };
        Self::new(&config, limits).await
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction, waiting at most `max_wait` for it
    ///
    /// # Errors
    ///
    /// Returns `TRANSACTION_TIMEOUT` if no connection became available in time
    pub async fn begin(&self) -> AppResult<SqliteTransactionGuard<'static>> {
        let max_wait = self.limits.max_wait;
        match tokio::time::timeout(max_wait, self.pool.begin()).await {
            Ok(tx) => Ok(SqliteTransactionGuard::new(tx?)),
            Err(_) => {
                warn!(
                    max_wait_ms = max_wait.as_millis() as u64,
                    "Timed out waiting to begin transaction"
                );
                Err(AppError::transaction_timeout(format!(
                    "Could not begin transaction within {}ms",
                    max_wait.as_millis()
                )))
            }
        }
    }

    /// Run a transaction body, abandoning it after `timeout`
    ///
    /// The future should own the transaction guard; dropping it on timeout
    /// rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns `TRANSACTION_TIMEOUT` on expiry, otherwise the body's own error
    pub async fn within_timeout<T, F>(&self, operation: &str, body: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let timeout = self.limits.timeout;
        if let Ok(result) = tokio::time::timeout(timeout, body).await {
            result
        } else {
            warn!(
                operation = %operation,
                timeout_ms = timeout.as_millis() as u64,
                "Transaction exceeded its timeout and was rolled back"
            );
            Err(AppError::transaction_timeout(format!(
                "{operation} exceeded the {}ms transaction timeout",
                timeout.as_millis()
            ))
            .with_operation(operation))
        }
    }

    /// Load one workout tree in its own read transaction
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown id, or a transaction error
    pub async fn fetch_workout(&self, workout_id: &str) -> AppResult<Workout> {
        let mut tx = self.begin().await?;
        self.within_timeout("load workout", async move {
            let workout = workouts::load_workout(tx.executor()?, workout_id).await?;
            tx.commit().await?;
            workout.ok_or_else(|| {
                AppError::not_found(format!("Workout {workout_id}")).with_resource_id(workout_id)
            })
        })
        .await
    }

    /// List workout summaries, newest first
    ///
    /// # Errors
    ///
    /// Returns a transaction error
    pub async fn fetch_summaries(&self) -> AppResult<Vec<WorkoutSummary>> {
        let mut tx = self.begin().await?;
        self.within_timeout("list workouts", async move {
            let summaries = workouts::list_workouts(tx.executor()?).await?;
            tx.commit().await?;
            Ok(summaries)
        })
        .await
    }

    /// Create tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        // Children are never removed by ON DELETE CASCADE: deletions go through
        // the batch purger so each statement stays bounded.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workouts (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                timer_active BOOLEAN NOT NULL DEFAULT false,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                workout_id TEXT NOT NULL REFERENCES workouts(id),
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                exercise_type TEXT NOT NULL DEFAULT 'other',
                timer_active BOOLEAN NOT NULL DEFAULT false,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (workout_id, position)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercise_sets (
                id TEXT PRIMARY KEY,
                exercise_id TEXT NOT NULL REFERENCES exercises(id),
                set_number INTEGER NOT NULL CHECK (set_number >= 1),
                weight REAL,
                reps INTEGER,
                distance_km REAL,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                transition_time_secs INTEGER,
                timer_active BOOLEAN NOT NULL DEFAULT false,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (exercise_id, set_number)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_exercises_workout ON exercises(workout_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_exercise_sets_exercise ON exercise_sets(exercise_id)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Workout schema migrated");
        Ok(())
    }
}
