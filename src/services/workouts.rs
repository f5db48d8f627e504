// ABOUTME: Workout service composing persistence, timer toggles and sequence playback
// ABOUTME: Entry point for every external operation on the workout tree
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::environment::ServerConfig;
use crate::database::purge::BatchPurger;
use crate::database::{existence, workouts, Database};
use crate::errors::{AppError, AppResult};
use crate::logging::TimerLogger;
use crate::models::{CreateWorkoutRequest, UpdateWorkoutRequest, Workout, WorkoutSummary};
use crate::services::sequence::{SequenceObserver, SequenceOrchestrator, SequenceReport};
use crate::services::timers::{TimerControl, TimerState, TimerToggler};
use crate::utils::timing::OperationTimer;

/// Result of a delete operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    /// Id of the deleted entity
    pub id: String,
    /// Rows removed, the entity itself included
    pub rows_deleted: u64,
    /// Paged set DELETE statements issued by the batch purger
    pub purge_batches: u32,
}

/// Workout operations exposed to callers
#[derive(Clone)]
pub struct WorkoutService {
    db: Database,
    purger: BatchPurger,
    timers: Arc<dyn TimerControl>,
    sequences: SequenceOrchestrator,
}

impl WorkoutService {
    /// Connect to the configured database and build the service
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the config is invalid
    pub async fn connect(config: &ServerConfig) -> AppResult<Self> {
        let db = Database::new(&config.database, config.transactions).await?;
        Self::new(db, config)
    }

    /// Build the service over an open database
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` for a zero purge batch size
    pub fn new(db: Database, config: &ServerConfig) -> AppResult<Self> {
        let timers: Arc<dyn TimerControl> = Arc::new(TimerToggler::new(db.clone()));
        Self::with_timer_control(db, config, timers)
    }

    /// Build the service with a custom timer backend for the sequence
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` for a zero purge batch size
    pub fn with_timer_control(
        db: Database,
        config: &ServerConfig,
        timers: Arc<dyn TimerControl>,
    ) -> AppResult<Self> {
        let purger = BatchPurger::new(config.purge_batch_size)?;
        let sequences = SequenceOrchestrator::new(db.clone(), Arc::clone(&timers), config.sequence);
        Ok(Self {
            db,
            purger,
            timers,
            sequences,
        })
    }

    /// Underlying database
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    // ========================================================================
    // Workout tree
    // ========================================================================

    /// Create a workout with its exercises and sets, all timers off
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` for a malformed payload, or a transaction error
    pub async fn create_workout(&self, request: CreateWorkoutRequest) -> AppResult<Workout> {
        request.validate()?;
        let timer = OperationTimer::start("create workout");
        let mut tx = self.db.begin().await?;

        let workout = self
            .db
            .within_timeout("create workout", async move {
                let conn = tx.executor()?;
                let id =
                    workouts::insert_workout(conn, &request.title, request.description.as_deref())
                        .await?;
                workouts::insert_exercises(conn, &id, &request.exercises).await?;
                let workout = workouts::load_workout(conn, &id)
                    .await?
                    .ok_or_else(|| AppError::internal(format!("Workout {id} vanished during create")))?;
                tx.commit().await?;
                Ok(workout)
            })
            .await?;

        info!(
            workout_id = %workout.id,
            exercises = workout.exercises.len(),
            sets = workout.set_count(),
            elapsed_ms = timer.finish(),
            "Workout created"
        );
        Ok(workout)
    }

    /// Fetch a workout tree in playback order
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown id
    pub async fn get_workout(&self, workout_id: &str) -> AppResult<Workout> {
        self.db.fetch_workout(workout_id).await
    }

    /// List workouts, newest first
    ///
    /// # Errors
    ///
    /// Returns a transaction error
    pub async fn list_workouts(&self) -> AppResult<Vec<WorkoutSummary>> {
        self.db.fetch_summaries().await
    }

    /// Update header fields and, when exercises are supplied, replace the subtree
    ///
    /// The old exercises and sets are batch-purged and the new ones inserted
    /// in the same transaction, timers off.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT`, `RESOURCE_NOT_FOUND`, `SEQUENCE_CONFLICT`
    /// while the workout is being played, or a transaction error
    pub async fn update_workout(
        &self,
        workout_id: &str,
        request: UpdateWorkoutRequest,
    ) -> AppResult<Workout> {
        request.validate()?;
        let _claim = self.sequences.claim_for_mutation(workout_id)?;
        let timer = OperationTimer::start(format!("update workout {workout_id}"));
        let purger = self.purger;
        let mut tx = self.db.begin().await?;

        let workout = self
            .db
            .within_timeout("update workout", async move {
                let conn = tx.executor()?;
                let current = workouts::load_workout(conn, workout_id).await?.ok_or_else(|| {
                    AppError::not_found(format!("Workout {workout_id}")).with_resource_id(workout_id)
                })?;

                let title = request
                    .title
                    .apply(Some(current.title))
                    .ok_or_else(|| AppError::invalid_input("Title cannot be cleared"))?;
                let description = request.description.apply(current.description);
                workouts::update_workout_header(conn, workout_id, &title, description.as_deref())
                    .await?;

                if let Some(exercises) = &request.exercises {
                    let purged = purger.purge_exercises_of(conn, workout_id).await?;
                    info!(
                        workout_id = %workout_id,
                        rows = purged.deleted,
                        batches = purged.batches,
                        "Replacing exercise subtree"
                    );
                    workouts::insert_exercises(conn, workout_id, exercises).await?;
                }

                let workout = workouts::load_workout(conn, workout_id).await?.ok_or_else(|| {
                    AppError::internal(format!("Workout {workout_id} vanished during update"))
                })?;
                tx.commit().await?;
                Ok(workout)
            })
            .await?;

        info!(workout_id = %workout_id, elapsed_ms = timer.finish(), "Workout updated");
        Ok(workout)
    }

    /// Delete a workout with all of its exercises and sets
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `SEQUENCE_CONFLICT` while the workout is
    /// being played, or a transaction error
    pub async fn delete_workout(&self, workout_id: &str) -> AppResult<DeletionSummary> {
        let _claim = self.sequences.claim_for_mutation(workout_id)?;
        let timer = OperationTimer::start(format!("delete workout {workout_id}"));
        let purger = self.purger;
        let mut tx = self.db.begin().await?;

        let summary = self
            .db
            .within_timeout("delete workout", async move {
                let conn = tx.executor()?;
                existence::workout_exists(conn, workout_id).await?;
                let purged = purger.purge_exercises_of(conn, workout_id).await?;
                let removed = workouts::delete_workout_row(conn, workout_id).await?;
                tx.commit().await?;
                Ok(DeletionSummary {
                    id: workout_id.to_owned(),
                    rows_deleted: purged.deleted + removed,
                    purge_batches: purged.batches,
                })
            })
            .await?;

        TimerLogger::log_delete("workout", workout_id, timer.finish());
        Ok(summary)
    }

    /// Delete an exercise and all of its sets
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `SEQUENCE_CONFLICT` while its workout is
    /// being played, or a transaction error
    pub async fn delete_exercise(&self, exercise_id: &str) -> AppResult<DeletionSummary> {
        let timer = OperationTimer::start(format!("delete exercise {exercise_id}"));
        let purger = self.purger;
        let mut tx = self.db.begin().await?;

        let summary = self
            .db
            .within_timeout("delete exercise", async move {
                let conn = tx.executor()?;
                let workout_id = existence::locate_exercise(conn, exercise_id).await?;
                let _claim = self.sequences.claim_for_mutation(&workout_id)?;
                let purged = purger.purge_sets_of(conn, exercise_id).await?;
                let removed = workouts::delete_exercise_row(conn, exercise_id).await?;
                tx.commit().await?;
                Ok(DeletionSummary {
                    id: exercise_id.to_owned(),
                    rows_deleted: purged.deleted + removed,
                    purge_batches: purged.batches,
                })
            })
            .await?;

        TimerLogger::log_delete("exercise", exercise_id, timer.finish());
        Ok(summary)
    }

    /// Delete a single set
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `SEQUENCE_CONFLICT` while its workout is
    /// being played, or a transaction error
    pub async fn delete_exercise_set(&self, set_id: &str) -> AppResult<DeletionSummary> {
        let timer = OperationTimer::start(format!("delete set {set_id}"));
        let mut tx = self.db.begin().await?;

        let summary = self
            .db
            .within_timeout("delete exercise set", async move {
                let conn = tx.executor()?;
                let location = existence::locate_set(conn, set_id).await?;
                let _claim = self.sequences.claim_for_mutation(&location.workout_id)?;
                let removed = workouts::delete_set_row(conn, set_id).await?;
                tx.commit().await?;
                Ok(DeletionSummary {
                    id: set_id.to_owned(),
                    rows_deleted: removed,
                    purge_batches: 0,
                })
            })
            .await?;

        TimerLogger::log_delete("set", set_id, timer.finish());
        Ok(summary)
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Switch a workout timer; switching off stops every exercise and set
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` or a transaction error
    pub async fn toggle_workout_timer(
        &self,
        workout_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        self.timers.set_workout_timer(workout_id, active).await
    }

    /// Switch an exercise timer; switching off stops its sets
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` (including an exercise of another workout),
    /// `PARENT_TIMER_INACTIVE`, or a transaction error
    pub async fn toggle_exercise_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        self.timers
            .set_exercise_timer(workout_id, exercise_id, active)
            .await
    }

    /// Switch a set timer
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` (including a mismatched parent chain),
    /// `PARENT_TIMER_INACTIVE`, or a transaction error
    pub async fn toggle_exercise_set_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        set_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        self.timers
            .set_set_timer(workout_id, exercise_id, set_id, active)
            .await
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Play a workout; returns once the run is completed or aborted
    ///
    /// # Errors
    ///
    /// Returns `SEQUENCE_CONFLICT` if the workout is already playing, or the
    /// error that aborted the run
    pub async fn start_workout_sequence(
        &self,
        workout_id: &str,
        observer: &dyn SequenceObserver,
    ) -> AppResult<SequenceReport> {
        self.sequences
            .start_workout_sequence(workout_id, observer)
            .await
    }

    /// Stop the running sequence of a workout
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` if nothing is playing
    pub fn stop_workout_sequence(&self, workout_id: &str) -> AppResult<()> {
        self.sequences.stop_workout_sequence(workout_id)
    }

    /// Whether a sequence is playing the workout
    #[must_use]
    pub fn is_sequence_running(&self, workout_id: &str) -> bool {
        self.sequences.is_running(workout_id)
    }
}
