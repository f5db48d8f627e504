// ABOUTME: Timer activation for workouts, exercises and sets with downward deactivation cascade
// ABOUTME: Each toggle is one bounded transaction: probe, parent check, flag update, cascade, commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Timer toggles
//!
//! Turning a timer off also turns off every descendant in the same
//! transaction, so no exercise or set is ever left running under a stopped
//! parent. Turning a timer on requires the parent to be running already.

use crate::database::{existence, workouts, Database};
use crate::errors::{AppError, AppResult};
use crate::logging::TimerLogger;
use crate::utils::timing::OperationTimer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Level of the workout tree a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerLevel {
    /// Whole workout
    Workout,
    /// One exercise
    Exercise,
    /// One set
    Set,
}

impl TimerLevel {
    /// Display name used in log lines and response messages
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Workout => "Workout",
            Self::Exercise => "Exercise",
            Self::Set => "Set",
        }
    }
}

/// Outcome of a timer toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Level that was toggled
    pub level: TimerLevel,
    /// Id of the toggled entity
    pub id: String,
    /// New flag value
    pub timer_active: bool,
    /// Descendant timers switched off by the cascade
    pub cascaded: u64,
}

/// Timer operations the sequence orchestrator drives
#[async_trait]
pub trait TimerControl: Send + Sync {
    /// Set a workout timer; deactivation cascades to all exercises and sets
    async fn set_workout_timer(&self, workout_id: &str, active: bool) -> AppResult<TimerState>;

    /// Set an exercise timer; deactivation cascades to its sets
    async fn set_exercise_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        active: bool,
    ) -> AppResult<TimerState>;

    /// Set a set timer
    async fn set_set_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        set_id: &str,
        active: bool,
    ) -> AppResult<TimerState>;
}

/// Database-backed [`TimerControl`]
#[derive(Clone)]
pub struct TimerToggler {
    db: Database,
}

impl TimerToggler {
    /// Create a toggler over the given database
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    fn finish(
        level: TimerLevel,
        id: &str,
        active: bool,
        cascaded: u64,
        timer: OperationTimer,
    ) -> TimerState {
        TimerLogger::log_toggle(level.label(), id, active, timer.finish());
        TimerState {
            level,
            id: id.to_owned(),
            timer_active: active,
            cascaded,
        }
    }

    fn fail(level: TimerLevel, id: &str, error: AppError) -> AppError {
        warn!(
            timer.level = level.label(),
            timer.id = %id,
            error.code = ?error.code,
            "Timer toggle failed: {error}"
        );
        error.with_operation(format!("toggle {} timer", level.label().to_lowercase()))
    }
}

#[async_trait]
impl TimerControl for TimerToggler {
    async fn set_workout_timer(&self, workout_id: &str, active: bool) -> AppResult<TimerState> {
        let timer = OperationTimer::start(format!("workout timer {workout_id}"));
        let mut tx = self.db.begin().await?;

        let cascaded = self
            .db
            .within_timeout("toggle workout timer", async move {
                let conn = tx.executor()?;
                existence::workout_exists(conn, workout_id).await?;
                workouts::set_workout_flag(conn, workout_id, active).await?;
                let cascaded = if active {
                    0
                } else {
                    workouts::clear_workout_descendants(conn, workout_id).await?
                };
                tx.commit().await?;
                Ok(cascaded)
            })
            .await
            .map_err(|e| Self::fail(TimerLevel::Workout, workout_id, e))?;

        Ok(Self::finish(TimerLevel::Workout, workout_id, active, cascaded, timer))
    }

    async fn set_exercise_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        let timer = OperationTimer::start(format!("exercise timer {exercise_id}"));
        let mut tx = self.db.begin().await?;

        let cascaded = self
            .db
            .within_timeout("toggle exercise timer", async move {
                let conn = tx.executor()?;
                existence::workout_exists(conn, workout_id).await?;
                existence::exercise_exists(conn, workout_id, exercise_id).await?;
                if active && workouts::workout_flag(conn, workout_id).await? != Some(true) {
                    return Err(AppError::parent_inactive(format!(
                        "Workout {workout_id} timer must be running before exercise {exercise_id} can start"
                    ))
                    .with_resource_id(exercise_id));
                }
                workouts::set_exercise_flag(conn, workout_id, exercise_id, active).await?;
                let cascaded = if active {
                    0
                } else {
                    workouts::clear_exercise_descendants(conn, exercise_id).await?
                };
                tx.commit().await?;
                Ok(cascaded)
            })
            .await
            .map_err(|e| Self::fail(TimerLevel::Exercise, exercise_id, e))?;

        Ok(Self::finish(TimerLevel::Exercise, exercise_id, active, cascaded, timer))
    }

    async fn set_set_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        set_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        let timer = OperationTimer::start(format!("set timer {set_id}"));
        let mut tx = self.db.begin().await?;

        self.db
            .within_timeout("toggle set timer", async move {
                let conn = tx.executor()?;
                existence::workout_exists(conn, workout_id).await?;
                existence::exercise_exists(conn, workout_id, exercise_id).await?;
                existence::set_exists(conn, exercise_id, set_id).await?;
                if active && workouts::exercise_flag(conn, exercise_id).await? != Some(true) {
                    return Err(AppError::parent_inactive(format!(
                        "Exercise {exercise_id} timer must be running before set {set_id} can start"
                    ))
                    .with_resource_id(set_id));
                }
                workouts::set_set_flag(conn, exercise_id, set_id, active).await?;
                tx.commit().await?;
                Ok(())
            })
            .await
            .map_err(|e| Self::fail(TimerLevel::Set, set_id, e))?;

        Ok(Self::finish(TimerLevel::Set, set_id, active, 0, timer))
    }
}
