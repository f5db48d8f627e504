// ABOUTME: Existence probes for workouts, exercises and sets scoped to their claimed parent
// ABOUTME: Fails with NotFound on missing rows and on mismatched parent/child pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use sqlx::SqliteConnection;

/// Owning ids of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLocation {
    /// Exercise that owns the set
    pub exercise_id: String,
    /// Workout that owns the exercise
    pub workout_id: String,
}

/// Confirm a workout exists
///
/// # Errors
///
/// Returns `RESOURCE_NOT_FOUND` if it does not, or a database error
pub async fn workout_exists(conn: &mut SqliteConnection, workout_id: &str) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workouts WHERE id = $1)")
        .bind(workout_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found(format!("Workout {workout_id}")).with_resource_id(workout_id))
    }
}

/// Confirm an exercise exists under the given workout
///
/// # Errors
///
/// Returns `RESOURCE_NOT_FOUND` if the exercise is missing or belongs elsewhere
pub async fn exercise_exists(
    conn: &mut SqliteConnection,
    workout_id: &str,
    exercise_id: &str,
) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM exercises WHERE id = $1 AND workout_id = $2)",
    )
    .bind(exercise_id)
    .bind(workout_id)
    .fetch_one(&mut *conn)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(
            AppError::not_found(format!("Exercise {exercise_id} in workout {workout_id}"))
                .with_resource_id(exercise_id),
        )
    }
}

/// Confirm a set exists under the given exercise
///
/// # Errors
///
/// Returns `RESOURCE_NOT_FOUND` if the set is missing or belongs elsewhere
pub async fn set_exists(
    conn: &mut SqliteConnection,
    exercise_id: &str,
    set_id: &str,
) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM exercise_sets WHERE id = $1 AND exercise_id = $2)",
    )
    .bind(set_id)
    .bind(exercise_id)
    .fetch_one(&mut *conn)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(
            AppError::not_found(format!("Set {set_id} in exercise {exercise_id}"))
                .with_resource_id(set_id),
        )
    }
}

/// Find the workout that owns an exercise
///
/// # Errors
///
/// Returns `RESOURCE_NOT_FOUND` if the exercise does not exist
pub async fn locate_exercise(conn: &mut SqliteConnection, exercise_id: &str) -> AppResult<String> {
    let workout_id: Option<String> =
        sqlx::query_scalar("SELECT workout_id FROM exercises WHERE id = $1")
            .bind(exercise_id)
            .fetch_optional(&mut *conn)
            .await?;
    workout_id.ok_or_else(|| {
        AppError::not_found(format!("Exercise {exercise_id}")).with_resource_id(exercise_id)
    })
}

/// Find the exercise and workout that own a set
///
/// # Errors
///
/// Returns `RESOURCE_NOT_FOUND` if the set does not exist
pub async fn locate_set(conn: &mut SqliteConnection, set_id: &str) -> AppResult<SetLocation> {
    let row: Option<(String, String)> = sqlx::query_as(
        r"
        SELECT s.exercise_id, e.workout_id
        FROM exercise_sets s
        JOIN exercises e ON e.id = s.exercise_id
        WHERE s.id = $1
        ",
    )
    .bind(set_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(|(exercise_id, workout_id)| SetLocation {
        exercise_id,
        workout_id,
    })
    .ok_or_else(|| AppError::not_found(format!("Exercise set {set_id}")).with_resource_id(set_id))
}
