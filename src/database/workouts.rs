// ABOUTME: Row-level SQL statements for the workout/exercise/set tree
// ABOUTME: Inserts trees, loads them in playback order, and flips timer flags inside a caller's transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Every function here takes the connection of an open transaction; none of
//! them commit. Composition into atomic operations happens in `services`.

use crate::errors::{AppError, AppResult};
use crate::models::{
    Exercise, ExerciseSet, ExerciseType, NewExercise, NewSet, Workout, WorkoutSummary,
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

// ============================================================================
// Inserts
// ============================================================================

/// Insert a workout row with its timer off, returning the new id
///
/// # Errors
///
/// Returns an error if the insert fails
pub async fn insert_workout(
    conn: &mut SqliteConnection,
    title: &str,
    description: Option<&str>,
) -> AppResult<String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        r"
        INSERT INTO workouts (id, title, description, timer_active, created_at, updated_at)
        VALUES ($1, $2, $3, false, $4, $4)
        ",
    )
    .bind(&id)
    .bind(title)
    .bind(description)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

/// Insert exercises (and their sets) after any existing ones, timers off
///
/// # Errors
///
/// Returns an error if an insert fails or a set duration cannot be normalized
pub async fn insert_exercises(
    conn: &mut SqliteConnection,
    workout_id: &str,
    exercises: &[NewExercise],
) -> AppResult<()> {
    let next_position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM exercises WHERE workout_id = $1",
    )
    .bind(workout_id)
    .fetch_one(&mut *conn)
    .await?;

    for (offset, exercise) in exercises.iter().enumerate() {
        let exercise_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let position = next_position + to_i64(offset as u64)?;
        sqlx::query(
            r"
            INSERT INTO exercises
                (id, workout_id, position, name, exercise_type, timer_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, false, $6, $6)
            ",
        )
        .bind(&exercise_id)
        .bind(workout_id)
        .bind(position)
        .bind(exercise.name.trim())
        .bind(exercise.exercise_type.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        for set in &exercise.sets {
            insert_set(conn, &exercise_id, set).await?;
        }
    }
    Ok(())
}

async fn insert_set(conn: &mut SqliteConnection, exercise_id: &str, set: &NewSet) -> AppResult<()> {
    let duration_secs = to_i64(set.duration_secs()?)?;
    let transition = set.transition_time.map(to_i64).transpose()?;
    let now = Utc::now();
    sqlx::query(
        r"
        INSERT INTO exercise_sets
            (id, exercise_id, set_number, weight, reps, distance_km, duration_secs,
             transition_time_secs, timer_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, $9, $9)
        ",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(exercise_id)
    .bind(i64::from(set.set_number))
    .bind(set.weight)
    .bind(set.reps.map(i64::from))
    .bind(set.distance_km)
    .bind(duration_secs)
    .bind(transition)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update title/description of a workout
///
/// # Errors
///
/// Returns an error if the update fails
pub async fn update_workout_header(
    conn: &mut SqliteConnection,
    workout_id: &str,
    title: &str,
    description: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE workouts SET title = $1, description = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(title)
    .bind(description)
    .bind(Utc::now())
    .bind(workout_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ============================================================================
// Reads
// ============================================================================

/// Load a workout tree: exercises by creation order, sets by `set_number`
///
/// # Errors
///
/// Returns an error if a query fails or a row cannot be decoded
pub async fn load_workout(
    conn: &mut SqliteConnection,
    workout_id: &str,
) -> AppResult<Option<Workout>> {
    let Some(row) = sqlx::query(
        r"
        SELECT id, title, description, timer_active, created_at, updated_at
        FROM workouts
        WHERE id = $1
        ",
    )
    .bind(workout_id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let exercise_rows = sqlx::query(
        r"
        SELECT id, workout_id, name, exercise_type, timer_active, created_at, updated_at
        FROM exercises
        WHERE workout_id = $1
        ORDER BY position ASC
        ",
    )
    .bind(workout_id)
    .fetch_all(&mut *conn)
    .await?;

    let set_rows = sqlx::query(
        r"
        SELECT s.id, s.exercise_id, s.set_number, s.weight, s.reps, s.distance_km,
               s.duration_secs, s.transition_time_secs, s.timer_active,
               s.created_at, s.updated_at
        FROM exercise_sets s
        JOIN exercises e ON e.id = s.exercise_id
        WHERE e.workout_id = $1
        ORDER BY e.position ASC, s.set_number ASC
        ",
    )
    .bind(workout_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut exercises = exercise_rows
        .iter()
        .map(row_to_exercise)
        .collect::<AppResult<Vec<_>>>()?;

    for set_row in &set_rows {
        let set = row_to_set(set_row)?;
        if let Some(exercise) = exercises.iter_mut().find(|e| e.id == set.exercise_id) {
            exercise.sets.push(set);
        }
    }

    Ok(Some(Workout {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        timer_active: row.try_get("timer_active")?,
        exercises,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    }))
}

/// List workout summaries, newest first
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn list_workouts(conn: &mut SqliteConnection) -> AppResult<Vec<WorkoutSummary>> {
    let rows = sqlx::query(
        r"
        SELECT w.id, w.title, w.description, w.timer_active, w.created_at,
               (SELECT COUNT(*) FROM exercises e WHERE e.workout_id = w.id) AS exercise_count
        FROM workouts w
        ORDER BY w.created_at DESC, w.rowid DESC
        ",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(WorkoutSummary {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                timer_active: row.try_get("timer_active")?,
                exercise_count: from_i64(row.try_get("exercise_count")?)?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            })
        })
        .collect()
}

/// Ids of a workout's exercises in creation order
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn exercise_ids(conn: &mut SqliteConnection, workout_id: &str) -> AppResult<Vec<String>> {
    Ok(sqlx::query_scalar(
        "SELECT id FROM exercises WHERE workout_id = $1 ORDER BY position ASC",
    )
    .bind(workout_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Current workout timer flag, if the workout exists
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn workout_flag(conn: &mut SqliteConnection, workout_id: &str) -> AppResult<Option<bool>> {
    Ok(
        sqlx::query_scalar("SELECT timer_active FROM workouts WHERE id = $1")
            .bind(workout_id)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

/// Current exercise timer flag, if the exercise exists
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn exercise_flag(
    conn: &mut SqliteConnection,
    exercise_id: &str,
) -> AppResult<Option<bool>> {
    Ok(
        sqlx::query_scalar("SELECT timer_active FROM exercises WHERE id = $1")
            .bind(exercise_id)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

// ============================================================================
// Timer flag statements
// ============================================================================

/// Set the workout flag; returns rows touched
///
/// # Errors
///
/// Returns an error if the update fails
pub async fn set_workout_flag(
    conn: &mut SqliteConnection,
    workout_id: &str,
    active: bool,
) -> AppResult<u64> {
    let result =
        sqlx::query("UPDATE workouts SET timer_active = $1, updated_at = $2 WHERE id = $3")
            .bind(active)
            .bind(Utc::now())
            .bind(workout_id)
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected())
}

/// Turn off every exercise and set timer under a workout
///
/// Two set-based statements regardless of tree size; only rows still active
/// are touched.
///
/// # Errors
///
/// Returns an error if either update fails
pub async fn clear_workout_descendants(
    conn: &mut SqliteConnection,
    workout_id: &str,
) -> AppResult<u64> {
    let now = Utc::now();
    let sets = sqlx::query(
        r"
        UPDATE exercise_sets SET timer_active = false, updated_at = $1
        WHERE timer_active = true
          AND exercise_id IN (SELECT id FROM exercises WHERE workout_id = $2)
        ",
    )
    .bind(now)
    .bind(workout_id)
    .execute(&mut *conn)
    .await?;

    let exercises = sqlx::query(
        r"
        UPDATE exercises SET timer_active = false, updated_at = $1
        WHERE timer_active = true AND workout_id = $2
        ",
    )
    .bind(now)
    .bind(workout_id)
    .execute(&mut *conn)
    .await?;

    Ok(sets.rows_affected() + exercises.rows_affected())
}

/// Set an exercise flag scoped to its workout; returns rows touched
///
/// # Errors
///
/// Returns an error if the update fails
pub async fn set_exercise_flag(
    conn: &mut SqliteConnection,
    workout_id: &str,
    exercise_id: &str,
    active: bool,
) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE exercises SET timer_active = $1, updated_at = $2 WHERE id = $3 AND workout_id = $4",
    )
    .bind(active)
    .bind(Utc::now())
    .bind(exercise_id)
    .bind(workout_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Turn off every set timer under an exercise
///
/// # Errors
///
/// Returns an error if the update fails
pub async fn clear_exercise_descendants(
    conn: &mut SqliteConnection,
    exercise_id: &str,
) -> AppResult<u64> {
    let result = sqlx::query(
        r"
        UPDATE exercise_sets SET timer_active = false, updated_at = $1
        WHERE timer_active = true AND exercise_id = $2
        ",
    )
    .bind(Utc::now())
    .bind(exercise_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Set a set flag scoped to its exercise; returns rows touched
///
/// # Errors
///
/// Returns an error if the update fails
pub async fn set_set_flag(
    conn: &mut SqliteConnection,
    exercise_id: &str,
    set_id: &str,
    active: bool,
) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE exercise_sets SET timer_active = $1, updated_at = $2 WHERE id = $3 AND exercise_id = $4",
    )
    .bind(active)
    .bind(Utc::now())
    .bind(set_id)
    .bind(exercise_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

// ============================================================================
// Single-row deletes
// ============================================================================

/// Delete one set row
///
/// # Errors
///
/// Returns an error if the delete fails
pub async fn delete_set_row(conn: &mut SqliteConnection, set_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM exercise_sets WHERE id = $1")
        .bind(set_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete one exercise row; its sets must already be purged
///
/// # Errors
///
/// Returns an error if the delete fails (including a foreign-key violation
/// when sets remain)
pub async fn delete_exercise_row(conn: &mut SqliteConnection, exercise_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM exercises WHERE id = $1")
        .bind(exercise_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete one workout row; its exercises must already be purged
///
/// # Errors
///
/// Returns an error if the delete fails
pub async fn delete_workout_row(conn: &mut SqliteConnection, workout_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM workouts WHERE id = $1")
        .bind(workout_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_exercise(row: &SqliteRow) -> AppResult<Exercise> {
    let exercise_type: String = row.try_get("exercise_type")?;
    Ok(Exercise {
        id: row.try_get("id")?,
        workout_id: row.try_get("workout_id")?,
        name: row.try_get("name")?,
        exercise_type: ExerciseType::parse(&exercise_type),
        timer_active: row.try_get("timer_active")?,
        sets: Vec::new(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_set(row: &SqliteRow) -> AppResult<ExerciseSet> {
    Ok(ExerciseSet {
        id: row.try_get("id")?,
        exercise_id: row.try_get("exercise_id")?,
        set_number: from_i64(row.try_get("set_number")?)?,
        weight: row.try_get("weight")?,
        reps: row
            .try_get::<Option<i64>, _>("reps")?
            .map(from_i64)
            .transpose()?,
        distance_km: row.try_get("distance_km")?,
        duration_secs: from_i64(row.try_get("duration_secs")?)?,
        transition_time_secs: row
            .try_get::<Option<i64>, _>("transition_time_secs")?
            .map(from_i64)
            .transpose()?,
        timer_active: row.try_get("timer_active")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn to_i64(value: u64) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::invalid_input(format!("Value {value} is too large")))
}

fn from_i64<T: TryFrom<i64>>(value: i64) -> AppResult<T> {
    T::try_from(value)
        .map_err(|_| AppError::database(format!("Stored value {value} is out of range")))
}
