// ABOUTME: Core data models for workouts, exercises and sets plus create/update request payloads
// ABOUTME: Normalizes set durations to whole seconds and validates incoming workout trees
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! A [`Workout`] exclusively owns its [`Exercise`]s, which exclusively own their
//! [`ExerciseSet`]s. Exercise order is creation order; set order is
//! `set_number` ascending. Loaders return trees already in that order and
//! nothing downstream re-sorts them.
//!
//! `timer_active` fields are read-only here: only the timer service flips them.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

// ============================================================================
// Entities
// ============================================================================

/// Kind of exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    /// Resistance work (weights, bodyweight)
    #[default]
    Strength,
    /// Endurance work (running, rowing, cycling)
    Cardio,
    /// Anything else (mobility, drills)
    Other,
}

impl ExerciseType {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Cardio => "cardio",
            Self::Other => "other",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "strength" => Self::Strength,
            "cardio" => Self::Cardio,
            // Default to Other for unrecognized values
            _ => Self::Other,
        }
    }
}

/// A workout and its ordered exercise tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Unique identifier
    pub id: String,
    /// Workout title
    pub title: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Whether this workout is currently being performed
    pub timer_active: bool,
    /// Exercises in creation order
    pub exercises: Vec<Exercise>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    /// True if the workout or any descendant still has its timer on
    #[must_use]
    pub fn any_timer_active(&self) -> bool {
        self.timer_active || self.exercises.iter().any(Exercise::any_timer_active)
    }

    /// Total number of sets across all exercises
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// An exercise within a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique identifier
    pub id: String,
    /// Owning workout
    pub workout_id: String,
    /// Exercise name
    pub name: String,
    /// Exercise kind
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    /// Whether this exercise is currently being performed
    pub timer_active: bool,
    /// Sets ordered by `set_number`
    pub sets: Vec<ExerciseSet>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Exercise {
    /// True if the exercise or any of its sets still has its timer on
    #[must_use]
    pub fn any_timer_active(&self) -> bool {
        self.timer_active || self.sets.iter().any(|s| s.timer_active)
    }
}

/// A single set within an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    /// Unique identifier
    pub id: String,
    /// Owning exercise
    pub exercise_id: String,
    /// 1-based playback position, unique within the exercise
    pub set_number: u32,
    /// Weight in kilograms
    pub weight: Option<f64>,
    /// Repetitions
    pub reps: Option<u32>,
    /// Distance in kilometers
    pub distance_km: Option<f64>,
    /// Work duration in whole seconds
    pub duration_secs: u64,
    /// Rest after the set in seconds; the configured default applies when absent
    pub transition_time_secs: Option<u64>,
    /// Whether this set is currently being performed
    pub timer_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ExerciseSet {
    /// Rest after this set, falling back to `default_secs`
    #[must_use]
    pub fn rest_secs(&self, default_secs: u64) -> u64 {
        self.transition_time_secs.unwrap_or(default_secs)
    }
}

/// Listing row for a workout without its tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    /// Unique identifier
    pub id: String,
    /// Workout title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Workout timer flag
    pub timer_active: bool,
    /// Number of exercises
    pub exercise_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Durations
// ============================================================================

/// Set duration as supplied by clients: integer seconds or a string form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetDuration {
    /// Whole seconds
    Seconds(u64),
    /// `"90"`, `"1:30"` or `"0:01:30"`
    Text(String),
}

impl SetDuration {
    /// Normalize to whole seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the string form is not digits, `MM:SS` or `HH:MM:SS`
    pub fn to_seconds(&self) -> AppResult<u64> {
        match self {
            Self::Seconds(secs) => Ok(*secs),
            Self::Text(text) => parse_duration_text(text),
        }
    }
}

impl From<u64> for SetDuration {
    fn from(secs: u64) -> Self {
        Self::Seconds(secs)
    }
}

impl From<&str> for SetDuration {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

fn parse_duration_text(text: &str) -> AppResult<u64> {
    let invalid = || AppError::invalid_input(format!("Invalid set duration '{text}'"));
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let mut fields = Vec::with_capacity(parts.len());
    for part in &parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        fields.push(part.parse::<u64>().map_err(|_| invalid())?);
    }

    // Minutes and seconds fields of clock forms stay below 60
    if fields.len() > 1 && fields[1..].iter().any(|f| *f >= 60) {
        return Err(invalid());
    }

    fields
        .iter()
        .try_fold(0_u64, |acc, f| acc.checked_mul(60)?.checked_add(*f))
        .ok_or_else(invalid)
}

// ============================================================================
// Request payloads
// ============================================================================

/// Tri-state field in an update payload
///
/// An absent key leaves the stored value alone, `null` clears it, and a value
/// replaces it. Use with `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Key absent: keep the stored value
    #[default]
    Unchanged,
    /// Key present with `null`
    Clear,
    /// Key present with a value
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Resolve against the stored value
    #[must_use]
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Unchanged => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Clear, Self::Set))
    }
}

/// Set definition in a create/update payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSet {
    /// 1-based playback position
    #[serde(alias = "set_number")]
    pub set_number: u32,
    /// Weight in kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    /// Repetitions
    #[serde(default)]
    pub reps: Option<u32>,
    /// Distance in kilometers
    #[serde(default, alias = "distance_km")]
    pub distance_km: Option<f64>,
    /// Work duration; zero seconds when absent
    #[serde(default)]
    pub duration: Option<SetDuration>,
    /// Rest after the set in seconds
    #[serde(default, alias = "transition_time")]
    pub transition_time: Option<u64>,
}

impl NewSet {
    /// Work duration in whole seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn duration_secs(&self) -> AppResult<u64> {
        self.duration.as_ref().map_or(Ok(0), SetDuration::to_seconds)
    }
}

/// Exercise definition in a create/update payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewExercise {
    /// Exercise name
    pub name: String,
    /// Exercise kind
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    /// Sets in any order; stored order follows `set_number`
    pub sets: Vec<NewSet>,
}

/// Payload for creating a workout with its full tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateWorkoutRequest {
    /// Workout title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Exercises in playback order
    pub exercises: Vec<NewExercise>,
}

impl CreateWorkoutRequest {
    /// Validate the payload before anything is persisted
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` describing the first problem found
    pub fn validate(&self) -> AppResult<()> {
        validate_title(&self.title)?;
        validate_exercises(&self.exercises)
    }
}

/// Payload for updating a workout
///
/// When `exercises` is present the whole exercise/set subtree is replaced.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpdateWorkoutRequest {
    /// New title
    #[serde(default)]
    pub title: FieldUpdate<String>,
    /// New description
    #[serde(default)]
    pub description: FieldUpdate<String>,
    /// Replacement exercise list
    #[serde(default, alias = "exercise")]
    pub exercises: Option<Vec<NewExercise>>,
}

impl UpdateWorkoutRequest {
    /// Validate the payload before anything is persisted
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` describing the first problem found
    pub fn validate(&self) -> AppResult<()> {
        match &self.title {
            FieldUpdate::Set(title) => validate_title(title)?,
            FieldUpdate::Clear => return Err(AppError::invalid_input("Title cannot be cleared")),
            FieldUpdate::Unchanged => {}
        }
        if let Some(exercises) = &self.exercises {
            validate_exercises(exercises)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::invalid_input("Workout title is required"));
    }
    Ok(())
}

fn validate_exercises(exercises: &[NewExercise]) -> AppResult<()> {
    if exercises.is_empty() {
        return Err(AppError::invalid_input("At least one exercise is required"));
    }
    for exercise in exercises {
        if exercise.name.trim().is_empty() {
            return Err(AppError::invalid_input("Exercise name is required"));
        }
        if exercise.sets.is_empty() {
            return Err(AppError::invalid_input(format!(
                "Exercise '{}' must have at least one set",
                exercise.name
            )));
        }
        let mut seen = HashSet::with_capacity(exercise.sets.len());
        for set in &exercise.sets {
            validate_set(&exercise.name, set)?;
            if !seen.insert(set.set_number) {
                return Err(AppError::invalid_input(format!(
                    "Exercise '{}' has duplicate set number {}",
                    exercise.name, set.set_number
                )));
            }
        }
    }
    Ok(())
}

fn validate_set(exercise_name: &str, set: &NewSet) -> AppResult<()> {
    if set.set_number == 0 {
        return Err(AppError::invalid_input(format!(
            "Set numbers in exercise '{exercise_name}' start at 1"
        )));
    }
    if set.weight.is_some_and(|w| !w.is_finite() || w < 0.0) {
        return Err(AppError::invalid_input("Weight must be zero or more"));
    }
    if set.distance_km.is_some_and(|d| !d.is_finite() || d < 0.0) {
        return Err(AppError::invalid_input("Distance must be zero or more"));
    }
    if set.reps == Some(0) {
        return Err(AppError::invalid_input("Reps must be at least 1"));
    }
    set.duration_secs()?;
    Ok(())
}
