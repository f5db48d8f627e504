// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, workout builders, recording observers and fault-injecting timers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    missing_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `workout_sequencer`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use workout_sequencer::config::environment::{SequenceSettings, ServerConfig, TransactionLimits};
use workout_sequencer::database::Database;
use workout_sequencer::errors::{AppError, AppResult};
use workout_sequencer::models::{
    CreateWorkoutRequest, ExerciseType, NewExercise, NewSet, SetDuration, Workout,
};
use workout_sequencer::services::{
    SequenceEvent, SequenceObserver, SequenceState, SuspendPhase, TimerControl, TimerState,
    TimerToggler, WorkoutService,
};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // TEST_LOG controls the level; quiet by default
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Config with fast sequence pacing: one programmed second lasts `tick_ms`
pub fn test_config(tick_ms: u64) -> ServerConfig {
    ServerConfig {
        purge_batch_size: 4,
        sequence: SequenceSettings {
            default_transition_secs: 2,
            tick: Duration::from_millis(tick_ms),
        },
        ..ServerConfig::default()
    }
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::in_memory(TransactionLimits::default()).await?)
}

/// Service over a fresh in-memory database
pub async fn create_test_service(tick_ms: u64) -> Result<WorkoutService> {
    let db = create_test_database().await?;
    Ok(WorkoutService::new(db, &test_config(tick_ms))?)
}

/// Service whose sequence uses the given timer backend
pub async fn create_test_service_with_timers<F>(
    tick_ms: u64,
    make_timers: F,
) -> Result<WorkoutService>
where
    F: FnOnce(Database) -> Arc<dyn TimerControl>,
{
    let db = create_test_database().await?;
    let timers = make_timers(db.clone());
    Ok(WorkoutService::with_timer_control(
        db,
        &test_config(tick_ms),
        timers,
    )?)
}

/// Set lasting `duration_secs` with no rest
pub fn set(set_number: u32, duration_secs: u64) -> NewSet {
    set_with_duration(set_number, SetDuration::Seconds(duration_secs))
}

/// Set with an explicit duration form and no rest
pub fn set_with_duration(set_number: u32, duration: SetDuration) -> NewSet {
    NewSet {
        set_number,
        weight: Some(60.0),
        reps: Some(8),
        distance_km: None,
        duration: Some(duration),
        transition_time: Some(0),
    }
}

pub fn exercise(name: &str, sets: Vec<NewSet>) -> NewExercise {
    NewExercise {
        name: name.to_owned(),
        exercise_type: ExerciseType::Strength,
        sets,
    }
}

pub fn workout_request(title: &str, exercises: Vec<NewExercise>) -> CreateWorkoutRequest {
    CreateWorkoutRequest {
        title: title.to_owned(),
        description: Some("integration test".to_owned()),
        exercises,
    }
}

/// Exercises A (sets 1..=3) and B (set 1), zero-length sets
pub fn two_exercise_request() -> CreateWorkoutRequest {
    workout_request(
        "Push day",
        vec![
            exercise("A", vec![set(3, 0), set(1, 0), set(2, 0)]),
            exercise("B", vec![set(1, 0)]),
        ],
    )
}

/// Assert that no timer anywhere in the tree is on
pub fn assert_all_inactive(workout: &Workout) {
    assert!(!workout.timer_active, "workout timer still active");
    for exercise in &workout.exercises {
        assert!(
            !exercise.timer_active,
            "exercise {} timer still active",
            exercise.name
        );
        for set in &exercise.sets {
            assert!(
                !set.timer_active,
                "set {} of {} still active",
                set.set_number, exercise.name
            );
        }
    }
}

/// Observer that keeps every event
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SequenceEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<SequenceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Set ids in the order their timers were switched on
    pub fn activated_sets(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SequenceEvent::StateChanged {
                    state: SequenceState::SetActive,
                    set_id,
                    ..
                } => set_id,
                _ => None,
            })
            .collect()
    }

    /// Exercise ids in the order their timers were switched on
    pub fn activated_exercises(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SequenceEvent::StateChanged {
                    state: SequenceState::ExerciseActive,
                    exercise_id,
                    ..
                } => exercise_id,
                _ => None,
            })
            .collect()
    }

    /// Programmed seconds of every work suspension
    pub fn work_seconds(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SequenceEvent::Suspended {
                    phase: SuspendPhase::Work,
                    seconds,
                    ..
                } => Some(seconds),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<SequenceState> {
        self.events().into_iter().rev().find_map(|event| match event {
            SequenceEvent::StateChanged { state, .. } => Some(state),
            _ => None,
        })
    }

    pub fn emergency_stop_converged(&self) -> Option<bool> {
        self.events().into_iter().find_map(|event| match event {
            SequenceEvent::EmergencyStop { converged, .. } => Some(converged),
            _ => None,
        })
    }
}

impl SequenceObserver for RecordingObserver {
    fn on_event(&self, event: &SequenceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Real toggler that fails the Nth set activation
pub struct FailingTimers {
    inner: TimerToggler,
    fail_on_activation: u32,
    set_activations: AtomicU32,
}

impl FailingTimers {
    pub fn new(db: Database, fail_on_activation: u32) -> Self {
        Self {
            inner: TimerToggler::new(db),
            fail_on_activation,
            set_activations: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TimerControl for FailingTimers {
    async fn set_workout_timer(&self, workout_id: &str, active: bool) -> AppResult<TimerState> {
        self.inner.set_workout_timer(workout_id, active).await
    }

    async fn set_exercise_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        self.inner
            .set_exercise_timer(workout_id, exercise_id, active)
            .await
    }

    async fn set_set_timer(
        &self,
        workout_id: &str,
        exercise_id: &str,
        set_id: &str,
        active: bool,
    ) -> AppResult<TimerState> {
        if active {
            let attempt = self.set_activations.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt == self.fail_on_activation {
                return Err(AppError::database(format!(
                    "injected failure activating set {set_id}"
                )));
            }
        }
        self.inner
            .set_set_timer(workout_id, exercise_id, set_id, active)
            .await
    }
}
