// ABOUTME: Domain service layer for the workout timer engine
// ABOUTME: Timer toggles, sequence orchestration and the workout service facade
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Domain service layer
//!
//! Services own transaction boundaries. Everything below them in
//! [`crate::database`] runs inside a transaction it is handed; everything
//! above them (the CLI, or any other surface) only sees typed results.

/// Timed playback of a workout
pub mod sequence;

/// Cascading timer toggles
pub mod timers;

/// Facade exposing every workout operation
pub mod workouts;

pub use sequence::{
    NoopObserver, SequenceEvent, SequenceObserver, SequenceOrchestrator, SequenceReport,
    SequenceState, SuspendPhase,
};
pub use timers::{TimerControl, TimerLevel, TimerState, TimerToggler};
pub use workouts::{DeletionSummary, WorkoutService};
