// ABOUTME: Main library entry point for the workout sequencer engine
// ABOUTME: Hierarchical workout/exercise/set timers with cascading state and timed playback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![deny(unsafe_code)]

//! # Workout Sequencer
//!
//! A three-level timer engine for structured workouts. A workout holds
//! exercises, an exercise holds sets, and each level carries a
//! `timer_active` flag.
//!
//! ## Features
//!
//! - **Cascading timers**: stopping a workout or exercise stops every timer below it
//!   in one transaction
//! - **Timed sequences**: play a workout set by set with real waits, one run per workout
//! - **Emergency stop**: any failure converges the whole tree back to inactive
//! - **Bounded persistence**: every transaction has a bounded wait and a bounded run time
//! - **Batch purge**: large child collections are deleted in fixed-size batches
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use workout_sequencer::config::environment::ServerConfig;
//! use workout_sequencer::errors::AppResult;
//! use workout_sequencer::services::{NoopObserver, WorkoutService};
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let service = WorkoutService::connect(&config).await?;
//!
//!     for workout in service.list_workouts().await? {
//!         println!("{} {}", workout.id, workout.title);
//!     }
//!
//!     let report = service.start_workout_sequence("workout-id", &NoopObserver).await?;
//!     println!("played {} sets", report.sets_completed);
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Persistence gateway, transactions, existence probes and batch purge
pub mod database;

/// Unified error handling system with standard error codes
pub mod errors;

/// Response envelope and output rendering
pub mod formatters;

/// Structured logging configuration
pub mod logging;

/// Workout, exercise and set types plus request payloads
pub mod models;

/// Timer toggles, sequence orchestration and the workout service
pub mod services;

/// Shared helpers
pub mod utils;
