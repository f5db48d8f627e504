// ABOUTME: Workout CLI - command-line front end for the workout sequencer engine
// ABOUTME: Creates, inspects, toggles, plays and deletes workouts, printing JSON response envelopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Create a workout from a JSON payload
//! workout-cli create ./leg-day.json
//!
//! # Show the full tree of a workout
//! workout-cli show 3f6c...
//!
//! # Play a workout (Ctrl-C stops it and switches every timer off)
//! workout-cli start 3f6c...
//!
//! # Switch an exercise timer on
//! workout-cli toggle exercise <workout-id> <exercise-id> on
//!
//! # Delete a set
//! workout-cli delete set <set-id>
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{info, warn};
use workout_sequencer::config::database::DatabaseUrl;
use workout_sequencer::config::environment::ServerConfig;
use workout_sequencer::errors::{AppError, AppResult};
use workout_sequencer::formatters::{
    format_output, respond, timer_message, OutputFormat, ResponseEnvelope,
};
use workout_sequencer::logging::LoggingConfig;
use workout_sequencer::models::{CreateWorkoutRequest, UpdateWorkoutRequest};
use workout_sequencer::services::{SequenceEvent, SequenceObserver, WorkoutService};

#[derive(Parser)]
#[command(
    name = "workout-cli",
    about = "Workout sequencer CLI",
    long_about = "Command-line tool for building workouts, switching their timers and playing them set by set."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override (sqlite:<path> or sqlite::memory:)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Output format: json or pretty
    #[arg(long, global = true, default_value = "json")]
    format: String,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create a workout from a JSON file
    Create {
        /// Path to the workout payload
        file: PathBuf,
    },

    /// Update a workout from a JSON file
    Update {
        /// Workout ID
        workout_id: String,

        /// Path to the update payload
        file: PathBuf,
    },

    /// Show a workout with its exercises and sets
    Show {
        /// Workout ID
        workout_id: String,
    },

    /// List workouts, newest first
    List,

    /// Play a workout from start to finish
    Start {
        /// Workout ID
        workout_id: String,
    },

    /// Switch a timer on or off
    Toggle {
        #[command(subcommand)]
        target: ToggleTarget,
    },

    /// Delete a workout, exercise or set
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
}

#[derive(Subcommand)]
enum ToggleTarget {
    /// Workout timer; switching off stops everything below it
    Workout {
        /// Workout ID
        workout_id: String,
        /// New state
        state: Switch,
    },
    /// Exercise timer; switching off stops its sets
    Exercise {
        /// Workout ID
        workout_id: String,
        /// Exercise ID
        exercise_id: String,
        /// New state
        state: Switch,
    },
    /// Set timer
    Set {
        /// Workout ID
        workout_id: String,
        /// Exercise ID
        exercise_id: String,
        /// Set ID
        set_id: String,
        /// New state
        state: Switch,
    },
}

#[derive(Subcommand)]
enum DeleteTarget {
    /// Delete a workout with all exercises and sets
    Workout {
        /// Workout ID
        workout_id: String,
    },
    /// Delete an exercise with all its sets
    Exercise {
        /// Exercise ID
        exercise_id: String,
    },
    /// Delete a single set
    Set {
        /// Set ID
        set_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Prints every sequence event as one JSON line
struct EventPrinter;

impl SequenceObserver for EventPrinter {
    fn on_event(&self, event: &SequenceEvent) {
        match format_output(event, OutputFormat::Json) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Could not render sequence event: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.level = "debug".to_owned();
    }
    logging.init()?;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = &cli.database_url {
        config.database.url = DatabaseUrl::parse_url(url)?;
    }
    if config.database.url.is_memory() {
        warn!("Using an in-memory database; nothing will persist after this command");
    }

    let service = WorkoutService::connect(&config)
        .await
        .context("Failed to open workout database")?;

    let format = OutputFormat::from_str_param(&cli.format);

    let envelope = execute(&service, cli.command).await;
    println!("{}", format_output(&envelope, format)?);

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn execute(service: &WorkoutService, command: Command) -> ResponseEnvelope<Value> {
    match command {
        Command::Create { file } => match read_payload::<CreateWorkoutRequest>(&file).await {
            Ok(request) => respond(service.create_workout(request).await, |w| {
                format!("Workout '{}' created", w.title)
            }),
            Err(e) => respond::<Value, _>(Err(e), |_| String::new()),
        },
        Command::Update { workout_id, file } => {
            match read_payload::<UpdateWorkoutRequest>(&file).await {
                Ok(request) => respond(service.update_workout(&workout_id, request).await, |w| {
                    format!("Workout '{}' updated", w.title)
                }),
                Err(e) => respond::<Value, _>(Err(e), |_| String::new()),
            }
        }
        Command::Show { workout_id } => respond(service.get_workout(&workout_id).await, |w| {
            format!("Workout '{}' retrieved", w.title)
        }),
        Command::List => respond(service.list_workouts().await, |list| {
            format!("{} workouts found", list.len())
        }),
        Command::Start { workout_id } => play(service, &workout_id).await,
        Command::Toggle { target } => {
            let result = match target {
                ToggleTarget::Workout { workout_id, state } => {
                    service
                        .toggle_workout_timer(&workout_id, state.is_on())
                        .await
                }
                ToggleTarget::Exercise {
                    workout_id,
                    exercise_id,
                    state,
                } => {
                    service
                        .toggle_exercise_timer(&workout_id, &exercise_id, state.is_on())
                        .await
                }
                ToggleTarget::Set {
                    workout_id,
                    exercise_id,
                    set_id,
                    state,
                } => {
                    service
                        .toggle_exercise_set_timer(
                            &workout_id,
                            &exercise_id,
                            &set_id,
                            state.is_on(),
                        )
                        .await
                }
            };
            respond(result, timer_message)
        }
        Command::Delete { target } => {
            let (entity, result) = match target {
                DeleteTarget::Workout { workout_id } => {
                    ("Workout", service.delete_workout(&workout_id).await)
                }
                DeleteTarget::Exercise { exercise_id } => {
                    ("Exercise", service.delete_exercise(&exercise_id).await)
                }
                DeleteTarget::Set { set_id } => {
                    ("Set", service.delete_exercise_set(&set_id).await)
                }
            };
            respond(result, |summary| format!("{entity} {} deleted", summary.id))
        }
    }
}

/// Run a sequence, turning Ctrl-C into a stop request
async fn play(service: &WorkoutService, workout_id: &str) -> ResponseEnvelope<Value> {
    let run = service.start_workout_sequence(workout_id, &EventPrinter);
    tokio::pin!(run);

    let result = tokio::select! {
        result = &mut run => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            info!(workout_id = %workout_id, "Interrupt received, stopping sequence");
            if let Err(e) = service.stop_workout_sequence(workout_id) {
                warn!(workout_id = %workout_id, "Stop request not delivered: {e}");
            }
            run.await
        }
    };

    respond(result, |report| {
        format!(
            "Workout sequence completed: {} exercises, {} sets",
            report.exercises_completed, report.sets_completed
        )
    })
}

async fn read_payload<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<T> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::invalid_input(format!("Cannot read {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&raw)?)
}
