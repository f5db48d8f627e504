// ABOUTME: Timed playback of a whole workout through its exercises and sets
// ABOUTME: One run per workout at a time, cancellable waits, and emergency stop on any failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sequence orchestration
//!
//! A run walks the workout in playback order (exercises by creation order,
//! sets by `set_number`):
//!
//! ```text
//! Idle -> WorkoutActive -> { ExerciseActive -> { SetActive -> Resting }* }* -> Completed
//! ```
//!
//! Any failure, including a stop request, moves the run to `Aborted` after an
//! emergency stop has switched the workout timer off. Because deactivation
//! cascades, that single call converges the whole tree no matter where the
//! run was interrupted. A run whose future is dropped before it finishes gets
//! the same emergency stop from a background task, and keeps the workout held
//! until that stop is done.
//!
//! Structural mutations hold the workout through the same table, so a run can
//! never start on a tree that is being replaced or deleted.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::environment::SequenceSettings;
use crate::database::Database;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::services::timers::TimerControl;
use crate::utils::timing::OperationTimer;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    /// Not started
    Idle,
    /// Workout timer on, between exercises
    WorkoutActive,
    /// Exercise timer on, between sets
    ExerciseActive,
    /// Set timer on, waiting out the set duration
    SetActive,
    /// Set finished, waiting out the rest period
    Resting,
    /// Every set played and every timer switched off
    Completed,
    /// Stopped early; emergency stop has run
    Aborted,
}

impl SequenceState {
    /// Whether the run is over
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// Which wait a suspension covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendPhase {
    /// The set itself
    Work,
    /// Transition after the set
    Rest,
}

/// Progress notification delivered to a [`SequenceObserver`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequenceEvent {
    /// The run moved to a new state
    StateChanged {
        /// New state
        state: SequenceState,
        /// Workout being played
        workout_id: String,
        /// Exercise involved, if any
        exercise_id: Option<String>,
        /// Set involved, if any
        set_id: Option<String>,
    },
    /// The run is about to wait
    Suspended {
        /// Work or rest
        phase: SuspendPhase,
        /// Programmed length of the wait
        seconds: u64,
        /// Set the wait belongs to
        set_id: String,
    },
    /// Emergency stop finished
    EmergencyStop {
        /// Workout being converged
        workout_id: String,
        /// Whether the tree is known to be fully inactive afterwards
        converged: bool,
    },
}

/// Receives every event of a run
pub trait SequenceObserver: Send + Sync {
    /// Called synchronously from the running sequence
    fn on_event(&self, event: &SequenceEvent);
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SequenceObserver for NoopObserver {
    fn on_event(&self, _event: &SequenceEvent) {}
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceReport {
    /// Workout that was played
    pub workout_id: String,
    /// `Completed` for a successful run
    pub final_state: SequenceState,
    /// Exercises played to the end
    pub exercises_completed: u32,
    /// Sets played to the end, including their rest
    pub sets_completed: u32,
    /// Wall-clock length of the run
    pub elapsed_ms: u64,
}

/// What currently holds a workout
enum WorkoutHold {
    /// A sequence is playing it; sending `true` requests a stop
    Sequence(watch::Sender<bool>),
    /// Structural mutations in flight
    Mutations(usize),
}

type RunningSequences = DashMap<String, WorkoutHold>;

fn release(running: &RunningSequences, workout_id: &str) {
    if let Entry::Occupied(mut held) = running.entry(workout_id.to_owned()) {
        let last_holder = match held.get_mut() {
            WorkoutHold::Mutations(count) if *count > 1 => {
                *count -= 1;
                false
            }
            _ => true,
        };
        if last_holder {
            held.remove();
        }
    }
}

/// Hold on a workout in the running table, released on drop
///
/// A sequence hold still carrying its orchestrator when dropped belongs to a
/// run that never reached a terminal state. Its release is deferred to a
/// background task that runs emergency stop first.
pub struct WorkoutClaim {
    running: Arc<RunningSequences>,
    workout_id: String,
    unfinished_run: Option<SequenceOrchestrator>,
}

impl WorkoutClaim {
    fn finish_run(&mut self) {
        self.unfinished_run = None;
    }
}

impl Drop for WorkoutClaim {
    fn drop(&mut self) {
        if let Some(orchestrator) = self.unfinished_run.take() {
            if let Ok(runtime) = Handle::try_current() {
                let workout_id = self.workout_id.clone();
                warn!(
                    workout_id = %workout_id,
                    "Sequence abandoned before finishing; running emergency stop in the background"
                );
                runtime.spawn(async move {
                    orchestrator.emergency_stop(&workout_id, &NoopObserver).await;
                    release(&orchestrator.running, &workout_id);
                    debug!(workout_id = %workout_id, "Workout hold released after emergency stop");
                });
                return;
            }
        }
        release(&self.running, &self.workout_id);
        debug!(workout_id = %self.workout_id, "Workout hold released");
    }
}

/// Mutable bookkeeping for one run
struct RunProgress<'a> {
    workout_id: &'a str,
    observer: &'a dyn SequenceObserver,
    state: SequenceState,
    exercises_completed: u32,
    sets_completed: u32,
}

impl<'a> RunProgress<'a> {
    const fn new(workout_id: &'a str, observer: &'a dyn SequenceObserver) -> Self {
        Self {
            workout_id,
            observer,
            state: SequenceState::Idle,
            exercises_completed: 0,
            sets_completed: 0,
        }
    }

    fn enter(&mut self, state: SequenceState, exercise_id: Option<&str>, set_id: Option<&str>) {
        debug!(
            workout_id = %self.workout_id,
            from = ?self.state,
            to = ?state,
            exercise_id = exercise_id.unwrap_or_default(),
            set_id = set_id.unwrap_or_default(),
            "Sequence transition"
        );
        self.state = state;
        self.observer.on_event(&SequenceEvent::StateChanged {
            state,
            workout_id: self.workout_id.to_owned(),
            exercise_id: exercise_id.map(str::to_owned),
            set_id: set_id.map(str::to_owned),
        });
    }

    fn report(&self, elapsed_ms: u64) -> SequenceReport {
        SequenceReport {
            workout_id: self.workout_id.to_owned(),
            final_state: self.state,
            exercises_completed: self.exercises_completed,
            sets_completed: self.sets_completed,
            elapsed_ms,
        }
    }
}

/// Drives workouts through their timed sequence
#[derive(Clone)]
pub struct SequenceOrchestrator {
    db: Database,
    timers: Arc<dyn TimerControl>,
    settings: SequenceSettings,
    running: Arc<RunningSequences>,
}

impl SequenceOrchestrator {
    /// Create an orchestrator toggling timers through `timers`
    #[must_use]
    pub fn new(db: Database, timers: Arc<dyn TimerControl>, settings: SequenceSettings) -> Self {
        Self {
            db,
            timers,
            settings,
            running: Arc::new(DashMap::new()),
        }
    }

    /// Whether a run currently holds the workout
    #[must_use]
    pub fn is_running(&self, workout_id: &str) -> bool {
        self.running
            .get(workout_id)
            .is_some_and(|held| matches!(held.value(), WorkoutHold::Sequence(_)))
    }

    /// Ask the running sequence of a workout to stop
    ///
    /// The pending wait wakes immediately; the run then performs its abort
    /// path and its caller receives `SEQUENCE_CANCELLED`.
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` if no sequence is running for the workout
    pub fn stop_workout_sequence(&self, workout_id: &str) -> AppResult<()> {
        let signalled = self
            .running
            .get(workout_id)
            .is_some_and(|held| match held.value() {
                WorkoutHold::Sequence(cancel) => {
                    cancel.send_replace(true);
                    true
                }
                WorkoutHold::Mutations(_) => false,
            });
        if !signalled {
            return Err(AppError::not_found(format!(
                "Running sequence for workout {workout_id}"
            ))
            .with_resource_id(workout_id));
        }
        info!(workout_id = %workout_id, "Sequence stop requested");
        Ok(())
    }

    /// Play a workout from start to finish
    ///
    /// Returns once the run is `Completed` or `Aborted`. Dropping the returned
    /// future mid-run still converges the tree: emergency stop then runs in the
    /// background and the workout stays held until it finishes.
    ///
    /// # Errors
    ///
    /// Returns `SEQUENCE_CONFLICT` if the workout is already being played,
    /// otherwise the error that aborted the run (after emergency stop)
    pub async fn start_workout_sequence(
        &self,
        workout_id: &str,
        observer: &dyn SequenceObserver,
    ) -> AppResult<SequenceReport> {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let mut claim = self.register(workout_id, cancel_tx)?;

        let timer = OperationTimer::start(format!("sequence {workout_id}"));
        let mut progress = RunProgress::new(workout_id, observer);
        info!(workout_id = %workout_id, "Sequence started");

        match self.play(&mut progress, &mut cancel_rx).await {
            Ok(()) => {
                progress.enter(SequenceState::Completed, None, None);
                let report = progress.report(timer.finish());
                info!(
                    workout_id = %workout_id,
                    exercises = report.exercises_completed,
                    sets = report.sets_completed,
                    elapsed_ms = report.elapsed_ms,
                    "Sequence completed"
                );
                claim.finish_run();
                Ok(report)
            }
            Err(err) => {
                let interrupted = progress.state;
                self.emergency_stop(workout_id, observer).await;
                progress.enter(SequenceState::Aborted, None, None);
                if err.code == ErrorCode::SequenceCancelled {
                    info!(workout_id = %workout_id, interrupted = ?interrupted, "Sequence stopped");
                } else {
                    error!(
                        workout_id = %workout_id,
                        interrupted = ?interrupted,
                        error.code = ?err.code,
                        "Sequence aborted: {err}"
                    );
                }
                claim.finish_run();
                Err(err)
            }
        }
    }

    fn register(
        &self,
        workout_id: &str,
        cancel: watch::Sender<bool>,
    ) -> AppResult<WorkoutClaim> {
        match self.running.entry(workout_id.to_owned()) {
            Entry::Occupied(held) => {
                warn!(workout_id = %workout_id, "Rejected sequence start on a held workout");
                match held.get() {
                    WorkoutHold::Sequence(_) => Err(AppError::sequence_conflict(workout_id)),
                    WorkoutHold::Mutations(_) => Err(AppError::workout_busy(workout_id)),
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(WorkoutHold::Sequence(cancel));
                Ok(self.claim(workout_id, Some(self.clone())))
            }
        }
    }

    /// Hold a workout for a structural change (update or delete)
    ///
    /// Concurrent mutations share the hold; a sequence start fails while it
    /// is held. Keep the claim alive until the change has committed.
    ///
    /// # Errors
    ///
    /// Returns `SEQUENCE_CONFLICT` while a sequence is playing the workout
    pub fn claim_for_mutation(&self, workout_id: &str) -> AppResult<WorkoutClaim> {
        match self.running.entry(workout_id.to_owned()) {
            Entry::Occupied(mut held) => match held.get_mut() {
                WorkoutHold::Sequence(_) => Err(AppError::sequence_conflict(workout_id)),
                WorkoutHold::Mutations(count) => {
                    *count += 1;
                    Ok(self.claim(workout_id, None))
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(WorkoutHold::Mutations(1));
                Ok(self.claim(workout_id, None))
            }
        }
    }

    fn claim(&self, workout_id: &str, unfinished_run: Option<Self>) -> WorkoutClaim {
        WorkoutClaim {
            running: Arc::clone(&self.running),
            workout_id: workout_id.to_owned(),
            unfinished_run,
        }
    }

    async fn play(
        &self,
        progress: &mut RunProgress<'_>,
        cancel: &mut watch::Receiver<bool>,
    ) -> AppResult<()> {
        let workout_id = progress.workout_id;
        let workout = self.db.fetch_workout(workout_id).await?;

        Self::ensure_not_stopped(workout_id, cancel)?;
        self.timers.set_workout_timer(workout_id, true).await?;
        progress.enter(SequenceState::WorkoutActive, None, None);

        for exercise in &workout.exercises {
            Self::ensure_not_stopped(workout_id, cancel)?;
            self.timers
                .set_exercise_timer(workout_id, &exercise.id, true)
                .await?;
            progress.enter(SequenceState::ExerciseActive, Some(&exercise.id), None);

            for set in &exercise.sets {
                Self::ensure_not_stopped(workout_id, cancel)?;
                self.timers
                    .set_set_timer(workout_id, &exercise.id, &set.id, true)
                    .await?;
                progress.enter(SequenceState::SetActive, Some(&exercise.id), Some(&set.id));
                self.suspend(progress, SuspendPhase::Work, set.duration_secs, &set.id, cancel)
                    .await?;

                self.timers
                    .set_set_timer(workout_id, &exercise.id, &set.id, false)
                    .await?;
                progress.enter(SequenceState::Resting, Some(&exercise.id), Some(&set.id));
                let rest = set.rest_secs(self.settings.default_transition_secs);
                self.suspend(progress, SuspendPhase::Rest, rest, &set.id, cancel)
                    .await?;

                progress.sets_completed += 1;
            }

            self.timers
                .set_exercise_timer(workout_id, &exercise.id, false)
                .await?;
            progress.exercises_completed += 1;
            progress.enter(SequenceState::WorkoutActive, Some(&exercise.id), None);
        }

        self.timers.set_workout_timer(workout_id, false).await?;
        Ok(())
    }

    fn ensure_not_stopped(workout_id: &str, cancel: &watch::Receiver<bool>) -> AppResult<()> {
        if *cancel.borrow() {
            Err(AppError::cancelled(workout_id))
        } else {
            Ok(())
        }
    }

    /// Wait out `seconds` of programmed time unless a stop arrives first
    async fn suspend(
        &self,
        progress: &RunProgress<'_>,
        phase: SuspendPhase,
        seconds: u64,
        set_id: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> AppResult<()> {
        progress.observer.on_event(&SequenceEvent::Suspended {
            phase,
            seconds,
            set_id: set_id.to_owned(),
        });
        Self::ensure_not_stopped(progress.workout_id, cancel)?;

        let wait = self.settings.wall_clock(seconds);
        if wait == Duration::ZERO {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(wait) => Ok(()),
            _ = cancel.wait_for(|stopped| *stopped) => {
                debug!(workout_id = %progress.workout_id, set_id = %set_id, phase = ?phase, "Wait cut short by stop request");
                Err(AppError::cancelled(progress.workout_id))
            }
        }
    }

    /// Best-effort convergence of the whole tree to inactive
    ///
    /// Never fails: problems are logged so they cannot mask the error that
    /// triggered the abort.
    async fn emergency_stop(&self, workout_id: &str, observer: &dyn SequenceObserver) {
        let converged = match self.try_emergency_stop(workout_id).await {
            Ok(deactivated) => {
                if deactivated {
                    info!(workout_id = %workout_id, "Emergency stop deactivated workout timers");
                } else {
                    debug!(workout_id = %workout_id, "Emergency stop found no active timers");
                }
                true
            }
            Err(err) if err.code == ErrorCode::ResourceNotFound => {
                warn!(workout_id = %workout_id, "Emergency stop skipped: workout no longer exists");
                true
            }
            Err(err) => {
                let failure = AppError::upstream(format!(
                    "Emergency stop for workout {workout_id} did not converge"
                ))
                .with_resource_id(workout_id)
                .with_source(err);
                error!(workout_id = %workout_id, error.code = ?failure.code, "{failure}");
                false
            }
        };
        observer.on_event(&SequenceEvent::EmergencyStop {
            workout_id: workout_id.to_owned(),
            converged,
        });
    }

    async fn try_emergency_stop(&self, workout_id: &str) -> AppResult<bool> {
        let workout = self.db.fetch_workout(workout_id).await?;
        if !workout.any_timer_active() {
            return Ok(false);
        }
        self.timers.set_workout_timer(workout_id, false).await?;
        Ok(true)
    }
}
