// ABOUTME: Bounded batch deletion of sets and exercises inside the caller's transaction
// ABOUTME: Deletes fixed-size pages until a short page shows the collection is empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::database::workouts;
use crate::errors::{AppError, AppResult};
use sqlx::SqliteConnection;
use tracing::debug;

/// Outcome of a purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Rows deleted
    pub deleted: u64,
    /// Paged set DELETE statements issued
    pub batches: u32,
}

impl PurgeReport {
    fn absorb(&mut self, other: Self) {
        self.deleted += other.deleted;
        self.batches += other.batches;
    }
}

/// Deletes unbounded child collections in fixed-size batches
///
/// The purger never commits: the caller deletes the parent row in the same
/// transaction, so a failed purge can never leave a parent gone with orphans
/// behind, or children gone with their parent still present.
#[derive(Debug, Clone, Copy)]
pub struct BatchPurger {
    batch_size: u32,
}

impl BatchPurger {
    /// Create a purger deleting `batch_size` rows per statement
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` for a zero batch size
    pub fn new(batch_size: u32) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::invalid_input("Purge batch size must be at least 1"));
        }
        Ok(Self { batch_size })
    }

    /// Rows deleted per statement
    #[must_use]
    pub const fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Delete every set of an exercise
    ///
    /// # Errors
    ///
    /// Returns an error if a DELETE fails
    pub async fn purge_sets_of(
        &self,
        conn: &mut SqliteConnection,
        exercise_id: &str,
    ) -> AppResult<PurgeReport> {
        let mut report = PurgeReport::default();
        loop {
            let deleted = sqlx::query(
                r"
                DELETE FROM exercise_sets
                WHERE id IN (
                    SELECT id FROM exercise_sets WHERE exercise_id = $1 LIMIT $2
                )
                ",
            )
            .bind(exercise_id)
            .bind(i64::from(self.batch_size))
            .execute(&mut *conn)
            .await?
            .rows_affected();

            report.deleted += deleted;
            report.batches += 1;
            if deleted < u64::from(self.batch_size) {
                break;
            }
        }
        debug!(
            exercise_id = %exercise_id,
            deleted = report.deleted,
            batches = report.batches,
            "Purged exercise sets"
        );
        Ok(report)
    }

    /// Delete every exercise of a workout, purging each exercise's sets first
    ///
    /// # Errors
    ///
    /// Returns an error if a DELETE fails
    pub async fn purge_exercises_of(
        &self,
        conn: &mut SqliteConnection,
        workout_id: &str,
    ) -> AppResult<PurgeReport> {
        let mut report = PurgeReport::default();
        for exercise_id in workouts::exercise_ids(conn, workout_id).await? {
            report.absorb(self.purge_sets_of(conn, &exercise_id).await?);
            report.deleted += workouts::delete_exercise_row(conn, &exercise_id).await?;
        }
        Ok(report)
    }
}
