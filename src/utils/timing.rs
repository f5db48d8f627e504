// ABOUTME: Structured duration measurement for toggles, purges and sequence runs
// ABOUTME: Captures a start instant per operation and reports elapsed milliseconds on completion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::{Duration, Instant};
use tracing::debug;

/// Measures one operation from construction until [`OperationTimer::finish`]
///
/// Each timer owns its start instant, so concurrent operations never share
/// or overwrite each other's measurements.
#[derive(Debug, Clone)]
pub struct OperationTimer {
    label: String,
    started: Instant,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        debug!(operation = %label, "Operation started");
        Self {
            label,
            started: Instant::now(),
        }
    }

    /// Operation label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time elapsed so far
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Milliseconds elapsed so far
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Stop timing and return the elapsed milliseconds
    #[must_use]
    pub fn finish(self) -> u64 {
        let elapsed_ms = self.elapsed_ms();
        debug!(operation = %self.label, elapsed_ms, "Operation finished");
        elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = OperationTimer::start("WorkoutTimer w1");
        std::thread::sleep(Duration::from_millis(5));
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() > first);
        assert_eq!(timer.label(), "WorkoutTimer w1");
        assert!(timer.finish() >= 10);
    }
}
