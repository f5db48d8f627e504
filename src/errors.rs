// ABOUTME: Unified error type, error codes, and HTTP status mapping for the workout timer engine
// ABOUTME: Converts persistence failures into typed NotFound/Timeout/Database errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the crate returns [`AppResult`]. Callers branch on
//! [`ErrorCode`] rather than on message text; the code also carries the HTTP
//! status the (external) transport layer should use.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors
    /// Malformed input, never retried
    InvalidInput,
    /// Referenced entity (or parent/child pairing) does not exist
    ResourceNotFound,
    /// A sequence is already running for the workout
    SequenceConflict,
    /// Child timer activation attempted while its parent timer is off
    ParentTimerInactive,
    /// The running sequence was stopped on request
    SequenceCancelled,

    // Server errors
    /// Persistence transaction exceeded its wait or execution bound
    TransactionTimeout,
    /// Best-effort collaborator (emergency stop) did not converge
    UpstreamDependency,
    /// Transactional failure other than a timeout
    DatabaseError,
    /// Configuration could not be loaded
    ConfigInvalid,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::ResourceNotFound => 404,
            Self::SequenceConflict | Self::ParentTimerInactive | Self::SequenceCancelled => 409,
            Self::UpstreamDependency => 502,
            Self::TransactionTimeout => 504,
            Self::DatabaseError | Self::ConfigInvalid | Self::InternalError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::SequenceConflict => "A workout sequence is already running",
            Self::ParentTimerInactive => "The parent timer is not active",
            Self::SequenceCancelled => "The workout sequence was stopped",
            Self::TransactionTimeout => "The database transaction timed out",
            Self::UpstreamDependency => "A dependent operation failed to complete",
            Self::DatabaseError => "Database operation failed",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal server error occurred",
        }
    }

    /// Whether the failure is attributable to the caller
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Resource ID if applicable
    pub resource_id: Option<String>,
    /// Operation being performed when the error occurred
    pub operation: Option<String>,
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Record which operation failed
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// A sequence already holds the workout
    pub fn sequence_conflict(workout_id: &str) -> Self {
        Self::new(
            ErrorCode::SequenceConflict,
            format!("Workout {workout_id} already has a sequence in progress"),
        )
        .with_resource_id(workout_id)
    }

    /// Workout is being restructured and cannot start playing yet
    #[must_use]
    pub fn workout_busy(workout_id: &str) -> Self {
        Self::new(
            ErrorCode::SequenceConflict,
            format!("Workout {workout_id} is being modified; retry once the change commits"),
        )
        .with_resource_id(workout_id)
    }

    /// Parent timer must be active first
    pub fn parent_inactive(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParentTimerInactive, message)
    }

    /// Sequence stopped on request
    pub fn cancelled(workout_id: &str) -> Self {
        Self::new(
            ErrorCode::SequenceCancelled,
            format!("Sequence for workout {workout_id} was stopped"),
        )
        .with_resource_id(workout_id)
    }

    /// Transaction exceeded its bound
    pub fn transaction_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransactionTimeout, message)
    }

    /// Best-effort dependency failure
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamDependency, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        let app_error = match &error {
            sqlx::Error::RowNotFound => Self::not_found("Record"),
            sqlx::Error::PoolTimedOut => {
                Self::transaction_timeout("Timed out waiting for a database connection")
            }
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                Self::invalid_input(format!("Constraint violation: {}", db_err.message()))
            }
            sqlx::Error::Database(db_err) if is_busy_message(db_err.message()) => {
                Self::transaction_timeout(format!("Database busy: {}", db_err.message()))
            }
            other => Self::database(other.to_string()),
        };
        app_error.with_source(error)
    }
}

fn is_busy_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked") || lower.contains("busy")
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_input(format!("Invalid JSON: {error}")).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::SequenceConflict.http_status(), 409);
        assert_eq!(ErrorCode::TransactionTimeout.http_status(), 504);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
        assert!(ErrorCode::SequenceConflict.is_client_error());
        assert!(!ErrorCode::DatabaseError.is_client_error());
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ParentTimerInactive).unwrap();
        assert_eq!(json, "\"PARENT_TIMER_INACTIVE\"");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert!(error.source.is_some());
    }

    #[test]
    fn test_pool_timeout_maps_to_transaction_timeout() {
        let error = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.code, ErrorCode::TransactionTimeout);
    }

    #[test]
    fn test_display_includes_description_and_message() {
        let error = AppError::not_found("Workout abc").with_resource_id("abc");
        assert_eq!(
            error.to_string(),
            "The requested resource was not found: Workout abc not found"
        );
        assert_eq!(error.context.resource_id.as_deref(), Some("abc"));
    }
}
