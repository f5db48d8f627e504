// ABOUTME: Uniform response envelope for every workout operation
// ABOUTME: Wraps results and errors as { status, message, data, timestamp } and renders them as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Response formatting
//!
//! Every operation result leaves the engine as a [`ResponseEnvelope`]:
//!
//! ```json
//! { "status": "success", "message": "Workout timer started", "data": { ... }, "timestamp": "..." }
//! ```
//!
//! Failures use the same shape with `status: "error"` and an [`ErrorDetails`]
//! payload carrying the machine-readable code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::services::timers::TimerState;

/// Outcome marker of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
}

/// Machine-readable payload of an error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// HTTP status a transport layer should use
    pub http_status: u16,
    /// Entity the error refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// Uniform response shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Success or error
    pub status: ResponseStatus,
    /// Human-readable summary
    pub message: String,
    /// Result payload, or [`ErrorDetails`] on failure
    pub data: Option<T>,
    /// When the envelope was produced
    pub timestamp: DateTime<Utc>,
}

impl<T> ResponseEnvelope<T> {
    /// Successful envelope
    #[must_use]
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    /// Whether the envelope reports success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Convert the payload, keeping status, message and timestamp
    #[must_use]
    pub fn map_data<U>(self, convert: impl FnOnce(T) -> Option<U>) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            status: self.status,
            message: self.message,
            data: self.data.and_then(convert),
            timestamp: self.timestamp,
        }
    }
}

impl ResponseEnvelope<ErrorDetails> {
    /// Error envelope for an application error
    #[must_use]
    pub fn error(error: &AppError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: error.to_string(),
            data: Some(ErrorDetails {
                code: error.code,
                http_status: error.http_status(),
                resource_id: error.context.resource_id.clone(),
            }),
            timestamp: Utc::now(),
        }
    }
}

/// Wrap an operation result, serializing the payload to JSON
///
/// The message closure only runs on success.
#[must_use]
pub fn respond<T, F>(result: AppResult<T>, message: F) -> ResponseEnvelope<Value>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let outcome = result.and_then(|data| {
        let message = message(&data);
        Ok((message, serde_json::to_value(&data)?))
    });
    match outcome {
        Ok((message, data)) => ResponseEnvelope::success(message, data),
        Err(error) => ResponseEnvelope::error(&error)
            .map_data(|details| serde_json::to_value(details).ok()),
    }
}

/// Message for a timer toggle, e.g. "Exercise timer stopped"
#[must_use]
pub fn timer_message(state: &TimerState) -> String {
    format!(
        "{} timer {}",
        state.level.label(),
        if state.timer_active { "started" } else { "stopped" }
    )
}

/// Output serialization format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single-line JSON
    #[default]
    Json,
    /// Indented JSON for terminals
    Pretty,
}

impl OutputFormat {
    /// Parse format from string parameter (case-insensitive)
    /// Returns `Json` for unrecognized values
    #[must_use]
    pub fn from_str_param(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Render any serializable value in the given format
///
/// # Errors
///
/// Returns `INVALID_INPUT` if serialization fails
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> AppResult<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(data)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::timers::TimerLevel;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let envelope = ResponseEnvelope::success("Workout created", json!({"id": "w1"}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Workout created");
        assert_eq!(value["data"]["id"], "w1");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_error_envelope_carries_code() {
        let error = AppError::sequence_conflict("w1");
        let envelope = respond::<Value, _>(Err(error), |_| String::new());
        let value = serde_json::to_value(&envelope).unwrap();

        assert!(!envelope.is_success());
        assert_eq!(value["status"], "error");
        assert_eq!(value["data"]["code"], "SEQUENCE_CONFLICT");
        assert_eq!(value["data"]["httpStatus"], 409);
        assert_eq!(value["data"]["resourceId"], "w1");
    }

    #[test]
    fn test_timer_message() {
        let state = TimerState {
            level: TimerLevel::Exercise,
            id: "e1".to_owned(),
            timer_active: false,
            cascaded: 3,
        };
        assert_eq!(timer_message(&state), "Exercise timer stopped");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_param("PRETTY"), OutputFormat::Pretty);
        assert_eq!(OutputFormat::from_str_param("toon"), OutputFormat::Json);
        assert!(format_output(&json!({"a": 1}), OutputFormat::Pretty)
            .unwrap()
            .contains('\n'));
    }
}
