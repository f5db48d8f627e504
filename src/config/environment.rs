// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Loads persistence bounds, purge batch size and sequence pacing from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::config::database::DatabaseUrl;
use crate::constants::{env_vars, purge, sequence, transactions};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database location
    pub url: DatabaseUrl,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DatabaseUrl::Memory,
            max_connections: transactions::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Bounds applied to every persistence transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLimits {
    /// How long to wait for the transaction to be acquired
    pub max_wait: Duration,
    /// How long the transaction body plus commit may take
    pub timeout: Duration,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(transactions::DEFAULT_MAX_WAIT_MS),
            timeout: Duration::from_millis(transactions::DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Sequence playback pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    /// Rest between sets when a set has no transition time of its own
    pub default_transition_secs: u64,
    /// Wall-clock length of one programmed second
    pub tick: Duration,
}

impl SequenceSettings {
    /// Wall-clock duration of `seconds` programmed seconds
    #[must_use]
    pub fn wall_clock(&self, seconds: u64) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(seconds).unwrap_or(u32::MAX))
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            default_transition_secs: sequence::DEFAULT_TRANSITION_SECS,
            tick: Duration::from_millis(sequence::DEFAULT_TICK_MS),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Transaction wait/timeout bounds
    pub transactions: TransactionLimits,
    /// Sets deleted per statement when purging
    pub purge_batch_size: u32,
    /// Sequence playback pacing
    pub sequence: SequenceSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            transactions: TransactionLimits::default(),
            purge_batch_size: purge::DEFAULT_BATCH_SIZE,
            sequence: SequenceSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed or is out of range
    pub fn from_env() -> AppResult<Self> {
        let url = env::var(env_vars::DATABASE_URL)
            .map_or_else(|_| Ok(DatabaseUrl::Memory), |raw| DatabaseUrl::parse_url(&raw))?;

        let config = Self {
            database: DatabaseConfig {
                url,
                max_connections: parse_env(
                    env_vars::DATABASE_MAX_CONNECTIONS,
                    transactions::DEFAULT_MAX_CONNECTIONS,
                )?,
            },
            transactions: TransactionLimits {
                max_wait: Duration::from_millis(parse_env(
                    env_vars::TRANSACTION_MAX_WAIT_MS,
                    transactions::DEFAULT_MAX_WAIT_MS,
                )?),
                timeout: Duration::from_millis(parse_env(
                    env_vars::TRANSACTION_TIMEOUT_MS,
                    transactions::DEFAULT_TIMEOUT_MS,
                )?),
            },
            purge_batch_size: parse_env(env_vars::PURGE_BATCH_SIZE, purge::DEFAULT_BATCH_SIZE)?,
            sequence: SequenceSettings {
                default_transition_secs: parse_env(
                    env_vars::DEFAULT_TRANSITION_SECS,
                    sequence::DEFAULT_TRANSITION_SECS,
                )?,
                tick: Duration::from_millis(parse_env(
                    env_vars::SEQUENCE_TICK_MS,
                    sequence::DEFAULT_TICK_MS,
                )?),
            },
        };

        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    /// Reject values the engine cannot operate with
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting
    pub fn validate(&self) -> AppResult<()> {
        if self.purge_batch_size == 0 {
            return Err(AppError::config("PURGE_BATCH_SIZE must be at least 1"));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::config("DATABASE_MAX_CONNECTIONS must be at least 1"));
        }
        if self.transactions.max_wait.is_zero() || self.transactions.timeout.is_zero() {
            return Err(AppError::config(
                "Transaction wait and timeout bounds must be non-zero",
            ));
        }
        Ok(())
    }

    fn log_summary(&self) {
        info!(
            database.url = %self.database.url,
            database.max_connections = self.database.max_connections,
            tx.max_wait_ms = self.transactions.max_wait.as_millis() as u64,
            tx.timeout_ms = self.transactions.timeout.as_millis() as u64,
            purge.batch_size = self.purge_batch_size,
            sequence.default_transition_secs = self.sequence.default_transition_secs,
            sequence.tick_ms = self.sequence.tick.as_millis() as u64,
            "Configuration loaded"
        );
    }
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_scales_by_tick() {
        let settings = SequenceSettings {
            default_transition_secs: 30,
            tick: Duration::from_millis(10),
        };
        assert_eq!(settings.wall_clock(5), Duration::from_millis(50));
        assert_eq!(settings.wall_clock(0), Duration::ZERO);
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transactions.max_wait, Duration::from_secs(10));
        assert_eq!(config.transactions.timeout, Duration::from_secs(10));
        assert_eq!(config.sequence.default_transition_secs, 30);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = ServerConfig {
            purge_batch_size: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
