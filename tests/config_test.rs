// ABOUTME: Tests for loading engine configuration from environment variables
// ABOUTME: Serialized because every test mutates the process environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use workout_sequencer::config::database::DatabaseUrl;
use workout_sequencer::config::environment::ServerConfig;
use workout_sequencer::constants::env_vars;
use workout_sequencer::errors::ErrorCode;

const ALL_VARS: [&str; 7] = [
    env_vars::DATABASE_URL,
    env_vars::DATABASE_MAX_CONNECTIONS,
    env_vars::PURGE_BATCH_SIZE,
    env_vars::TRANSACTION_MAX_WAIT_MS,
    env_vars::TRANSACTION_TIMEOUT_MS,
    env_vars::DEFAULT_TRANSITION_SECS,
    env_vars::SEQUENCE_TICK_MS,
];

fn clear_env() {
    for key in ALL_VARS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_when_environment_is_empty() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.database.url, DatabaseUrl::Memory);
    assert_eq!(config.purge_batch_size, 100);
    assert_eq!(config.transactions.max_wait, Duration::from_secs(10));
    assert_eq!(config.transactions.timeout, Duration::from_secs(10));
    assert_eq!(config.sequence.default_transition_secs, 30);
    assert_eq!(config.sequence.tick, Duration::from_secs(1));
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var(env_vars::DATABASE_URL, "sqlite:./data/workouts.db");
    env::set_var(env_vars::PURGE_BATCH_SIZE, "250");
    env::set_var(env_vars::TRANSACTION_MAX_WAIT_MS, "2500");
    env::set_var(env_vars::TRANSACTION_TIMEOUT_MS, " 4000 ");
    env::set_var(env_vars::DEFAULT_TRANSITION_SECS, "45");
    env::set_var(env_vars::SEQUENCE_TICK_MS, "10");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(
        config.database.url,
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/workouts.db")
        }
    );
    assert_eq!(config.purge_batch_size, 250);
    assert_eq!(config.transactions.max_wait, Duration::from_millis(2500));
    assert_eq!(config.transactions.timeout, Duration::from_millis(4000));
    assert_eq!(config.sequence.default_transition_secs, 45);
    assert_eq!(config.sequence.wall_clock(3), Duration::from_millis(30));
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    env::set_var(env_vars::PURGE_BATCH_SIZE, "lots");
    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains(env_vars::PURGE_BATCH_SIZE));

    env::set_var(env_vars::PURGE_BATCH_SIZE, "0");
    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    clear_env();
    env::set_var(env_vars::DATABASE_URL, "postgres://localhost/workouts");
    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    clear_env();
}
