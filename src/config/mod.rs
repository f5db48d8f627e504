// ABOUTME: Configuration management module for centralized engine settings
// ABOUTME: Exposes environment-driven server configuration and database URL parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **Environment**: [`environment::ServerConfig`] loaded from environment variables
//! - **Database**: type-safe [`database::DatabaseUrl`] parsing

/// Database connection configuration
pub mod database;
/// Environment and server configuration
pub mod environment;
