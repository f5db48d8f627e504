// ABOUTME: Utility modules for common functionality across the application
// ABOUTME: Contains the structured duration measurement helper used by timer services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Elapsed-time measurement for operation diagnostics
pub mod timing;
