// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the scheduler engine.

use thiserror::Error;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors surfaced by the scheduler machinery.
///
/// These are registration/construction-time failures. Runtime problems
/// (corrupt state file, unreadable config, failing event bodies) degrade
/// gracefully inside the check cycle and are logged, never raised to the
/// host's unit of work.
#[derive(Debug, Error)]
pub enum SchedulerError {
	#[error("invalid cron expression: {0}")]
	Cron(#[from] gantry_cron::CronError),

	#[error("invalid event spec: {0}")]
	Validation(String),

	#[error("invalid allow-list entry {0:?}")]
	InvalidAllowEntry(String),

	#[error("invalid scheduler configuration: {0}")]
	Config(String),

	#[error("failed to save state file: {0}")]
	StateSave(String),

	#[error("state file is locked by another scheduler: {0}")]
	StateLocked(String),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
