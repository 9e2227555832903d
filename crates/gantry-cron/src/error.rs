// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for cron expression parsing and evaluation.

use thiserror::Error;

/// Result type for cron operations.
pub type Result<T> = std::result::Result<T, CronError>;

/// Errors that can occur while parsing or evaluating a cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
	#[error("expected 5 fields, got {0}")]
	WrongFieldCount(usize),

	#[error("unknown shortcut {0:?}")]
	UnknownShortcut(String),

	#[error("invalid {field} value {token:?}")]
	InvalidToken { field: &'static str, token: String },

	#[error("{field} value {value} out of range {min}-{max}")]
	OutOfRange {
		field: &'static str,
		value: u32,
		min: u32,
		max: u32,
	},

	#[error("invalid {field} range {token:?}")]
	InvalidRange { field: &'static str, token: String },

	#[error("invalid {field} step {token:?}")]
	InvalidStep { field: &'static str, token: String },

	#[error("no matching time within {0} years")]
	Unsatisfiable(u32),

	#[error("internal error: {0}")]
	Internal(String),
}
