// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run history and introspection types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable per-event run record.
///
/// This is the value persisted in the state file, keyed by event identity.
/// A `next_run` in the past means the event is overdue and fires once at the
/// next opportunity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHistory {
	/// When the event last executed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_run: Option<DateTime<Utc>>,
	/// Whether the last execution succeeded.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_output: Option<bool>,
	/// The next scheduled execution. Absent for manual-trigger-only entries.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_run: Option<DateTime<Utc>>,
}

impl RunHistory {
	pub fn is_empty(&self) -> bool {
		self.last_run.is_none() && self.last_output.is_none() && self.next_run.is_none()
	}
}

/// One row of the read-only scheduler snapshot, for admin/debug views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSnapshot {
	pub identity: String,
	pub at: Option<String>,
	pub trigger: Option<String>,
	pub auto_run: bool,
	pub last_run: Option<DateTime<Utc>>,
	pub last_output: Option<bool>,
	pub next_run: Option<DateTime<Utc>>,
}
