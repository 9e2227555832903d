// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable run-history storage.
//!
//! The state file is a pretty-printed JSON mapping from event identity to
//! [`RunHistory`], kept human-inspectable so operators can read and, at a
//! pinch, edit it. Writes go through a temp file plus rename so a crash
//! mid-write never leaves a torn file for the next startup to read.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use gantry_scheduler_core::RunHistory;
use tracing::{debug, warn};

use crate::error::{Result, SchedulerError};

/// Loads and saves the per-event run-history file.
#[derive(Debug, Clone)]
pub struct StateStore {
	path: PathBuf,
}

impl StateStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read the state file.
	///
	/// A missing file is an empty state (it is created lazily on first
	/// save). A malformed file is logged and treated as empty rather than
	/// aborting startup.
	pub async fn load(&self) -> BTreeMap<String, RunHistory> {
		let raw = match tokio::fs::read_to_string(&self.path).await {
			Ok(raw) => raw,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "No state file yet, starting empty");
				return BTreeMap::new();
			}
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Failed to read state file, starting empty");
				return BTreeMap::new();
			}
		};

		match serde_json::from_str(&raw) {
			Ok(map) => map,
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Malformed state file, starting empty");
				BTreeMap::new()
			}
		}
	}

	/// Atomically replace the state file with `histories`.
	pub async fn save(&self, histories: &BTreeMap<String, RunHistory>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				tokio::fs::create_dir_all(parent).await?;
			}
		}

		let json = serde_json::to_string_pretty(histories)?;
		let tmp_path = self.path.with_extension("json.tmp");
		tokio::fs::write(&tmp_path, &json).await?;
		tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
			SchedulerError::StateSave(format!(
				"renaming {} into place: {e}",
				tmp_path.display()
			))
		})?;

		debug!(path = %self.path.display(), entries = histories.len(), "State file saved");
		Ok(())
	}
}

/// Advisory cross-process guard for the state file.
///
/// Opt-in: multi-worker hosts that point several processes at one state file
/// can enable it so only the first scheduler instance comes up. The lock is
/// held for the scheduler's lifetime and released on drop.
#[derive(Debug)]
pub(crate) struct StateLock {
	_file: File,
}

impl StateLock {
	pub fn acquire(state_path: &Path) -> Result<Self> {
		let lock_path = state_path.with_extension("lock");
		if let Some(parent) = lock_path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let file = OpenOptions::new()
			.create(true)
			.read(true)
			.write(true)
			.open(&lock_path)?;
		file.try_lock_exclusive().map_err(|_| {
			SchedulerError::StateLocked(lock_path.display().to_string())
		})?;
		Ok(Self { _file: file })
	}
}
