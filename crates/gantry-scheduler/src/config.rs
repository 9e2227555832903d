// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative event configuration.
//!
//! Hosts may keep an event list in a YAML file alongside programmatic
//! registrations: an ordered sequence of mappings with `at`, `trigger`,
//! `event` (a handler path; callables are not expressible here), and
//! `auto_run`. The file is re-read at most once per check interval, keyed by
//! its modification time, and a broken file never takes the scheduler down.
//!
//! ```yaml
//! - at: '0 3 * * *'
//!   event: /cron/remove_sessions
//! - trigger: send_email
//!   event: /cron/send_email
//!   auto_run: false
//! ```

use std::path::PathBuf;
use std::time::SystemTime;

use gantry_scheduler_core::{EventSpec, EventTarget};
use serde::Deserialize;
use tracing::{debug, warn};

/// One entry of the declarative event list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclaredEvent {
	#[serde(default)]
	pub at: Option<String>,
	#[serde(default)]
	pub trigger: Option<String>,
	pub event: String,
	#[serde(default = "default_auto_run")]
	pub auto_run: bool,
}

fn default_auto_run() -> bool {
	true
}

impl From<DeclaredEvent> for EventSpec {
	fn from(declared: DeclaredEvent) -> Self {
		EventSpec {
			at: declared.at,
			trigger: declared.trigger,
			event: EventTarget::handler(declared.event),
			auto_run: declared.auto_run,
		}
	}
}

/// Watches the declarative file and re-reads it when its mtime moves.
#[derive(Debug)]
pub(crate) struct ConfigSource {
	path: PathBuf,
	last_mtime: Option<SystemTime>,
}

impl ConfigSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			last_mtime: None,
		}
	}

	/// Returns the freshly-parsed event list when the file changed since the
	/// last look, `None` otherwise.
	///
	/// A file that was loaded before and has since been deleted yields an
	/// empty list once, so its entries get reconciled away. A file that
	/// fails to parse is logged and yields `None`: the previously-loaded
	/// declarative set stays in force.
	pub async fn reload_if_stale(&mut self) -> Option<Vec<EventSpec>> {
		let mtime = match tokio::fs::metadata(&self.path).await {
			Ok(meta) => meta.modified().ok(),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				if self.last_mtime.take().is_some() {
					debug!(path = %self.path.display(), "Declarative config removed, clearing entries");
					return Some(Vec::new());
				}
				return None;
			}
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Failed to stat declarative config");
				return None;
			}
		};

		if mtime == self.last_mtime {
			return None;
		}
		self.last_mtime = mtime;

		let raw = match tokio::fs::read_to_string(&self.path).await {
			Ok(raw) => raw,
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Failed to read declarative config, keeping previous entries");
				return None;
			}
		};

		match serde_yaml::from_str::<Vec<DeclaredEvent>>(&raw) {
			Ok(declared) => {
				debug!(path = %self.path.display(), entries = declared.len(), "Declarative config loaded");
				Some(declared.into_iter().map(EventSpec::from).collect())
			}
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Malformed declarative config, keeping previous entries");
				None
			}
		}
	}
}
