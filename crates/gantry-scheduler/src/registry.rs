// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event registrations and the ordered registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gantry_cron::CronExpression;
use gantry_scheduler_core::{EventSnapshot, EventSpec, EventTarget, RunHistory};

use crate::error::{Result, SchedulerError};

/// One registered scheduled or manually-triggerable event.
///
/// Created from an [`EventSpec`] at registration time; the registration
/// itself lives only for the process lifetime, while its [`RunHistory`] is
/// what gets persisted.
#[derive(Debug, Clone)]
pub struct EventRegistration {
	at: Option<CronExpression>,
	trigger: Option<String>,
	target: EventTarget,
	auto_run: bool,
	declarative: bool,
	history: RunHistory,
}

impl EventRegistration {
	/// Validate a spec and build a registration from it.
	///
	/// A spec must carry a schedule, a non-empty trigger name, or both.
	pub(crate) fn from_spec(spec: EventSpec, declarative: bool) -> Result<Self> {
		if spec.at.is_none() && spec.trigger.is_none() {
			return Err(SchedulerError::Validation(format!(
				"event {:?} supplies neither `at` nor `trigger`",
				spec.event.identity()
			)));
		}
		if let Some(trigger) = &spec.trigger {
			if trigger.trim().is_empty() {
				return Err(SchedulerError::Validation(format!(
					"event {:?} has an empty trigger name",
					spec.event.identity()
				)));
			}
		}
		let at = spec.at.as_deref().map(CronExpression::parse).transpose()?;

		Ok(Self {
			at,
			trigger: spec.trigger,
			target: spec.event,
			auto_run: spec.auto_run,
			declarative,
			history: RunHistory::default(),
		})
	}

	pub fn identity(&self) -> &str {
		self.target.identity()
	}

	pub fn at(&self) -> Option<&CronExpression> {
		self.at.as_ref()
	}

	pub fn trigger(&self) -> Option<&str> {
		self.trigger.as_deref()
	}

	pub fn target(&self) -> &EventTarget {
		&self.target
	}

	pub fn auto_run(&self) -> bool {
		self.auto_run
	}

	pub fn history(&self) -> &RunHistory {
		&self.history
	}

	pub(crate) fn history_mut(&mut self) -> &mut RunHistory {
		&mut self.history
	}

	/// Recompute `next_run` strictly after `now` in the scheduling time
	/// zone. Manual-trigger-only entries carry no next run.
	pub(crate) fn reschedule(&mut self, now: DateTime<Utc>, tz: Tz) -> Result<()> {
		self.history.next_run = match &self.at {
			Some(expr) => Some(expr.next_after(now, tz)?),
			None => None,
		};
		Ok(())
	}

	pub fn snapshot(&self) -> EventSnapshot {
		EventSnapshot {
			identity: self.identity().to_string(),
			at: self.at.as_ref().map(|a| a.source().to_string()),
			trigger: self.trigger.clone(),
			auto_run: self.auto_run,
			last_run: self.history.last_run,
			last_output: self.history.last_output,
			next_run: self.history.next_run,
		}
	}
}

/// Ordered collection of registrations.
///
/// Order is registration order; declarative entries append after
/// programmatic ones and keep their file order across reloads.
#[derive(Debug, Default)]
pub(crate) struct Registry {
	entries: Vec<EventRegistration>,
}

impl Registry {
	fn position(&self, identity: &str) -> Option<usize> {
		self.entries.iter().position(|e| e.identity() == identity)
	}

	/// Insert or replace by identity.
	///
	/// Re-registering replaces the schedule, trigger, and auto_run flag in
	/// place but preserves the prior entry's run history. Fresh entries pick
	/// up any persisted history for their identity from `saved`.
	pub fn upsert(
		&mut self,
		mut registration: EventRegistration,
		saved: &BTreeMap<String, RunHistory>,
	) -> EventSnapshot {
		match self.position(registration.identity()) {
			Some(index) => {
				registration.history = self.entries[index].history.clone();
				self.entries[index] = registration;
				self.entries[index].snapshot()
			}
			None => {
				if let Some(history) = saved.get(registration.identity()) {
					registration.history = history.clone();
				}
				self.entries.push(registration);
				self.entries[self.entries.len() - 1].snapshot()
			}
		}
	}

	/// Reconcile a freshly-loaded declarative set into the registry.
	///
	/// Declarative entries whose identity vanished from the file are
	/// removed; the rest upsert as usual, so an entry that also exists
	/// programmatically is updated in place with its history intact.
	/// Returns whether any entry was removed, so the caller knows the
	/// persisted histories need rewriting.
	pub fn reconcile_declarative(
		&mut self,
		incoming: Vec<EventRegistration>,
		saved: &BTreeMap<String, RunHistory>,
	) -> bool {
		let before = self.entries.len();
		self.entries.retain(|e| {
			!e.declarative || incoming.iter().any(|n| n.identity() == e.identity())
		});
		let removed = self.entries.len() != before;
		for registration in incoming {
			self.upsert(registration, saved);
		}
		removed
	}

	pub fn find_by_trigger(&self, name: &str) -> Option<&EventRegistration> {
		// Exact, case-sensitive match.
		self.entries.iter().find(|e| e.trigger() == Some(name))
	}

	/// Identities of scheduled entries due at or overdue for `now`.
	pub fn due_at(&self, now: DateTime<Utc>) -> Vec<String> {
		self.entries
			.iter()
			.filter(|e| e.at.is_some())
			.filter(|e| matches!(e.history.next_run, Some(next) if next <= now))
			.map(|e| e.identity().to_string())
			.collect()
	}

	pub fn get(&self, identity: &str) -> Option<&EventRegistration> {
		self.entries.iter().find(|e| e.identity() == identity)
	}

	pub fn get_mut(&mut self, identity: &str) -> Option<&mut EventRegistration> {
		self.entries.iter_mut().find(|e| e.identity() == identity)
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EventRegistration> {
		self.entries.iter_mut()
	}

	/// Merge persisted histories into matching registrations.
	pub fn apply_state(&mut self, saved: &BTreeMap<String, RunHistory>) {
		for entry in &mut self.entries {
			if let Some(history) = saved.get(entry.identity()) {
				entry.history = history.clone();
			}
		}
	}

	/// Current histories worth persisting, keyed by identity.
	pub fn histories(&self) -> BTreeMap<String, RunHistory> {
		self.entries
			.iter()
			.filter(|e| !e.history.is_empty())
			.map(|e| (e.identity().to_string(), e.history.clone()))
			.collect()
	}

	pub fn snapshots(&self) -> Vec<EventSnapshot> {
		self.entries.iter().map(EventRegistration::snapshot).collect()
	}
}
