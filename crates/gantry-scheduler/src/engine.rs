// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The scheduler engine.
//!
//! The engine does not own a timer. Hosts call
//! [`Scheduler::on_opportunity`] once per inbound unit of work; the engine
//! self-throttles to one real check per interval and serializes the whole
//! check-execute-record-persist span behind a single mutex, so overlapping
//! opportunities cannot double-fire a due event. Opportunities that find a
//! cycle in flight, or that arrive inside the throttle window, return
//! immediately with no side effects.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use gantry_scheduler_core::{
	Activation, EventContext, EventDispatcher, EventError, EventSnapshot, EventSpec, EventTarget,
	RunHistory,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::authorize::AllowList;
use crate::config::ConfigSource;
use crate::error::{Result, SchedulerError};
use crate::registry::{EventRegistration, Registry};
use crate::state::{StateLock, StateStore};

const DEFAULT_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Builder for constructing a [`Scheduler`].
pub struct SchedulerBuilder {
	state_file: Option<PathBuf>,
	config_file: Option<PathBuf>,
	interval: StdDuration,
	time_zone: Tz,
	allow_entries: Vec<String>,
	allow_list: Option<AllowList>,
	dispatcher: Option<Arc<dyn EventDispatcher>>,
	log_summary: bool,
	exclusive: bool,
}

impl SchedulerBuilder {
	pub fn new() -> Self {
		Self {
			state_file: None,
			config_file: None,
			interval: DEFAULT_INTERVAL,
			time_zone: Tz::UTC,
			allow_entries: Vec::new(),
			allow_list: None,
			dispatcher: None,
			log_summary: true,
			exclusive: false,
		}
	}

	/// Sets the run-history file path. Required.
	pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.state_file = Some(path.into());
		self
	}

	/// Sets the declarative YAML event-list path.
	pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.config_file = Some(path.into());
		self
	}

	/// Sets the minimum spacing between real checks. Default one minute.
	pub fn interval(mut self, interval: StdDuration) -> Self {
		self.interval = interval;
		self
	}

	/// Sets the time zone schedules are evaluated in. Default UTC.
	pub fn time_zone(mut self, tz: Tz) -> Self {
		self.time_zone = tz;
		self
	}

	/// Adds an allow-list entry: a CIDR network or bare address. Entries
	/// given here replace the loopback-only default.
	pub fn allow(mut self, entry: impl Into<String>) -> Self {
		self.allow_entries.push(entry.into());
		self
	}

	/// Sets the allow-list wholesale, overriding [`Self::allow`] entries.
	pub fn allow_list(mut self, list: AllowList) -> Self {
		self.allow_list = Some(list);
		self
	}

	/// Sets the host collaborator that resolves handler-path targets.
	pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
		self.dispatcher = Some(dispatcher);
		self
	}

	/// Whether successful executions are logged at info level. Failures are
	/// always logged regardless.
	pub fn log_summary(mut self, enabled: bool) -> Self {
		self.log_summary = enabled;
		self
	}

	/// Hold an advisory cross-process lock beside the state file, so a
	/// multi-worker host cannot bring up two schedulers against it. Off by
	/// default: check cycles within one process are already serialized.
	pub fn exclusive(mut self, enabled: bool) -> Self {
		self.exclusive = enabled;
		self
	}

	pub fn build(self) -> Result<Scheduler> {
		let state_file = self
			.state_file
			.ok_or_else(|| SchedulerError::Config("state_file is required".to_string()))?;

		let lock = if self.exclusive {
			Some(StateLock::acquire(&state_file)?)
		} else {
			None
		};

		let interval = Duration::from_std(self.interval)
			.map_err(|_| SchedulerError::Config("interval out of range".to_string()))?;
		if interval <= Duration::zero() {
			return Err(SchedulerError::Config("interval must be positive".to_string()));
		}

		let allow_list = match self.allow_list {
			Some(list) => list,
			None if self.allow_entries.is_empty() => AllowList::default(),
			None => AllowList::parse(&self.allow_entries)?,
		};

		Ok(Scheduler {
			inner: Arc::new(Inner {
				interval,
				time_zone: self.time_zone,
				allow_list,
				log_summary: self.log_summary,
				dispatcher: self.dispatcher,
				_lock: lock,
				store: StateStore::new(state_file),
				cycle: Mutex::new(CycleState {
					registry: Registry::default(),
					source: self.config_file.map(ConfigSource::new),
					saved: BTreeMap::new(),
					state_loaded: false,
					last_check: None,
				}),
			}),
		})
	}
}

impl Default for SchedulerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// The request-driven scheduling engine.
///
/// Cheap to clone; clones share the registry, throttle, and state file.
#[derive(Clone)]
pub struct Scheduler {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scheduler")
			.field("interval", &self.inner.interval)
			.field("time_zone", &self.inner.time_zone)
			.finish_non_exhaustive()
	}
}

struct Inner {
	interval: Duration,
	time_zone: Tz,
	allow_list: AllowList,
	log_summary: bool,
	dispatcher: Option<Arc<dyn EventDispatcher>>,
	/// Held for the scheduler's lifetime when `exclusive` is on.
	_lock: Option<StateLock>,
	store: StateStore,
	cycle: Mutex<CycleState>,
}

/// Everything the check cycle mutates, guarded by one mutex.
struct CycleState {
	registry: Registry,
	source: Option<ConfigSource>,
	/// Last known persisted histories, used to seed registrations whose
	/// identity survived a restart.
	saved: BTreeMap<String, RunHistory>,
	state_loaded: bool,
	last_check: Option<DateTime<Utc>>,
}

impl Scheduler {
	pub fn builder() -> SchedulerBuilder {
		SchedulerBuilder::new()
	}

	/// Register an event programmatically.
	///
	/// Re-registering the same event target replaces its schedule, trigger,
	/// and auto_run flag while preserving its run history.
	pub async fn register(&self, spec: EventSpec) -> Result<EventSnapshot> {
		let registration = EventRegistration::from_spec(spec, false)?;
		let mut cycle = self.inner.cycle.lock().await;
		let cycle = &mut *cycle;
		Ok(cycle.registry.upsert(registration, &cycle.saved))
	}

	/// Give the scheduler a chance to run.
	///
	/// Call once per inbound unit of work with the current time, the
	/// caller's source address if known, and the value of the
	/// [`gantry_scheduler_core::TRIGGER_PARAM`] query parameter if present.
	/// Never raises to the caller: all internal failures degrade and log.
	pub async fn on_opportunity(
		&self,
		now: DateTime<Utc>,
		remote_addr: Option<IpAddr>,
		trigger_name: Option<&str>,
	) {
		// A cycle already in flight means this opportunity is a no-op; the
		// next one will catch anything due.
		let Ok(mut cycle) = self.inner.cycle.try_lock() else {
			return;
		};
		if let Some(last) = cycle.last_check {
			if now.signed_duration_since(last) < self.inner.interval {
				return;
			}
		}
		cycle.last_check = Some(now);
		self.check(&mut cycle, now, remote_addr, trigger_name).await;
	}

	/// Read-only snapshot of every registration, in registration order.
	/// Does not trigger a check.
	pub async fn snapshot(&self) -> Vec<EventSnapshot> {
		self.inner.cycle.lock().await.registry.snapshots()
	}

	async fn check(
		&self,
		cycle: &mut CycleState,
		now: DateTime<Utc>,
		remote_addr: Option<IpAddr>,
		trigger_name: Option<&str>,
	) {
		let tz = self.inner.time_zone;
		let mut changed = false;

		// First real check: merge persisted run histories.
		if !cycle.state_loaded {
			cycle.saved = self.inner.store.load().await;
			cycle.registry.apply_state(&cycle.saved);
			cycle.state_loaded = true;
		}

		// Reload the declarative list if its file moved.
		if let Some(source) = cycle.source.as_mut() {
			if let Some(specs) = source.reload_if_stale().await {
				let mut incoming = Vec::with_capacity(specs.len());
				for spec in specs {
					let identity = spec.event.identity().to_string();
					match EventRegistration::from_spec(spec, true) {
						Ok(registration) => incoming.push(registration),
						Err(e) => {
							warn!(event = %identity, error = %e, "Skipping invalid declarative entry")
						}
					}
				}
				// A removed entry must also leave the state file.
				if cycle.registry.reconcile_declarative(incoming, &cycle.saved) {
					changed = true;
				}
			}
		}

		// Scheduled entries without a next run get one computed from now.
		// They become due on a later cycle, never this one.
		for entry in cycle.registry.iter_mut() {
			if entry.at().is_none() || entry.history().next_run.is_some() {
				continue;
			}
			let identity = entry.identity().to_string();
			match entry.reschedule(now, tz) {
				Ok(()) => changed = true,
				Err(e) => error!(event = %identity, error = %e, "Failed to compute next run"),
			}
		}

		// Decide what runs. Authorization applies to auto_run=false
		// schedules and to manual triggers; plain due schedules skip it.
		let allowed = self.inner.allow_list.is_allowed(remote_addr);
		let mut plan: Vec<(String, Activation)> = Vec::new();

		for identity in cycle.registry.due_at(now) {
			let Some(entry) = cycle.registry.get(&identity) else {
				continue;
			};
			if entry.auto_run() || allowed {
				plan.push((identity, Activation::Schedule));
			} else {
				// Stays pending, untouched, until an authorized caller
				// provides an opportunity.
				debug!(event = %identity, "Due event awaiting an authorized caller");
			}
		}

		if let Some(name) = trigger_name {
			match cycle.registry.find_by_trigger(name) {
				Some(entry) if allowed => {
					let identity = entry.identity().to_string();
					if !plan.iter().any(|(id, _)| *id == identity) {
						plan.push((identity, Activation::Trigger));
					}
				}
				Some(entry) => {
					debug!(event = %entry.identity(), trigger = name, "Manual trigger denied");
				}
				None => debug!(trigger = name, "No event registered for trigger"),
			}
		}

		// Execute sequentially. One failing event never blocks the rest and
		// never reaches the host.
		for (identity, activation) in plan {
			let Some(entry) = cycle.registry.get(&identity) else {
				continue;
			};
			let target = entry.target().clone();
			let ctx = EventContext {
				now,
				remote_addr,
				activation,
			};

			let outcome = self.execute(&target, &ctx).await;
			let success = outcome.is_ok();
			match outcome {
				Ok(()) if self.inner.log_summary => info!(event = %identity, "Event executed"),
				Ok(()) => {}
				Err(e) => error!(event = %identity, error = %e, "Event execution failed"),
			}

			if let Some(entry) = cycle.registry.get_mut(&identity) {
				entry.history_mut().last_run = Some(now);
				entry.history_mut().last_output = Some(success);
				if let Err(e) = entry.reschedule(now, tz) {
					error!(event = %identity, error = %e, "Failed to compute next run");
					entry.history_mut().next_run = None;
				}
				changed = true;
			}
		}

		if changed {
			let histories = cycle.registry.histories();
			match self.inner.store.save(&histories).await {
				Ok(()) => cycle.saved = histories,
				Err(e) => {
					error!(path = %self.inner.store.path().display(), error = %e, "Failed to persist scheduler state")
				}
			}
		}
	}

	async fn execute(
		&self,
		target: &EventTarget,
		ctx: &EventContext,
	) -> std::result::Result<(), EventError> {
		match target {
			EventTarget::Handler(path) => match &self.inner.dispatcher {
				Some(dispatcher) => dispatcher.dispatch(path, ctx).await,
				None => Err(EventError::new(format!(
					"no dispatcher configured for handler {path}"
				))),
			},
			EventTarget::Callable { event, .. } => event.run(ctx).await,
		}
	}
}
