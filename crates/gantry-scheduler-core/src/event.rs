// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event targets, specs, and the invocation traits.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure outcome of one event body.
///
/// Execution failures are a per-event result, not a control-flow escape: the
/// engine records them and moves on to the next due event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EventError {
	pub message: String,
}

impl EventError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// How an event came to run in the current check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
	/// Its schedule became due.
	Schedule,
	/// A named manual trigger on the current opportunity.
	Trigger,
}

/// Context handed to event bodies and handler dispatchers.
#[derive(Debug, Clone)]
pub struct EventContext {
	/// The instant the check cycle is running at.
	pub now: DateTime<Utc>,
	/// Source address of the opportunity's caller, when known.
	pub remote_addr: Option<IpAddr>,
	pub activation: Activation,
}

/// An in-process event body.
#[async_trait]
pub trait Event: Send + Sync {
	async fn run(&self, ctx: &EventContext) -> Result<(), EventError>;
}

/// Host collaborator that resolves `EventTarget::Handler` paths and invokes
/// whatever they point at. The engine never interprets handler paths itself.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
	async fn dispatch(&self, path: &str, ctx: &EventContext) -> Result<(), EventError>;
}

/// What a registration executes: a path reference resolved by the host's
/// [`EventDispatcher`], or an in-process callable with an explicit name.
///
/// The identity string is the merge/dedup key for registrations and the key
/// under which run history is persisted.
#[derive(Clone)]
pub enum EventTarget {
	Handler(String),
	Callable {
		name: String,
		event: Arc<dyn Event>,
	},
}

impl EventTarget {
	pub fn handler(path: impl Into<String>) -> Self {
		Self::Handler(path.into())
	}

	pub fn callable(name: impl Into<String>, event: Arc<dyn Event>) -> Self {
		Self::Callable {
			name: name.into(),
			event,
		}
	}

	pub fn identity(&self) -> &str {
		match self {
			Self::Handler(path) => path,
			Self::Callable { name, .. } => name,
		}
	}
}

impl fmt::Debug for EventTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Handler(path) => f.debug_tuple("Handler").field(path).finish(),
			Self::Callable { name, .. } => f.debug_struct("Callable").field("name", name).finish_non_exhaustive(),
		}
	}
}

/// Registration request: what to run and when it may run.
///
/// A spec must carry `at`, a `trigger` name, or both. `auto_run` defaults to
/// true; when false, a due schedule only fires while the current
/// opportunity's caller is on the allow-list.
#[derive(Debug, Clone)]
pub struct EventSpec {
	pub at: Option<String>,
	pub trigger: Option<String>,
	pub event: EventTarget,
	pub auto_run: bool,
}

impl EventSpec {
	/// A spec that runs on a crontab schedule.
	pub fn scheduled(at: impl Into<String>, event: EventTarget) -> Self {
		Self {
			at: Some(at.into()),
			trigger: None,
			event,
			auto_run: true,
		}
	}

	/// A spec that only runs on a named manual trigger.
	pub fn triggered(trigger: impl Into<String>, event: EventTarget) -> Self {
		Self {
			at: None,
			trigger: Some(trigger.into()),
			event,
			auto_run: true,
		}
	}

	pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
		self.trigger = Some(trigger.into());
		self
	}

	pub fn with_auto_run(mut self, auto_run: bool) -> Self {
		self.auto_run = auto_run;
		self
	}
}
