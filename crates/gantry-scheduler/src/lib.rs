// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request-driven cron scheduler for Gantry.
//!
//! This crate provides a best-effort, opportunistic scheduler: there is no
//! timer thread. The host hands the engine an opportunity to act once per
//! inbound unit of work, and the engine throttles itself to one real check
//! per interval, fires whatever is due or manually triggered and authorized,
//! and persists run history to a human-inspectable JSON state file.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use chrono::Utc;
//! use gantry_scheduler::{
//!     Event, EventContext, EventError, EventSpec, EventTarget, Scheduler,
//! };
//!
//! struct RemoveSessions;
//!
//! #[async_trait]
//! impl Event for RemoveSessions {
//!     async fn run(&self, _ctx: &EventContext) -> Result<(), EventError> {
//!         // ... session cleanup ...
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), gantry_scheduler::SchedulerError> {
//! let scheduler = Scheduler::builder()
//!     .state_file("/var/lib/myapp/scheduler-state.json")
//!     .config_file("/etc/myapp/scheduler.yml")
//!     .build()?;
//!
//! scheduler
//!     .register(EventSpec::scheduled(
//!         "0 3 * * *",
//!         EventTarget::callable("remove_sessions", Arc::new(RemoveSessions)),
//!     ))
//!     .await?;
//!
//! // In the host's request path, once per unit of work:
//! scheduler.on_opportunity(Utc::now(), None, None).await;
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod state;

pub use authorize::AllowList;
pub use config::DeclaredEvent;
pub use engine::{Scheduler, SchedulerBuilder};
pub use error::{Result, SchedulerError};
pub use registry::EventRegistration;
pub use state::StateStore;

pub use gantry_cron::{CronError, CronExpression};
pub use gantry_scheduler_core::{
	Activation, Event, EventContext, EventDispatcher, EventError, EventSnapshot, EventSpec,
	EventTarget, RunHistory, TRIGGER_PARAM,
};
