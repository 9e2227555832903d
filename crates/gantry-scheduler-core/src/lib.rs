// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Gantry request-driven event scheduler.
//!
//! This crate provides the shared vocabulary between the engine
//! (`gantry-scheduler`) and host integrations: event targets and specs, the
//! [`Event`] and [`EventDispatcher`] traits, run history, and introspection
//! snapshots.

pub mod event;
pub mod history;

pub use event::{Activation, Event, EventContext, EventDispatcher, EventError, EventSpec, EventTarget};
pub use history::{EventSnapshot, RunHistory};

/// Query parameter hosts should recognize as a manual trigger name and
/// forward to `Scheduler::on_opportunity`.
pub const TRIGGER_PARAM: &str = "schedule_trigger";
