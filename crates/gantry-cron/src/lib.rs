// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crontab expression parsing for the Gantry scheduler.
//!
//! This crate implements the classic five-field crontab grammar (minute,
//! hour, day-of-month, month, day-of-week) plus the named shortcuts
//! (`@yearly`, `@monthly`, `@weekly`, `@daily`, `@midnight`, `@hourly`),
//! minute-granular matching in a configurable time zone, and a bounded
//! next-occurrence search.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use chrono_tz::Tz;
//! use gantry_cron::CronExpression;
//!
//! let expr = CronExpression::parse("*/15 9-17 * * mon-fri")?;
//! let from = Utc.with_ymd_and_hms(2026, 3, 10, 10, 7, 0).unwrap();
//! let next = expr.next_after(from, Tz::UTC)?;
//! assert!(next > from && expr.matches(next, Tz::UTC));
//! # Ok::<(), gantry_cron::CronError>(())
//! ```

pub mod error;
pub mod expression;

mod field;

pub use error::{CronError, Result};
pub use expression::CronExpression;
