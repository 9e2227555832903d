// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crontab expression parsing, matching, and next-occurrence search.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CronError, Result};
use crate::field::{parse_field, FieldKind, FieldSet};

/// Give up searching for a next occurrence after this many years. An
/// expression with no occurrence in a four-year window (which covers a full
/// leap cycle) is unsatisfiable, e.g. `0 0 31 2 *`.
const SEARCH_YEARS: u32 = 4;

/// A parsed, immutable crontab time expression.
///
/// Five whitespace-separated fields: minute, hour, day-of-month, month,
/// day-of-week. Named shortcuts (`@daily`, `@hourly`, ...) expand to their
/// canonical five-field form before parsing. The original text is retained
/// and is what the expression serializes and displays as.
///
/// Matching follows standard crontab semantics: minute, hour, and month must
/// all match, and day-of-month OR day-of-week must match. When one of the
/// two day fields is the unrestricted `*`, only the other one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
	source: String,
	minute: FieldSet,
	hour: FieldSet,
	day_of_month: FieldSet,
	month: FieldSet,
	day_of_week: FieldSet,
	dom_restricted: bool,
	dow_restricted: bool,
}

impl CronExpression {
	/// Parse a five-field crontab expression or named shortcut.
	pub fn parse(text: &str) -> Result<Self> {
		let text = text.trim();
		let expanded = if text.starts_with('@') {
			expand_shortcut(text)?
		} else {
			text
		};

		let fields: Vec<&str> = expanded.split_whitespace().collect();
		if fields.len() != 5 {
			return Err(CronError::WrongFieldCount(fields.len()));
		}

		let (minute, _) = parse_field(FieldKind::Minute, fields[0])?;
		let (hour, _) = parse_field(FieldKind::Hour, fields[1])?;
		let (day_of_month, dom_restricted) = parse_field(FieldKind::DayOfMonth, fields[2])?;
		let (month, _) = parse_field(FieldKind::Month, fields[3])?;
		let (day_of_week, dow_restricted) = parse_field(FieldKind::DayOfWeek, fields[4])?;

		Ok(Self {
			source: text.to_string(),
			minute,
			hour,
			day_of_month,
			month,
			day_of_week,
			dom_restricted,
			dow_restricted,
		})
	}

	/// The expression as originally written (shortcuts unexpanded).
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Whether `timestamp`, viewed in `tz` and truncated to the minute,
	/// matches this expression.
	pub fn matches(&self, timestamp: DateTime<Utc>, tz: Tz) -> bool {
		self.matches_local(timestamp.with_timezone(&tz).naive_local())
	}

	fn matches_local(&self, local: NaiveDateTime) -> bool {
		self.minute.contains(local.minute())
			&& self.hour.contains(local.hour())
			&& self.month.contains(local.month())
			&& self.day_matches(local.date())
	}

	fn day_matches(&self, date: NaiveDate) -> bool {
		let dom = self.day_of_month.contains(date.day());
		let dow = self.day_of_week.contains(date.weekday().num_days_from_sunday());
		match (self.dom_restricted, self.dow_restricted) {
			(true, true) => dom || dow,
			(true, false) => dom,
			(false, true) => dow,
			(false, false) => true,
		}
	}

	/// The smallest minute-granular instant strictly after `from` that
	/// matches this expression, evaluated in `tz`.
	///
	/// Skips whole months, days, and hours that cannot match rather than
	/// stepping minute by minute. Local times that do not exist (DST spring
	/// forward) are skipped; ambiguous local times (fall back) resolve to the
	/// earlier instant. Fails with [`CronError::Unsatisfiable`] after
	/// searching four years.
	pub fn next_after(&self, from: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>> {
		let local = from.with_timezone(&tz).naive_local();
		let mut cursor = truncate_to_minute(local)? + Duration::minutes(1);
		let bound_year = cursor.year() + SEARCH_YEARS as i32;

		loop {
			if cursor.year() > bound_year {
				return Err(CronError::Unsatisfiable(SEARCH_YEARS));
			}

			if !self.month.contains(cursor.month()) {
				cursor = start_of_next_month(cursor.date())?;
				continue;
			}
			if !self.day_matches(cursor.date()) {
				let next_day = cursor
					.date()
					.succ_opt()
					.ok_or_else(|| CronError::Internal("date overflow".to_string()))?;
				cursor = at_midnight(next_day)?;
				continue;
			}
			if !self.hour.contains(cursor.hour()) {
				cursor = truncate_to_hour(cursor)? + Duration::hours(1);
				continue;
			}
			if !self.minute.contains(cursor.minute()) {
				cursor += Duration::minutes(1);
				continue;
			}

			match tz.from_local_datetime(&cursor).earliest() {
				Some(resolved) => return Ok(resolved.with_timezone(&Utc)),
				// Nonexistent local time inside a DST gap.
				None => cursor += Duration::minutes(1),
			}
		}
	}
}

impl fmt::Display for CronExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

impl FromStr for CronExpression {
	type Err = CronError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl Serialize for CronExpression {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.source)
	}
}

impl<'de> Deserialize<'de> for CronExpression {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		struct ExprVisitor;

		impl Visitor<'_> for ExprVisitor {
			type Value = CronExpression;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a crontab expression string")
			}

			fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
				CronExpression::parse(value).map_err(de::Error::custom)
			}
		}

		deserializer.deserialize_str(ExprVisitor)
	}
}

fn expand_shortcut(text: &str) -> Result<&'static str> {
	match text {
		"@yearly" | "@annually" => Ok("0 0 1 1 *"),
		"@monthly" => Ok("0 0 1 * *"),
		"@weekly" => Ok("0 0 * * 0"),
		"@daily" | "@midnight" => Ok("0 0 * * *"),
		"@hourly" => Ok("0 * * * *"),
		other => Err(CronError::UnknownShortcut(other.to_string())),
	}
}

fn truncate_to_minute(local: NaiveDateTime) -> Result<NaiveDateTime> {
	local
		.with_second(0)
		.and_then(|t| t.with_nanosecond(0))
		.ok_or_else(|| CronError::Internal("minute truncation failed".to_string()))
}

fn truncate_to_hour(local: NaiveDateTime) -> Result<NaiveDateTime> {
	truncate_to_minute(local)?
		.with_minute(0)
		.ok_or_else(|| CronError::Internal("hour truncation failed".to_string()))
}

fn at_midnight(date: NaiveDate) -> Result<NaiveDateTime> {
	date.and_hms_opt(0, 0, 0)
		.ok_or_else(|| CronError::Internal("midnight construction failed".to_string()))
}

fn start_of_next_month(date: NaiveDate) -> Result<NaiveDateTime> {
	let (year, month) = if date.month() == 12 {
		(date.year() + 1, 1)
	} else {
		(date.year(), date.month() + 1)
	};
	let first = NaiveDate::from_ymd_opt(year, month, 1)
		.ok_or_else(|| CronError::Internal("month rollover failed".to_string()))?;
	at_midnight(first)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono_tz::America::New_York;
	use chrono_tz::Tz::UTC;
	use proptest::prelude::*;

	fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
	}

	#[test]
	fn test_parse_rejects_wrong_field_count() {
		assert_eq!(
			CronExpression::parse("* * * *").unwrap_err(),
			CronError::WrongFieldCount(4)
		);
		assert_eq!(
			CronExpression::parse("* * * * * *").unwrap_err(),
			CronError::WrongFieldCount(6)
		);
	}

	#[test]
	fn test_parse_rejects_unknown_shortcut() {
		assert_eq!(
			CronExpression::parse("@fortnightly").unwrap_err(),
			CronError::UnknownShortcut("@fortnightly".to_string())
		);
	}

	#[test]
	fn test_shortcuts_expand_to_canonical_forms() {
		let cases = [
			("@yearly", "0 0 1 1 *"),
			("@annually", "0 0 1 1 *"),
			("@monthly", "0 0 1 * *"),
			("@weekly", "0 0 * * 0"),
			("@daily", "0 0 * * *"),
			("@midnight", "0 0 * * *"),
			("@hourly", "0 * * * *"),
		];
		for (shortcut, canonical) in cases {
			let a = CronExpression::parse(shortcut).unwrap();
			let b = CronExpression::parse(canonical).unwrap();
			// Same match behavior; source text differs.
			let mut probe = utc(2026, 1, 1, 0, 0);
			for _ in 0..2000 {
				assert_eq!(
					a.matches(probe, UTC),
					b.matches(probe, UTC),
					"{shortcut} vs {canonical} at {probe}"
				);
				probe += Duration::minutes(17);
			}
			assert_eq!(a.source(), shortcut);
		}
	}

	#[test]
	fn test_matches_truncates_to_minute() {
		let expr = CronExpression::parse("30 12 * * *").unwrap();
		let with_seconds = Utc.with_ymd_and_hms(2026, 5, 4, 12, 30, 45).unwrap();
		assert!(expr.matches(with_seconds, UTC));
	}

	#[test]
	fn test_dom_dow_or_semantics() {
		// "1st of any month OR any Sunday", not the intersection.
		let expr = CronExpression::parse("0 0 1 * sun").unwrap();
		// 2026-01-01 is a Thursday: matches via day-of-month.
		assert!(expr.matches(utc(2026, 1, 1, 0, 0), UTC));
		// 2026-01-04 is a Sunday: matches via day-of-week.
		assert!(expr.matches(utc(2026, 1, 4, 0, 0), UTC));
		// 2026-01-05 is a Monday the 5th: neither.
		assert!(!expr.matches(utc(2026, 1, 5, 0, 0), UTC));
	}

	#[test]
	fn test_unrestricted_day_field_does_not_widen() {
		// dom is *, so only dow applies: Sundays only, not every day.
		let expr = CronExpression::parse("0 0 * * sun").unwrap();
		assert!(expr.matches(utc(2026, 1, 4, 0, 0), UTC));
		assert!(!expr.matches(utc(2026, 1, 1, 0, 0), UTC));

		// dow is *, so only dom applies.
		let expr = CronExpression::parse("0 0 15 * *").unwrap();
		assert!(expr.matches(utc(2026, 1, 15, 0, 0), UTC));
		assert!(!expr.matches(utc(2026, 1, 4, 0, 0), UTC));
	}

	#[test]
	fn test_step_wildcard_counts_as_restricted() {
		// dom is */2 (odd days), dow is Sunday. Restricted-restricted means OR:
		// 2026-01-04 is an even Sunday and must still match via dow.
		let expr = CronExpression::parse("0 0 */2 * sun").unwrap();
		assert!(expr.matches(utc(2026, 1, 4, 0, 0), UTC));
	}

	#[test]
	fn test_next_after_is_strictly_greater() {
		let expr = CronExpression::parse("*/15 * * * *").unwrap();
		// Exactly on a match: must move to the next one.
		let next = expr.next_after(utc(2026, 3, 10, 10, 15), UTC).unwrap();
		assert_eq!(next, utc(2026, 3, 10, 10, 30));
		// Seconds are truncated before searching.
		let from = Utc.with_ymd_and_hms(2026, 3, 10, 10, 15, 30).unwrap();
		assert_eq!(expr.next_after(from, UTC).unwrap(), utc(2026, 3, 10, 10, 30));
	}

	#[test]
	fn test_next_after_rolls_over_hour_and_day() {
		let expr = CronExpression::parse("5 9 * * *").unwrap();
		assert_eq!(
			expr.next_after(utc(2026, 3, 10, 9, 5), UTC).unwrap(),
			utc(2026, 3, 11, 9, 5)
		);
		assert_eq!(
			expr.next_after(utc(2026, 3, 10, 8, 0), UTC).unwrap(),
			utc(2026, 3, 10, 9, 5)
		);
	}

	#[test]
	fn test_next_after_day_of_week_wraparound() {
		// From a Friday, next Monday is three days later.
		let expr = CronExpression::parse("0 0 * * mon").unwrap();
		assert_eq!(
			// 2026-01-09 is a Friday.
			expr.next_after(utc(2026, 1, 9, 12, 0), UTC).unwrap(),
			utc(2026, 1, 12, 0, 0)
		);
	}

	#[test]
	fn test_next_after_month_lengths() {
		let expr = CronExpression::parse("0 0 31 * *").unwrap();
		// After Jan 31, the next 31st is in March.
		assert_eq!(
			expr.next_after(utc(2026, 1, 31, 0, 0), UTC).unwrap(),
			utc(2026, 3, 31, 0, 0)
		);
	}

	#[test]
	fn test_next_after_leap_year() {
		let expr = CronExpression::parse("0 0 29 2 *").unwrap();
		assert_eq!(
			expr.next_after(utc(2025, 1, 1, 0, 0), UTC).unwrap(),
			utc(2028, 2, 29, 0, 0)
		);
	}

	#[test]
	fn test_next_after_unsatisfiable() {
		let expr = CronExpression::parse("0 0 31 2 *").unwrap();
		assert_eq!(
			expr.next_after(utc(2026, 1, 1, 0, 0), UTC).unwrap_err(),
			CronError::Unsatisfiable(4)
		);
	}

	#[test]
	fn test_next_after_skips_dst_gap() {
		// 02:30 does not exist on 2026-03-08 in New York; the next valid
		// occurrence is the following day.
		let expr = CronExpression::parse("30 2 * * *").unwrap();
		let from = utc(2026, 3, 8, 1, 0); // 2026-03-07 20:00 EST
		let next = expr.next_after(from, New_York).unwrap();
		let local = next.with_timezone(&New_York);
		assert_eq!(local.naive_local(), utc(2026, 3, 9, 2, 30).naive_utc());
	}

	#[test]
	fn test_next_after_ambiguous_local_time_takes_earlier() {
		// 01:30 happens twice on 2026-11-01 in New York; the EDT (UTC-4)
		// instant comes first.
		let expr = CronExpression::parse("30 1 1 11 *").unwrap();
		let from = utc(2026, 10, 31, 0, 0);
		let next = expr.next_after(from, New_York).unwrap();
		assert_eq!(next, utc(2026, 11, 1, 5, 30));
	}

	#[test]
	fn test_serde_round_trips_source_text() {
		let expr = CronExpression::parse("@hourly").unwrap();
		let json = serde_json::to_string(&expr).unwrap();
		assert_eq!(json, "\"@hourly\"");
		let back: CronExpression = serde_json::from_str(&json).unwrap();
		assert_eq!(back, expr);
	}

	#[test]
	fn test_deserialize_rejects_garbage() {
		assert!(serde_json::from_str::<CronExpression>("\"not cron\"").is_err());
	}

	proptest! {
		/// next_after agrees with brute-force minute enumeration over a
		/// three-day window.
		#[test]
		fn prop_next_after_is_minimal(
			minute in 0u32..60,
			hour in 0u32..24,
			dow in 0u32..7,
			start_hour in 0u32..24,
		) {
			let expr = CronExpression::parse(&format!("{minute} {hour} * * {dow}")).unwrap();
			let from = utc(2026, 6, 1, start_hour, 13);
			let next = expr.next_after(from, UTC).unwrap();

			prop_assert!(next > from);
			prop_assert!(expr.matches(next, UTC));
			// No earlier match between from and next.
			let mut probe = from + Duration::minutes(1);
			probe = probe.with_second(0).unwrap();
			while probe < next {
				prop_assert!(!expr.matches(probe, UTC));
				probe += Duration::minutes(1);
			}
		}

		/// Every minute in a window agrees between matches() and membership
		/// in the sequence generated by next_after().
		#[test]
		fn prop_matches_agrees_with_enumeration(step in 1u32..30) {
			let expr = CronExpression::parse(&format!("*/{step} 8-10 * * *")).unwrap();
			let mut from = utc(2026, 2, 27, 0, 0);
			let end = utc(2026, 3, 2, 0, 0);
			// Walk the next_after chain and collect its instants.
			let mut hits = std::collections::HashSet::new();
			let mut cursor = from;
			while let Ok(next) = expr.next_after(cursor, UTC) {
				if next >= end {
					break;
				}
				hits.insert(next);
				cursor = next;
			}
			while from < end {
				prop_assert_eq!(expr.matches(from, UTC), hits.contains(&from));
				from += Duration::minutes(1);
			}
		}
	}
}
