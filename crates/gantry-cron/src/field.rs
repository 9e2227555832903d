// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-field grammar for crontab expressions.
//!
//! Each of the five fields parses into a [`FieldSet`], a bitmask over the
//! field's value domain. The grammar per field is: `*`, a single value, a
//! range `a-b`, a step `a-b/n` or `*/n`, and comma-separated lists of the
//! above. Month and day-of-week additionally accept three-letter names.

use crate::error::{CronError, Result};

const MONTH_NAMES: [&str; 12] = [
	"jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Which of the five crontab fields is being parsed.
///
/// Carries the value domain and name table for that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
	Minute,
	Hour,
	DayOfMonth,
	Month,
	DayOfWeek,
}

impl FieldKind {
	pub(crate) fn name(self) -> &'static str {
		match self {
			FieldKind::Minute => "minute",
			FieldKind::Hour => "hour",
			FieldKind::DayOfMonth => "day-of-month",
			FieldKind::Month => "month",
			FieldKind::DayOfWeek => "day-of-week",
		}
	}

	fn min(self) -> u32 {
		match self {
			FieldKind::Minute | FieldKind::Hour | FieldKind::DayOfWeek => 0,
			FieldKind::DayOfMonth | FieldKind::Month => 1,
		}
	}

	fn max(self) -> u32 {
		match self {
			FieldKind::Minute => 59,
			FieldKind::Hour => 23,
			FieldKind::DayOfMonth => 31,
			FieldKind::Month => 12,
			// 7 is accepted in the source text and folded to 0 (Sunday).
			FieldKind::DayOfWeek => 7,
		}
	}

	/// Parse a single value token: a bare integer or, for month and
	/// day-of-week, a three-letter name.
	fn parse_value(self, token: &str) -> Result<u32> {
		if let Ok(value) = token.parse::<u32>() {
			if value < self.min() || value > self.max() {
				return Err(CronError::OutOfRange {
					field: self.name(),
					value,
					min: self.min(),
					max: self.max(),
				});
			}
			return Ok(value);
		}

		let names: &[&str] = match self {
			FieldKind::Month => &MONTH_NAMES,
			FieldKind::DayOfWeek => &DAY_NAMES,
			_ => &[],
		};
		let lower = token.to_ascii_lowercase();
		if let Some(index) = names.iter().position(|n| *n == lower) {
			return Ok(match self {
				FieldKind::Month => index as u32 + 1,
				_ => index as u32,
			});
		}

		Err(CronError::InvalidToken {
			field: self.name(),
			token: token.to_string(),
		})
	}

	/// Fold accepted values into their canonical stored form.
	fn canonical(self, value: u32) -> u32 {
		// Both 0 and 7 mean Sunday.
		if self == FieldKind::DayOfWeek && value == 7 {
			0
		} else {
			value
		}
	}
}

/// The set of accepted values for one field, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSet {
	bits: u64,
}

impl FieldSet {
	fn empty() -> Self {
		Self { bits: 0 }
	}

	fn insert(&mut self, value: u32) {
		self.bits |= 1 << value;
	}

	pub(crate) fn contains(self, value: u32) -> bool {
		self.bits & (1 << value) != 0
	}
}

/// Parse one whitespace-delimited field.
///
/// Returns the value set plus a `restricted` flag: true unless the field text
/// is the bare wildcard `*`. The flag feeds the day-of-month/day-of-week OR
/// rule, where `*/n` counts as restricted but `*` does not.
pub(crate) fn parse_field(kind: FieldKind, text: &str) -> Result<(FieldSet, bool)> {
	let mut set = FieldSet::empty();

	for item in text.split(',') {
		let (spec, step) = match item.split_once('/') {
			Some((spec, step_text)) => {
				let step: u32 = step_text.parse().map_err(|_| CronError::InvalidStep {
					field: kind.name(),
					token: item.to_string(),
				})?;
				if step == 0 {
					return Err(CronError::InvalidStep {
						field: kind.name(),
						token: item.to_string(),
					});
				}
				(spec, step)
			}
			None => (item, 1),
		};

		let (start, end) = if spec == "*" {
			(kind.min(), kind.max())
		} else if let Some((a, b)) = spec.split_once('-') {
			let start = kind.parse_value(a)?;
			let end = kind.parse_value(b)?;
			if start > end {
				return Err(CronError::InvalidRange {
					field: kind.name(),
					token: item.to_string(),
				});
			}
			(start, end)
		} else {
			let value = kind.parse_value(spec)?;
			if step != 1 {
				// A step needs a range to step over.
				return Err(CronError::InvalidStep {
					field: kind.name(),
					token: item.to_string(),
				});
			}
			(value, value)
		};

		// u64 so an oversized step cannot overflow the increment.
		let mut value = u64::from(start);
		while value <= u64::from(end) {
			set.insert(kind.canonical(value as u32));
			value += u64::from(step);
		}
	}

	Ok((set, text != "*"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn values(set: FieldSet, max: u32) -> Vec<u32> {
		(0..=max).filter(|v| set.contains(*v)).collect()
	}

	#[test]
	fn test_wildcard_covers_domain() {
		let (set, restricted) = parse_field(FieldKind::Hour, "*").unwrap();
		assert_eq!(values(set, 23), (0..=23).collect::<Vec<_>>());
		assert!(!restricted);
	}

	#[test]
	fn test_single_value() {
		let (set, restricted) = parse_field(FieldKind::Minute, "30").unwrap();
		assert_eq!(values(set, 59), vec![30]);
		assert!(restricted);
	}

	#[test]
	fn test_range() {
		let (set, _) = parse_field(FieldKind::Hour, "9-17").unwrap();
		assert_eq!(values(set, 23), (9..=17).collect::<Vec<_>>());
	}

	#[test]
	fn test_wildcard_step() {
		let (set, restricted) = parse_field(FieldKind::Minute, "*/15").unwrap();
		assert_eq!(values(set, 59), vec![0, 15, 30, 45]);
		assert!(restricted);
	}

	#[test]
	fn test_range_step() {
		let (set, _) = parse_field(FieldKind::Minute, "10-30/10").unwrap();
		assert_eq!(values(set, 59), vec![10, 20, 30]);
	}

	#[test]
	fn test_list_mixes_forms() {
		let (set, _) = parse_field(FieldKind::Hour, "0,6-8,*/12").unwrap();
		assert_eq!(values(set, 23), vec![0, 6, 7, 8, 12]);
	}

	#[test]
	fn test_month_names() {
		let (set, _) = parse_field(FieldKind::Month, "jan,JUL,dec").unwrap();
		assert_eq!(values(set, 12), vec![1, 7, 12]);
	}

	#[test]
	fn test_day_name_range() {
		let (set, _) = parse_field(FieldKind::DayOfWeek, "mon-fri").unwrap();
		assert_eq!(values(set, 6), vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn test_seven_means_sunday() {
		let (set, _) = parse_field(FieldKind::DayOfWeek, "7").unwrap();
		assert!(set.contains(0));
		assert!(!set.contains(7));
	}

	#[test]
	fn test_out_of_range_value() {
		let err = parse_field(FieldKind::Minute, "60").unwrap_err();
		assert_eq!(
			err,
			CronError::OutOfRange {
				field: "minute",
				value: 60,
				min: 0,
				max: 59
			}
		);
	}

	#[test]
	fn test_non_numeric_token() {
		let err = parse_field(FieldKind::Hour, "noon").unwrap_err();
		assert!(matches!(err, CronError::InvalidToken { field: "hour", .. }));
	}

	#[test]
	fn test_inverted_range() {
		let err = parse_field(FieldKind::Hour, "17-9").unwrap_err();
		assert!(matches!(err, CronError::InvalidRange { .. }));
	}

	#[test]
	fn test_zero_step() {
		let err = parse_field(FieldKind::Minute, "*/0").unwrap_err();
		assert!(matches!(err, CronError::InvalidStep { .. }));
	}

	#[test]
	fn test_step_without_range() {
		let err = parse_field(FieldKind::Minute, "5/10").unwrap_err();
		assert!(matches!(err, CronError::InvalidStep { .. }));
	}

	#[test]
	fn test_empty_item_rejected() {
		assert!(parse_field(FieldKind::Minute, "").is_err());
		assert!(parse_field(FieldKind::Minute, "1,,2").is_err());
	}
}
