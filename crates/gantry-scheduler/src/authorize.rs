// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller-address authorization for manual triggers and `auto_run = false`
//! events.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::{Result, SchedulerError};

/// Ordered set of caller addresses permitted to authorize manual triggers
/// and due `auto_run = false` events.
///
/// Entries are CIDR networks; bare addresses are host networks (/32 or
/// /128). The default allows loopback only. An opportunity whose caller
/// address is unknown is always denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
	entries: Vec<IpNet>,
}

impl Default for AllowList {
	fn default() -> Self {
		Self {
			entries: vec![IpNet::from(IpAddr::from([127, 0, 0, 1]))],
		}
	}
}

impl AllowList {
	pub fn new(entries: Vec<IpNet>) -> Self {
		Self { entries }
	}

	/// Parse textual entries: either CIDR (`10.1.0.0/16`) or a bare address
	/// (`192.168.1.4`, `::1`).
	pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
		let mut parsed = Vec::with_capacity(entries.len());
		for entry in entries {
			let text = entry.as_ref().trim();
			let net = IpNet::from_str(text)
				.or_else(|_| IpAddr::from_str(text).map(IpNet::from))
				.map_err(|_| SchedulerError::InvalidAllowEntry(text.to_string()))?;
			parsed.push(net);
		}
		Ok(Self { entries: parsed })
	}

	pub fn is_allowed(&self, addr: Option<IpAddr>) -> bool {
		match addr {
			Some(addr) => self.entries.iter().any(|net| net.contains(&addr)),
			None => false,
		}
	}
}
