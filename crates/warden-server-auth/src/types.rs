// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions shared by the engine, the store and the gate.
//!
//! - **ID newtypes**: Type-safe wrappers around the integer keys handed out by
//!   the policy and user stores ([`UserId`], [`PolicyId`], [`RuleId`])
//! - **Activation**: [`Status`] plus the optional date window every
//!   administrable record carries ([`Activation`])
//!
//! All ID types serialize transparently as integers and order numerically,
//! which the decision engine relies on for deterministic tie-breaks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
		)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from a raw store key.
			pub fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner key.
			pub fn into_inner(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl FromStr for $name {
			type Err = std::num::ParseIntError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Ok(Self(s.trim().parse()?))
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(PolicyId, "Unique identifier for a policy.");
define_id_type!(RuleId, "Unique identifier for a rule.");

// =============================================================================
// Activation
// =============================================================================

/// Administrative on/off switch carried by policies, rules, users and profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
	Inactive,
	#[default]
	Active,
}

impl Status {
	/// Integer code used by the store (`0` inactive, `1` active).
	pub fn code(self) -> i64 {
		match self {
			Status::Inactive => 0,
			Status::Active => 1,
		}
	}

	/// Inverse of [`Status::code`]. Unknown codes are treated as inactive.
	pub fn from_code(code: i64) -> Self {
		if code == 1 {
			Status::Active
		} else {
			Status::Inactive
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Status::Inactive => write!(f, "inactive"),
			Status::Active => write!(f, "active"),
		}
	}
}

impl FromStr for Status {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"active" | "1" => Ok(Status::Active),
			"inactive" | "0" => Ok(Status::Inactive),
			other => Err(format!("unknown status: {other}")),
		}
	}
}

/// Status plus the optional activation window.
///
/// An empty `activate_date` means "active immediately"; an empty
/// `deactivate_date` means "active indefinitely". The deactivation date itself
/// is already outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Activation {
	#[serde(default)]
	pub status: Status,
	#[serde(default)]
	pub activate_date: Option<NaiveDate>,
	#[serde(default)]
	pub deactivate_date: Option<NaiveDate>,
}

impl Activation {
	/// Active, with no window.
	pub fn active() -> Self {
		Self::default()
	}

	/// Inactive, with no window.
	pub fn inactive() -> Self {
		Self {
			status: Status::Inactive,
			..Self::default()
		}
	}

	/// Builder: set the activation window.
	pub fn with_window(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
		self.activate_date = from;
		self.deactivate_date = until;
		self
	}

	/// Returns true if the record participates in evaluation on `date`.
	pub fn is_active_on(&self, date: NaiveDate) -> bool {
		if self.status != Status::Active {
			return false;
		}
		if let Some(from) = self.activate_date {
			if date < from {
				return false;
			}
		}
		match self.deactivate_date {
			Some(until) => date < until,
			None => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	#[test]
	fn ids_order_numerically() {
		assert!(PolicyId::new(2) < PolicyId::new(10));
		assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
		assert_eq!(RuleId::new(7).to_string(), "7");
	}

	#[test]
	fn ids_serialize_transparently() {
		let json = serde_json::to_string(&PolicyId::new(5)).unwrap();
		assert_eq!(json, "5");
	}

	#[test]
	fn status_codes_round_trip() {
		assert_eq!(Status::from_code(Status::Active.code()), Status::Active);
		assert_eq!(Status::from_code(Status::Inactive.code()), Status::Inactive);
		assert_eq!(Status::from_code(7), Status::Inactive);
	}

	#[test]
	fn inactive_status_is_never_active() {
		assert!(!Activation::inactive().is_active_on(date(2025, 1, 1)));
	}

	#[test]
	fn empty_window_is_always_active() {
		assert!(Activation::active().is_active_on(date(1999, 12, 31)));
	}

	#[test]
	fn window_bounds() {
		let activation =
			Activation::active().with_window(Some(date(2025, 3, 1)), Some(date(2025, 4, 1)));

		assert!(!activation.is_active_on(date(2025, 2, 28)));
		assert!(activation.is_active_on(date(2025, 3, 1)));
		assert!(activation.is_active_on(date(2025, 3, 31)));
		assert!(!activation.is_active_on(date(2025, 4, 1)));
	}
}
