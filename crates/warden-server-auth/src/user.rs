// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject types: the user making a request and their profile record.
//!
//! This module provides:
//! - [`User`] - the authenticated account, the subject of every decision
//! - [`UserProfile`] - the optional profile sub-record reached through
//!   `profile.<field>` attribute names
//! - [`Gender`], [`Clearance`], [`ProfileRole`] - profile enums, compared by
//!   their upper-case codes
//!
//! Both records expose their fields through [`Attributes`]; unknown field
//! names are unavailable, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attribute::{AttributeValue, Attributes, Resource};
use crate::types::{Status, UserId};

/// Resource type tag for profiles when they are themselves protected.
pub const USER_PROFILE_RESOURCE_TYPE: &str = "user_profile";

macro_rules! define_code_enum {
	($name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			/// Upper-case code stored and compared by rules.
			pub fn code(self) -> &'static str {
				match self {
					$($name::$variant => $code),+
				}
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.code())
			}
		}

		impl std::str::FromStr for $name {
			type Err = String;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s {
					$($code => Ok($name::$variant),)+
					other => Err(format!("unknown {}: {other}", stringify!($name))),
				}
			}
		}
	};
}

define_code_enum!(Gender {
	Female => "FEMALE",
	Male => "MALE",
	Custom => "CUSTOM",
	None => "NONE",
});

define_code_enum!(Clearance {
	Low => "LOW",
	Medium => "MEDIUM",
	High => "HIGH",
});

define_code_enum!(ProfileRole {
	Basic => "BASIC",
	Control => "CONTROL",
	Analytic => "ANALYTIC",
	Admin => "ADMIN",
});

impl Default for ProfileRole {
	fn default() -> Self {
		ProfileRole::Basic
	}
}

/// A user account.
///
/// # PII Handling
///
/// `email` and `phone` are user-provided PII and must not be logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Unique identifier for this user.
	pub id: UserId,

	/// Login email address.
	pub email: String,

	/// Phone number in E.164 form.
	#[serde(default)]
	pub phone: Option<String>,

	/// Whether the account has been activated.
	#[serde(default)]
	pub verified: bool,

	/// Can log into the administration site.
	#[serde(default)]
	pub is_staff: bool,

	/// Has every permission without explicit assignment.
	#[serde(default)]
	pub is_superuser: bool,

	#[serde(default)]
	pub status: Status,

	/// Profile sub-record, if one exists.
	#[serde(default)]
	pub profile: Option<UserProfile>,
}

impl User {
	/// Creates an active, unverified user with no profile.
	pub fn new(id: UserId, email: impl Into<String>) -> Self {
		Self {
			id,
			email: email.into(),
			phone: None,
			verified: false,
			is_staff: false,
			is_superuser: false,
			status: Status::Active,
			profile: None,
		}
	}

	/// Builder: attach a profile.
	pub fn with_profile(mut self, profile: UserProfile) -> Self {
		self.profile = Some(profile);
		self
	}

	/// Returns the profile sub-record, if any.
	pub fn profile(&self) -> Option<&UserProfile> {
		self.profile.as_ref()
	}

	/// Returns true if the account is switched on.
	pub fn is_active(&self) -> bool {
		self.status == Status::Active
	}
}

impl Attributes for User {
	fn attribute(&self, name: &str) -> Option<AttributeValue> {
		match name {
			"id" => Some(self.id.into()),
			"email" => Some(self.email.as_str().into()),
			"phone" => self.phone.as_deref().map(Into::into),
			"verified" => Some(self.verified.into()),
			"is_staff" => Some(self.is_staff.into()),
			"is_superuser" => Some(self.is_superuser.into()),
			"is_active" => Some(self.is_active().into()),
			"status" => Some(self.status.code().into()),
			_ => None,
		}
	}
}

/// Profile sub-record of a [`User`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
	/// The user this profile belongs to.
	pub user_id: UserId,
	pub first_name: String,
	pub last_name: String,
	pub gender: Gender,
	#[serde(default)]
	pub custom_gender: Option<String>,
	pub birth_date: DateTime<Utc>,
	#[serde(default)]
	pub department: Option<String>,
	pub clearance_level: Clearance,
	#[serde(default)]
	pub role: ProfileRole,
	#[serde(default)]
	pub status: Status,
}

impl UserProfile {
	/// Builder: set the department.
	pub fn with_department(mut self, department: impl Into<String>) -> Self {
		self.department = Some(department.into());
		self
	}

	/// Builder: set the role.
	pub fn with_role(mut self, role: ProfileRole) -> Self {
		self.role = role;
		self
	}
}

impl Attributes for UserProfile {
	fn attribute(&self, name: &str) -> Option<AttributeValue> {
		match name {
			"user_id" => Some(self.user_id.into()),
			"first_name" => Some(self.first_name.as_str().into()),
			"last_name" => Some(self.last_name.as_str().into()),
			"gender" => Some(self.gender.code().into()),
			"custom_gender" => self.custom_gender.as_deref().map(Into::into),
			"birth_date" => Some(self.birth_date.to_rfc3339().into()),
			"department" => self.department.as_deref().map(Into::into),
			"clearance_level" => Some(self.clearance_level.code().into()),
			"role" => Some(self.role.code().into()),
			"status" => Some(self.status.code().into()),
			_ => None,
		}
	}
}

impl Resource for UserProfile {
	fn resource_type(&self) -> &str {
		USER_PROFILE_RESOURCE_TYPE
	}

	fn owner_id(&self) -> Option<UserId> {
		Some(self.user_id)
	}

	fn department(&self) -> Option<String> {
		self.department.clone()
	}
}

#[cfg(test)]
pub(crate) mod fixtures {
	use super::*;
	use chrono::TimeZone;

	pub fn profile(user_id: UserId) -> UserProfile {
		UserProfile {
			user_id,
			first_name: "Ada".to_string(),
			last_name: "Lovelace".to_string(),
			gender: Gender::Female,
			custom_gender: None,
			birth_date: Utc.with_ymd_and_hms(1990, 12, 10, 0, 0, 0).unwrap(),
			department: None,
			clearance_level: Clearance::Medium,
			role: ProfileRole::Basic,
			status: Status::Active,
		}
	}

	pub fn user(id: i64) -> User {
		User::new(UserId::new(id), format!("user{id}@example.com"))
	}

	pub fn user_with_profile(id: i64) -> User {
		let user = user(id);
		let profile = profile(user.id);
		user.with_profile(profile)
	}
}

#[cfg(test)]
mod tests {
	use super::fixtures::*;
	use super::*;

	#[test]
	fn user_fields_resolve() {
		let user = user(4);
		assert_eq!(user.attribute("id"), Some(AttributeValue::Integer(4)));
		assert_eq!(
			user.attribute("email"),
			Some(AttributeValue::Text("user4@example.com".to_string()))
		);
		assert_eq!(user.attribute("is_staff"), Some(AttributeValue::Boolean(false)));
		assert_eq!(user.attribute("phone"), None);
		assert_eq!(user.attribute("password"), None);
	}

	#[test]
	fn profile_enums_resolve_as_codes() {
		let profile = profile(UserId::new(1)).with_role(ProfileRole::Admin);
		assert_eq!(profile.attribute("role").unwrap().to_string(), "ADMIN");
		assert_eq!(profile.attribute("gender").unwrap().to_string(), "FEMALE");
		assert_eq!(profile.attribute("clearance_level").unwrap().to_string(), "MEDIUM");
	}

	#[test]
	fn profile_department_absent_is_unavailable() {
		let profile = profile(UserId::new(1));
		assert_eq!(profile.attribute("department"), None);
		let profile = profile.with_department("research");
		assert_eq!(profile.attribute("department").unwrap().to_string(), "research");
	}

	#[test]
	fn profile_is_owned_by_its_user() {
		let profile = profile(UserId::new(12));
		assert_eq!(profile.resource_type(), USER_PROFILE_RESOURCE_TYPE);
		assert_eq!(profile.owner_id(), Some(UserId::new(12)));
	}

	#[test]
	fn role_codes_parse() {
		assert_eq!("CONTROL".parse::<ProfileRole>().unwrap(), ProfileRole::Control);
		assert!("control".parse::<ProfileRole>().is_err());
		assert_eq!(ProfileRole::default(), ProfileRole::Basic);
	}
}
