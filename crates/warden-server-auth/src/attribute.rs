// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute values and the field-access traits subjects and resources implement.
//!
//! Rules compare against stored text literals, so every attribute value has a
//! canonical string form ([`fmt::Display`]) and an optional numeric form
//! ([`AttributeValue::as_number`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::UserId;

/// A single attribute value pulled from a subject, resource or context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
	Boolean(bool),
	Integer(i64),
	Float(f64),
	Text(String),
}

impl AttributeValue {
	/// Numeric form used by the ordering operators.
	///
	/// Text is parsed after trimming; booleans are not numeric.
	pub fn as_number(&self) -> Option<f64> {
		match self {
			AttributeValue::Integer(i) => Some(*i as f64),
			AttributeValue::Float(f) => Some(*f),
			AttributeValue::Text(s) => s.trim().parse().ok(),
			AttributeValue::Boolean(_) => None,
		}
	}
}

impl fmt::Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeValue::Boolean(true) => write!(f, "True"),
			AttributeValue::Boolean(false) => write!(f, "False"),
			AttributeValue::Integer(i) => write!(f, "{i}"),
			AttributeValue::Float(v) => write!(f, "{v}"),
			AttributeValue::Text(s) => f.write_str(s),
		}
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		AttributeValue::Boolean(value)
	}
}

impl From<i64> for AttributeValue {
	fn from(value: i64) -> Self {
		AttributeValue::Integer(value)
	}
}

impl From<u32> for AttributeValue {
	fn from(value: u32) -> Self {
		AttributeValue::Integer(i64::from(value))
	}
}

impl From<f64> for AttributeValue {
	fn from(value: f64) -> Self {
		AttributeValue::Float(value)
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		AttributeValue::Text(value.to_string())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		AttributeValue::Text(value)
	}
}

impl From<UserId> for AttributeValue {
	fn from(value: UserId) -> Self {
		AttributeValue::Integer(value.into_inner())
	}
}

/// Named field access. `None` means the attribute is unavailable.
pub trait Attributes {
	fn attribute(&self, name: &str) -> Option<AttributeValue>;
}

/// A protected resource instance.
///
/// Implementations must be read-only: the engine may call these methods
/// repeatedly and from many tasks at once.
pub trait Resource: Attributes + Send + Sync {
	/// Type tag selecting which policies govern this resource.
	fn resource_type(&self) -> &str;

	/// Owner used by the `is_owner` relationship.
	fn owner_id(&self) -> Option<UserId> {
		match self.attribute("owner_id")? {
			AttributeValue::Integer(id) => Some(UserId::new(id)),
			AttributeValue::Text(s) => s.parse().ok(),
			_ => None,
		}
	}

	/// Department used by the `same_department` relationship.
	fn department(&self) -> Option<String> {
		self.attribute("department").map(|v| v.to_string())
	}
}

/// A generic resource: a type tag plus a bag of named fields.
///
/// Useful for embedders whose models do not implement [`Resource`] directly,
/// and for JSON-described access requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub resource_type: String,
	#[serde(default)]
	pub fields: BTreeMap<String, AttributeValue>,
}

impl Record {
	pub fn new(resource_type: impl Into<String>) -> Self {
		Self {
			resource_type: resource_type.into(),
			fields: BTreeMap::new(),
		}
	}

	/// Builder: set a field.
	pub fn with_field(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.fields.insert(name.into(), value.into());
		self
	}

	/// Builder: set the `owner_id` field.
	pub fn with_owner(self, owner: UserId) -> Self {
		self.with_field("owner_id", owner)
	}
}

impl Attributes for Record {
	fn attribute(&self, name: &str) -> Option<AttributeValue> {
		if name == "resource_type" {
			return Some(AttributeValue::Text(self.resource_type.clone()));
		}
		self.fields.get(name).cloned()
	}
}

impl Resource for Record {
	fn resource_type(&self) -> &str {
		&self.resource_type
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_forms() {
		assert_eq!(AttributeValue::from(true).to_string(), "True");
		assert_eq!(AttributeValue::from(false).to_string(), "False");
		assert_eq!(AttributeValue::from(42i64).to_string(), "42");
		assert_eq!(AttributeValue::from(2.5).to_string(), "2.5");
		assert_eq!(AttributeValue::from("ADMIN").to_string(), "ADMIN");
	}

	#[test]
	fn numeric_forms() {
		assert_eq!(AttributeValue::from(5i64).as_number(), Some(5.0));
		assert_eq!(AttributeValue::from(" 7.5 ").as_number(), Some(7.5));
		assert_eq!(AttributeValue::from("ten").as_number(), None);
		assert_eq!(AttributeValue::from(true).as_number(), None);
	}

	#[test]
	fn record_fields_and_owner() {
		let record = Record::new("invoice")
			.with_field("amount", 120i64)
			.with_field("department", "finance")
			.with_owner(UserId::new(9));

		assert_eq!(record.resource_type(), "invoice");
		assert_eq!(record.attribute("amount"), Some(AttributeValue::Integer(120)));
		assert_eq!(record.attribute("missing"), None);
		assert_eq!(record.owner_id(), Some(UserId::new(9)));
		assert_eq!(record.department(), Some("finance".to_string()));
	}

	#[test]
	fn record_without_owner() {
		let record = Record::new("invoice");
		assert_eq!(record.owner_id(), None);
		assert_eq!(record.department(), None);
	}

	#[test]
	fn record_deserializes_untagged_values() {
		let record: Record = serde_json::from_str(
			r#"{"resource_type":"invoice","fields":{"owner_id":3,"paid":false,"note":"x","amount":9.5}}"#,
		)
		.unwrap();

		assert_eq!(record.owner_id(), Some(UserId::new(3)));
		assert_eq!(record.attribute("paid"), Some(AttributeValue::Boolean(false)));
		assert_eq!(record.attribute("note"), Some(AttributeValue::Text("x".to_string())));
		assert_eq!(record.attribute("amount"), Some(AttributeValue::Float(9.5)));
	}
}
