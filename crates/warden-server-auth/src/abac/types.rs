// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type definitions for ABAC policy evaluation.
//!
//! This module defines the data the engine reads but never mutates:
//!
//! - [`Policy`]: A prioritized statement scoped to a resource type and action
//! - [`Rule`]: One attribute comparison inside a policy's conjunction
//! - [`RuleType`] / [`Operator`]: Closed sets of attribute sources and comparisons
//! - [`EvaluationContext`]: Request-derived environment values plus the evaluation clock
//!
//! # Design Principles
//!
//! 1. **Immutable evaluation**: Policies are loaded before evaluation and only read
//! 2. **Closed codes**: Rule types and operators are enums; unknown stored codes
//!    are rejected where the text is parsed, never at comparison time
//! 3. **Serializable**: All types can be logged or exchanged as JSON

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;
use crate::types::{Activation, PolicyId, RuleId};

/// Canonical action verbs. The set is open; these are the ones the gate emits.
pub mod actions {
	pub const VIEW: &str = "view";
	pub const CREATE: &str = "create";
	pub const EDIT: &str = "edit";
	pub const DELETE: &str = "delete";
}

/// Where a rule's attribute value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
	/// A field on the subject, or `profile.<field>` on its profile.
	UserAttr,
	/// A field on the resource instance.
	ResourceAttr,
	/// Clock values or request context.
	Environment,
	/// A derived subject/resource relationship.
	Relationship,
	/// A numeric field on the resource.
	Amount,
}

impl RuleType {
	/// Returns all rule types.
	pub fn all() -> &'static [RuleType] {
		&[
			RuleType::UserAttr,
			RuleType::ResourceAttr,
			RuleType::Environment,
			RuleType::Relationship,
			RuleType::Amount,
		]
	}

	/// Stored code.
	pub fn code(self) -> &'static str {
		match self {
			RuleType::UserAttr => "user_attr",
			RuleType::ResourceAttr => "resource_attr",
			RuleType::Environment => "environment",
			RuleType::Relationship => "relationship",
			RuleType::Amount => "amount",
		}
	}
}

impl fmt::Display for RuleType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

impl FromStr for RuleType {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RuleType::all()
			.iter()
			.copied()
			.find(|t| t.code() == s)
			.ok_or_else(|| AuthError::UnknownRuleType(s.to_string()))
	}
}

/// Comparison applied between a resolved attribute and a rule's literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
	#[serde(rename = "equals")]
	Equals,
	#[serde(rename = "not_equals")]
	NotEquals,
	#[serde(rename = "contains")]
	Contains,
	#[serde(rename = "in")]
	In,
	#[serde(rename = "gt")]
	GreaterThan,
	#[serde(rename = "lt")]
	LessThan,
	#[serde(rename = "gte")]
	GreaterThanOrEquals,
	#[serde(rename = "lte")]
	LessThanOrEquals,
}

impl Operator {
	/// Returns all operators.
	pub fn all() -> &'static [Operator] {
		&[
			Operator::Equals,
			Operator::NotEquals,
			Operator::Contains,
			Operator::In,
			Operator::GreaterThan,
			Operator::LessThan,
			Operator::GreaterThanOrEquals,
			Operator::LessThanOrEquals,
		]
	}

	/// Stored code.
	pub fn code(self) -> &'static str {
		match self {
			Operator::Equals => "equals",
			Operator::NotEquals => "not_equals",
			Operator::Contains => "contains",
			Operator::In => "in",
			Operator::GreaterThan => "gt",
			Operator::LessThan => "lt",
			Operator::GreaterThanOrEquals => "gte",
			Operator::LessThanOrEquals => "lte",
		}
	}

	/// Returns true for operators that compare numerically.
	pub fn is_numeric(self) -> bool {
		matches!(
			self,
			Operator::GreaterThan
				| Operator::LessThan
				| Operator::GreaterThanOrEquals
				| Operator::LessThanOrEquals
		)
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

impl FromStr for Operator {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Operator::all()
			.iter()
			.copied()
			.find(|op| op.code() == s)
			.ok_or_else(|| AuthError::UnknownOperator(s.to_string()))
	}
}

/// A single attribute comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
	pub id: RuleId,
	pub rule_type: RuleType,
	pub attribute_name: String,
	pub operator: Operator,
	/// Literal compared against, stored as text.
	pub value: String,
	/// Permission outcome contributed when the owning policy matches.
	pub effect: bool,
	#[serde(default)]
	pub activation: Activation,
}

impl Rule {
	/// Creates an active rule with `effect = true`.
	pub fn new(
		id: RuleId,
		rule_type: RuleType,
		attribute_name: impl Into<String>,
		operator: Operator,
		value: impl Into<String>,
	) -> Self {
		Self {
			id,
			rule_type,
			attribute_name: attribute_name.into(),
			operator,
			value: value.into(),
			effect: true,
			activation: Activation::active(),
		}
	}

	/// Builder: set the effect.
	pub fn with_effect(mut self, effect: bool) -> Self {
		self.effect = effect;
		self
	}
}

/// A prioritized authorization statement for one resource type and action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
	pub id: PolicyId,
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub resource_type: String,
	pub action: String,
	/// Higher values are considered first.
	#[serde(default)]
	pub priority: i32,
	#[serde(default)]
	pub activation: Activation,
	/// Conjunction, ordered by rule id.
	#[serde(default)]
	pub rules: Vec<Rule>,
}

impl Policy {
	/// Creates an active policy with no rules and priority 0.
	pub fn new(
		id: PolicyId,
		name: impl Into<String>,
		resource_type: impl Into<String>,
		action: impl Into<String>,
	) -> Self {
		Self {
			id,
			name: name.into(),
			description: String::new(),
			resource_type: resource_type.into(),
			action: action.into(),
			priority: 0,
			activation: Activation::active(),
			rules: Vec::new(),
		}
	}

	/// Builder: set the priority.
	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	/// Builder: set the activation.
	pub fn with_activation(mut self, activation: Activation) -> Self {
		self.activation = activation;
		self
	}

	/// Builder: append a rule.
	pub fn with_rule(mut self, rule: Rule) -> Self {
		self.rules.push(rule);
		self
	}

	/// Returns true if this policy governs `resource_type` / `action`.
	pub fn governs(&self, resource_type: &str, action: &str) -> bool {
		self.resource_type == resource_type && self.action == action
	}

	/// Returns true if the policy participates in evaluation on `date`.
	pub fn is_active_on(&self, date: NaiveDate) -> bool {
		self.activation.is_active_on(date)
	}

	/// The single verdict this policy yields when all its rules match.
	///
	/// `Ok(None)` for a policy without rules. Rules that disagree on their
	/// effect are a data-integrity fault and yield
	/// [`AuthError::ConflictingEffects`].
	pub fn effect(&self) -> Result<Option<bool>, AuthError> {
		let mut effects = self.rules.iter().map(|r| r.effect);
		let Some(first) = effects.next() else {
			return Ok(None);
		};
		if effects.any(|e| e != first) {
			return Err(AuthError::ConflictingEffects(self.id));
		}
		Ok(Some(first))
	}
}

/// Orders policies by priority descending, then id ascending.
pub fn sort_policies(policies: &mut [Policy]) {
	policies.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
}

/// Environment values for one evaluation.
///
/// `values` carries request-derived entries such as `ip_address` and
/// `user_agent`; `now` is the clock read by the `time` and `day_of_week`
/// environment attributes and by activation-window checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
	#[serde(default)]
	pub values: HashMap<String, String>,
	#[serde(default = "local_now")]
	pub now: NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
	Local::now().naive_local()
}

impl Default for EvaluationContext {
	fn default() -> Self {
		Self {
			values: HashMap::new(),
			now: local_now(),
		}
	}
}

impl EvaluationContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: add a context value.
	pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.values.insert(key.into(), value.into());
		self
	}

	/// Builder: pin the evaluation clock.
	pub fn with_now(mut self, now: NaiveDateTime) -> Self {
		self.now = now;
		self
	}

	/// Builder: pin the evaluation clock from a zoned timestamp (local wall time is kept).
	pub fn with_local_time(self, now: DateTime<Local>) -> Self {
		self.with_now(now.naive_local())
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	/// Calendar date used for activation-window checks.
	pub fn today(&self) -> NaiveDate {
		self.now.date()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rule(id: i64, effect: bool) -> Rule {
		Rule::new(RuleId::new(id), RuleType::UserAttr, "email", Operator::Equals, "x")
			.with_effect(effect)
	}

	#[test]
	fn operator_codes_round_trip() {
		for op in Operator::all() {
			assert_eq!(op.code().parse::<Operator>().unwrap(), *op);
		}
		assert!(matches!(
			"regex".parse::<Operator>(),
			Err(AuthError::UnknownOperator(code)) if code == "regex"
		));
	}

	#[test]
	fn rule_type_codes_round_trip() {
		for t in RuleType::all() {
			assert_eq!(t.code().parse::<RuleType>().unwrap(), *t);
		}
		assert!("group".parse::<RuleType>().is_err());
	}

	#[test]
	fn operator_serde_uses_codes() {
		assert_eq!(
			serde_json::to_string(&Operator::GreaterThanOrEquals).unwrap(),
			"\"gte\""
		);
		let op: Operator = serde_json::from_str("\"not_equals\"").unwrap();
		assert_eq!(op, Operator::NotEquals);
	}

	#[test]
	fn effect_of_empty_policy_is_none() {
		let policy = Policy::new(PolicyId::new(1), "p", "doc", "view");
		assert_eq!(policy.effect().unwrap(), None);
	}

	#[test]
	fn effect_of_uniform_policy() {
		let policy = Policy::new(PolicyId::new(1), "p", "doc", "view")
			.with_rule(rule(1, false))
			.with_rule(rule(2, false));
		assert_eq!(policy.effect().unwrap(), Some(false));
	}

	#[test]
	fn conflicting_effects_are_flagged() {
		let policy = Policy::new(PolicyId::new(8), "p", "doc", "view")
			.with_rule(rule(1, true))
			.with_rule(rule(2, false));
		assert!(matches!(
			policy.effect(),
			Err(AuthError::ConflictingEffects(id)) if id == PolicyId::new(8)
		));
	}

	#[test]
	fn sort_is_priority_desc_then_id_asc() {
		let mut policies = vec![
			Policy::new(PolicyId::new(3), "c", "doc", "view").with_priority(5),
			Policy::new(PolicyId::new(2), "b", "doc", "view").with_priority(10),
			Policy::new(PolicyId::new(1), "a", "doc", "view").with_priority(5),
		];
		sort_policies(&mut policies);
		let ids: Vec<i64> = policies.iter().map(|p| p.id.into_inner()).collect();
		assert_eq!(ids, vec![2, 1, 3]);
	}

	#[test]
	fn context_values() {
		let ctx = EvaluationContext::new().with_value("ip_address", "10.0.0.1");
		assert_eq!(ctx.get("ip_address"), Some("10.0.0.1"));
		assert_eq!(ctx.get("user_agent"), None);
	}

	#[test]
	fn local_time_pins_wall_clock_and_date() {
		use chrono::TimeZone;

		let at = Local.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
		let ctx = EvaluationContext::new().with_local_time(at);
		assert_eq!(ctx.now.to_string(), "2025-03-04 09:30:00");
		assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
	}
}
