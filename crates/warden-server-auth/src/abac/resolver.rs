// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute resolution.
//!
//! Each [`RuleType`] has one [`AttributeSource`] implementation. A source
//! returns `None` when the attribute is unavailable; the rule evaluator treats
//! that as a mismatch.

use chrono::Timelike;

use super::types::{EvaluationContext, RuleType};
use crate::attribute::{AttributeValue, Attributes, Resource};
use crate::user::User;

/// Prefix routing a `user_attr` lookup to the subject's profile.
pub const PROFILE_PREFIX: &str = "profile.";

/// Reserved environment names.
pub const ENV_TIME: &str = "time";
pub const ENV_DAY_OF_WEEK: &str = "day_of_week";

/// Reserved relationship names.
pub const REL_IS_OWNER: &str = "is_owner";
pub const REL_SAME_DEPARTMENT: &str = "same_department";

/// A read-only source of attribute values for one rule type.
pub trait AttributeSource: Send + Sync {
	fn resolve(
		&self,
		subject: &User,
		resource: &dyn Resource,
		name: &str,
		context: &EvaluationContext,
	) -> Option<AttributeValue>;
}

/// `user_attr`: fields on the subject or, with `profile.`, its profile.
pub struct UserAttributeSource;

impl AttributeSource for UserAttributeSource {
	fn resolve(
		&self,
		subject: &User,
		_resource: &dyn Resource,
		name: &str,
		_context: &EvaluationContext,
	) -> Option<AttributeValue> {
		match name.strip_prefix(PROFILE_PREFIX) {
			Some(field) => subject.profile()?.attribute(field),
			None => subject.attribute(name),
		}
	}
}

/// `resource_attr`: fields on the resource instance.
pub struct ResourceAttributeSource;

impl AttributeSource for ResourceAttributeSource {
	fn resolve(
		&self,
		_subject: &User,
		resource: &dyn Resource,
		name: &str,
		_context: &EvaluationContext,
	) -> Option<AttributeValue> {
		resource.attribute(name)
	}
}

/// `environment`: the evaluation clock, then the request context map.
pub struct EnvironmentSource;

impl AttributeSource for EnvironmentSource {
	fn resolve(
		&self,
		_subject: &User,
		_resource: &dyn Resource,
		name: &str,
		context: &EvaluationContext,
	) -> Option<AttributeValue> {
		match name {
			ENV_TIME => Some(context.now.hour().into()),
			ENV_DAY_OF_WEEK => Some(context.now.format("%A").to_string().into()),
			_ => context.get(name).map(Into::into),
		}
	}
}

/// `relationship`: facts derived from both subject and resource.
pub struct RelationshipSource;

impl AttributeSource for RelationshipSource {
	fn resolve(
		&self,
		subject: &User,
		resource: &dyn Resource,
		name: &str,
		_context: &EvaluationContext,
	) -> Option<AttributeValue> {
		match name {
			REL_IS_OWNER => Some((resource.owner_id() == Some(subject.id)).into()),
			REL_SAME_DEPARTMENT => {
				let profile = subject.profile()?;
				let same = match (resource.department(), profile.department.as_deref()) {
					(Some(theirs), Some(ours)) => theirs == ours,
					_ => false,
				};
				Some(same.into())
			}
			_ => None,
		}
	}
}

/// `amount`: numeric resource fields. Currently the same lookup as
/// `resource_attr`.
pub struct AmountSource;

impl AttributeSource for AmountSource {
	fn resolve(
		&self,
		subject: &User,
		resource: &dyn Resource,
		name: &str,
		context: &EvaluationContext,
	) -> Option<AttributeValue> {
		ResourceAttributeSource.resolve(subject, resource, name, context)
	}
}

impl RuleType {
	/// The source that resolves attributes of this rule type.
	pub fn source(self) -> &'static dyn AttributeSource {
		match self {
			RuleType::UserAttr => &UserAttributeSource,
			RuleType::ResourceAttr => &ResourceAttributeSource,
			RuleType::Environment => &EnvironmentSource,
			RuleType::Relationship => &RelationshipSource,
			RuleType::Amount => &AmountSource,
		}
	}
}

/// Resolves `name` under `rule_type`. `None` means unavailable.
pub fn resolve(
	subject: &User,
	resource: &dyn Resource,
	rule_type: RuleType,
	name: &str,
	context: &EvaluationContext,
) -> Option<AttributeValue> {
	rule_type.source().resolve(subject, resource, name, context)
}
