// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ABAC policy evaluation engine.
//!
//! Evaluation runs in three layers:
//!
//! 1. **Rule**: resolve the attribute and apply the operator. Unavailable
//!    attributes and comparison errors are a mismatch (fail closed).
//! 2. **Policy**: all rules must match (conjunction). A matched policy yields
//!    its single effect; anything else is "not applicable".
//! 3. **Decision**: active policies for the resource type and action are
//!    ordered by priority descending then id ascending, and the first
//!    applicable one decides. No applicable policy means deny.
//!
//! Nothing here mutates policies, subjects or resources, and the engine
//! holds no per-call state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::operators::CompareError;
use super::resolver::resolve;
use super::store::PolicyStore;
use super::types::{EvaluationContext, Policy, Rule};
use crate::attribute::Resource;
use crate::types::PolicyId;
use crate::user::User;

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
	/// A policy matched and its effect was used.
	PolicyMatched,
	/// No active policy was applicable; denied by default.
	NoApplicablePolicy,
	/// The policy store could not be read; denied.
	StoreUnavailable,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
	pub allowed: bool,
	/// The deciding policy, if any.
	pub policy_id: Option<PolicyId>,
	pub reason: DecisionReason,
}

impl Decision {
	pub fn matched(policy_id: PolicyId, allowed: bool) -> Self {
		Self {
			allowed,
			policy_id: Some(policy_id),
			reason: DecisionReason::PolicyMatched,
		}
	}

	pub fn no_applicable_policy() -> Self {
		Self {
			allowed: false,
			policy_id: None,
			reason: DecisionReason::NoApplicablePolicy,
		}
	}

	pub fn store_unavailable() -> Self {
		Self {
			allowed: false,
			policy_id: None,
			reason: DecisionReason::StoreUnavailable,
		}
	}
}

/// Evaluates one rule's match signal. Independent of the rule's effect.
pub fn evaluate_rule(
	subject: &User,
	resource: &dyn Resource,
	rule: &Rule,
	context: &EvaluationContext,
) -> bool {
	let Some(actual) = resolve(subject, resource, rule.rule_type, &rule.attribute_name, context)
	else {
		debug!(
			rule_id = %rule.id,
			rule_type = %rule.rule_type,
			attribute = %rule.attribute_name,
			"attribute unavailable"
		);
		return false;
	};

	match rule.operator.apply(&actual, &rule.value) {
		Ok(matched) => matched,
		Err(CompareError::NotNumeric(operand)) => {
			debug!(rule_id = %rule.id, operator = %rule.operator, operand = %operand, "non-numeric operand");
			false
		}
		Err(e) => {
			debug!(rule_id = %rule.id, error = %e, "comparison failed");
			false
		}
	}
}

/// Evaluates a policy.
///
/// Returns `None` when the policy is not applicable: it has no rules, a rule
/// does not match, or its rules disagree on the effect. Otherwise returns the
/// policy's effect.
pub fn evaluate_policy(
	subject: &User,
	resource: &dyn Resource,
	policy: &Policy,
	context: &EvaluationContext,
) -> Option<bool> {
	let effect = match policy.effect() {
		Ok(Some(effect)) => effect,
		Ok(None) => {
			debug!(policy_id = %policy.id, "policy has no rules");
			return None;
		}
		Err(e) => {
			error!(policy_id = %policy.id, policy = %policy.name, error = %e, "skipping policy");
			return None;
		}
	};

	for rule in &policy.rules {
		if !evaluate_rule(subject, resource, rule, context) {
			debug!(policy_id = %policy.id, rule_id = %rule.id, "rule did not match");
			return None;
		}
	}

	debug!(policy_id = %policy.id, effect, "policy matched");
	Some(effect)
}

/// Applies first-applicable-wins to `policies` after filtering and ordering.
///
/// Policies that do not govern the resource type and action, or are not
/// active on the context date, are ignored. The slice is not assumed sorted.
pub fn decide_among(
	policies: &[Policy],
	subject: &User,
	resource: &dyn Resource,
	action: &str,
	context: &EvaluationContext,
) -> Decision {
	let today = context.today();
	let resource_type = resource.resource_type();
	let mut candidates: Vec<&Policy> = policies
		.iter()
		.filter(|p| p.governs(resource_type, action) && p.is_active_on(today))
		.collect();
	candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

	candidates
		.into_iter()
		.find_map(|policy| {
			evaluate_policy(subject, resource, policy, context)
				.map(|allowed| Decision::matched(policy.id, allowed))
		})
		.unwrap_or_else(Decision::no_applicable_policy)
}

/// The decision engine, bound to a policy store.
#[derive(Clone)]
pub struct DecisionEngine {
	store: Arc<dyn PolicyStore>,
}

impl DecisionEngine {
	pub fn new(store: Arc<dyn PolicyStore>) -> Self {
		Self { store }
	}

	pub fn store(&self) -> &Arc<dyn PolicyStore> {
		&self.store
	}

	/// Decides whether `subject` may perform `action` on `resource`.
	///
	/// Never fails: store errors are logged and deny.
	#[instrument(
		level = "debug",
		skip(self, subject, resource, context),
		fields(
			user_id = %subject.id,
			resource_type = %resource.resource_type(),
			action = %action,
		)
	)]
	pub async fn decide(
		&self,
		subject: &User,
		resource: &dyn Resource,
		action: &str,
		context: &EvaluationContext,
	) -> Decision {
		let resource_type = resource.resource_type();
		let policies = match self
			.store
			.find_active_policies(resource_type, action, context.today())
			.await
		{
			Ok(policies) => policies,
			Err(e) => {
				warn!(error = %e, resource_type, action, "policy store unavailable, denying");
				return Decision::store_unavailable();
			}
		};

		let decision = decide_among(&policies, subject, resource, action, context);
		debug!(
			allowed = decision.allowed,
			policy_id = ?decision.policy_id,
			reason = ?decision.reason,
			"decision"
		);
		decision
	}

	/// Boolean form of [`DecisionEngine::decide`].
	pub async fn evaluate(
		&self,
		subject: &User,
		resource: &dyn Resource,
		action: &str,
		context: &EvaluationContext,
	) -> bool {
		self.decide(subject, resource, action, context).await.allowed
	}
}

impl std::fmt::Debug for DecisionEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DecisionEngine").finish_non_exhaustive()
	}
}
