// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-Based Access Control (ABAC) for policy-driven authorization.
//!
//! Policies are data: each one names a resource type and an action, carries a
//! priority, and holds a conjunction of attribute-comparison rules. The
//! engine loads the active policies for a request from a [`PolicyStore`],
//! orders them, and lets the first fully-matched one decide. When none
//! matches the request is denied.
//!
//! # Modules
//!
//! - [`types`]: Policies, rules, rule types, operators and the evaluation context
//! - [`resolver`]: One attribute source per rule type
//! - [`operators`]: The comparison table
//! - [`engine`]: Rule, policy and decision evaluation
//! - [`store`]: The policy-store trait plus in-memory and cached stores
//!
//! # Example
//!
//! ```ignore
//! use warden_server_auth::abac::{DecisionEngine, EvaluationContext, InMemoryPolicyStore};
//!
//! let engine = DecisionEngine::new(Arc::new(InMemoryPolicyStore::new(policies)));
//! let allowed = engine.evaluate(&user, &resource, "view", &EvaluationContext::new()).await;
//! ```

pub mod engine;
pub mod operators;
pub mod resolver;
pub mod store;
pub mod types;

pub use engine::{
	decide_among, evaluate_policy, evaluate_rule, Decision, DecisionEngine, DecisionReason,
};
pub use operators::{compare, CompareError};
pub use resolver::{resolve, AttributeSource};
pub use store::{
	active_view, CachedPolicyStore, InMemoryPolicyStore, PolicyCacheInvalidator, PolicyStore,
};
pub use types::{actions, sort_policies, EvaluationContext, Operator, Policy, Rule, RuleType};
