// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization core for Warden.
//!
//! This crate provides:
//! - Subject and resource models ([`User`], [`UserProfile`], [`Resource`], [`Record`])
//! - The ABAC decision engine ([`abac`])
//! - The access gate that turns an inbound request into a decision ([`gate`])
//!
//! Persistence of policies lives in `warden-server-db`; this crate only
//! defines the [`PolicyStore`] seam it reads through.

pub mod abac;
pub mod attribute;
pub mod error;
pub mod gate;
pub mod types;
pub mod user;

pub use abac::{
	Decision, DecisionEngine, DecisionReason, EvaluationContext, Operator, Policy, PolicyStore,
	Rule, RuleType,
};
pub use attribute::{AttributeValue, Attributes, Record, Resource};
pub use error::AuthError;
pub use gate::{
	action_for_method, client_ip, request_context, AccessGate, AuthContext, CurrentUser,
	RequestMeta,
};
pub use types::{Activation, PolicyId, RuleId, Status, UserId};
pub use user::{
	Clearance, Gender, ProfileRole, User, UserProfile, USER_PROFILE_RESOURCE_TYPE,
};
