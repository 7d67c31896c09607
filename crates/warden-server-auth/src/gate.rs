// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access gate: per-request authorization in front of the decision engine.
//!
//! This module provides:
//! - [`CurrentUser`] / [`AuthContext`] - authentication state delivered by the
//!   external authentication layer
//! - [`RequestMeta`] - the parts of an inbound request the gate reads
//! - [`AccessGate`] - maps the request to an action and context, then asks the
//!   engine
//!
//! # Authorization Flow
//!
//! ```text
//! Request → AuthContext ──(unauthenticated)──→ AuthenticationRequired
//!               │
//!               ├── method → action (GET=view, POST=create, PUT/PATCH=edit, DELETE=delete)
//!               ├── forwarded-for / remote addr → ip_address
//!               └── User-Agent → user_agent
//!                       │
//!                       └──→ DecisionEngine::decide ──(deny)──→ AccessDenied
//! ```

use std::net::IpAddr;

use http::header::USER_AGENT;
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::abac::{actions, Decision, DecisionEngine, EvaluationContext};
use crate::attribute::Resource;
use crate::error::AuthError;
use crate::types::UserId;
use crate::user::User;

/// Header consulted for the client address unless configured otherwise.
pub const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";

/// Context key for the client address.
pub const CONTEXT_IP_ADDRESS: &str = "ip_address";
/// Context key for the client user agent.
pub const CONTEXT_USER_AGENT: &str = "user_agent";

/// The currently authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
	pub user: User,
}

impl CurrentUser {
	pub fn new(user: User) -> Self {
		Self { user }
	}

	pub fn id(&self) -> UserId {
		self.user.id
	}
}

/// Authentication state for request processing.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	/// Whether the request is authenticated.
	pub is_authenticated: bool,
	/// The current user, if authenticated.
	pub current_user: Option<CurrentUser>,
}

impl AuthContext {
	/// Create a new unauthenticated context.
	pub fn unauthenticated() -> Self {
		Self::default()
	}

	/// Create an authenticated context.
	pub fn authenticated(current_user: CurrentUser) -> Self {
		Self {
			is_authenticated: true,
			current_user: Some(current_user),
		}
	}

	pub fn user(&self) -> Option<&CurrentUser> {
		if self.is_authenticated {
			self.current_user.as_ref()
		} else {
			None
		}
	}

	/// Returns the current user or [`AuthError::AuthenticationRequired`].
	pub fn require_user(&self) -> Result<&CurrentUser, AuthError> {
		self.user().ok_or(AuthError::AuthenticationRequired)
	}
}

/// Request metadata the gate reads.
#[derive(Debug, Clone)]
pub struct RequestMeta {
	pub method: Method,
	pub headers: HeaderMap,
	/// Address of the direct peer, if known.
	pub remote_addr: Option<IpAddr>,
}

impl RequestMeta {
	pub fn new(method: Method, headers: HeaderMap, remote_addr: Option<IpAddr>) -> Self {
		Self {
			method,
			headers,
			remote_addr,
		}
	}

	/// Builds metadata from the head of an `http` request.
	pub fn from_parts(parts: &http::request::Parts, remote_addr: Option<IpAddr>) -> Self {
		Self::new(parts.method.clone(), parts.headers.clone(), remote_addr)
	}
}

/// Maps an HTTP method to the canonical action verb.
pub fn action_for_method(method: &Method) -> &'static str {
	match *method {
		Method::GET => actions::VIEW,
		Method::POST => actions::CREATE,
		Method::PUT | Method::PATCH => actions::EDIT,
		Method::DELETE => actions::DELETE,
		_ => actions::VIEW,
	}
}

/// Client address: the first entry of `forwarded_header`, else the direct
/// peer address, else empty.
pub fn client_ip(headers: &HeaderMap, remote_addr: Option<IpAddr>, forwarded_header: &str) -> String {
	let forwarded = headers
		.get(forwarded_header)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|ip| !ip.is_empty());

	match forwarded {
		Some(ip) => ip.to_string(),
		None => remote_addr.map(|ip| ip.to_string()).unwrap_or_default(),
	}
}

/// Builds the evaluation context for a request.
pub fn request_context(request: &RequestMeta, forwarded_header: &str) -> EvaluationContext {
	let user_agent = request
		.headers
		.get(USER_AGENT)
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default();

	EvaluationContext::new()
		.with_value(
			CONTEXT_IP_ADDRESS,
			client_ip(&request.headers, request.remote_addr, forwarded_header),
		)
		.with_value(CONTEXT_USER_AGENT, user_agent)
}

/// Authorizes requests against the decision engine.
#[derive(Debug, Clone)]
pub struct AccessGate {
	engine: DecisionEngine,
	forwarded_header: String,
}

impl AccessGate {
	pub fn new(engine: DecisionEngine) -> Self {
		Self {
			engine,
			forwarded_header: DEFAULT_FORWARDED_HEADER.to_string(),
		}
	}

	/// Builder: read the client address from a different header.
	pub fn with_forwarded_header(mut self, header: impl Into<String>) -> Self {
		self.forwarded_header = header.into().to_ascii_lowercase();
		self
	}

	pub fn engine(&self) -> &DecisionEngine {
		&self.engine
	}

	/// Request-level check: only authenticated subjects get further.
	pub fn has_permission(&self, auth: &AuthContext) -> bool {
		auth.user().is_some()
	}

	/// Object-level check: runs the engine for `resource`.
	pub async fn has_object_permission(
		&self,
		current_user: &CurrentUser,
		request: &RequestMeta,
		resource: &dyn Resource,
	) -> bool {
		self.decide(current_user, request, resource).await.allowed
	}

	/// Evaluates an object-level request and returns the full decision.
	pub async fn decide(
		&self,
		current_user: &CurrentUser,
		request: &RequestMeta,
		resource: &dyn Resource,
	) -> Decision {
		let action = action_for_method(&request.method);
		let context = request_context(request, &self.forwarded_header);
		self.engine
			.decide(&current_user.user, resource, action, &context)
			.await
	}

	/// Both checks in order, for callers that map errors to status codes.
	#[instrument(
		skip(self, auth, request, resource),
		fields(method = %request.method, resource_type = %resource.resource_type())
	)]
	pub async fn authorize(
		&self,
		auth: &AuthContext,
		request: &RequestMeta,
		resource: &dyn Resource,
	) -> Result<(), AuthError> {
		let current_user = auth.require_user()?;
		let decision = self.decide(current_user, request, resource).await;

		if decision.allowed {
			info!(user_id = %current_user.id(), policy_id = ?decision.policy_id, "access allowed");
			Ok(())
		} else {
			info!(
				user_id = %current_user.id(),
				policy_id = ?decision.policy_id,
				reason = ?decision.reason,
				"access denied"
			);
			Err(AuthError::AccessDenied)
		}
	}
}
