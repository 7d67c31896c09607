// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot access checks described as JSON.
//!
//! A request names the subject, the resource and either an explicit `action`
//! or the HTTP `method` it would arrive with. When a method is given, the
//! client address and user agent are derived from `headers` and
//! `remote_addr` the same way the access gate derives them for live
//! requests. Entries in `context` are layered on top.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;
use warden_server_auth::{
	action_for_method, request_context, Decision, DecisionEngine, EvaluationContext, PolicyStore,
	Record, RequestMeta, User,
};
use warden_server_config::AuthzConfig;
use warden_server_db::PolicyRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
	pub user: User,
	pub resource: Record,
	#[serde(default)]
	pub action: Option<String>,
	#[serde(default)]
	pub method: Option<String>,
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	#[serde(default)]
	pub remote_addr: Option<IpAddr>,
	#[serde(default)]
	pub context: BTreeMap<String, String>,
	/// Local wall-clock time to evaluate at; defaults to now.
	#[serde(default)]
	pub at: Option<NaiveDateTime>,
}

impl CheckRequest {
	pub fn from_json(json: &str) -> anyhow::Result<Self> {
		serde_json::from_str(json).context("invalid access request")
	}

	/// Resolves the action and evaluation context for this request.
	pub fn prepare(&self, forwarded_header: &str) -> anyhow::Result<(String, EvaluationContext)> {
		let (action, mut context) = match (&self.action, &self.method) {
			(Some(_), Some(_)) => bail!("give either `action` or `method`, not both"),
			(None, None) => bail!("an access request needs an `action` or a `method`"),
			(Some(action), None) => (action.clone(), EvaluationContext::new()),
			(None, Some(method)) => {
				let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
					.with_context(|| format!("invalid HTTP method `{method}`"))?;
				let meta = RequestMeta::new(method, self.header_map()?, self.remote_addr);
				(
					action_for_method(&meta.method).to_string(),
					request_context(&meta, forwarded_header),
				)
			}
		};

		for (key, value) in &self.context {
			context = context.with_value(key.clone(), value.clone());
		}
		if let Some(at) = self.at {
			context = context.with_now(at);
		}
		Ok((action, context))
	}

	fn header_map(&self) -> anyhow::Result<HeaderMap> {
		let mut headers = HeaderMap::new();
		for (name, value) in &self.headers {
			let name = HeaderName::from_bytes(name.as_bytes())
				.with_context(|| format!("invalid header name `{name}`"))?;
			let value = HeaderValue::from_str(value)
				.with_context(|| format!("invalid value for header `{name}`"))?;
			headers.insert(name, value);
		}
		Ok(headers)
	}
}

/// Evaluates `request` against the policies stored in `pool`.
pub async fn run(
	pool: &SqlitePool,
	authz: &AuthzConfig,
	request: &CheckRequest,
) -> anyhow::Result<Decision> {
	let (action, context) = request.prepare(&authz.forwarded_header)?;

	// `authz.cache_enabled` applies to long-lived embedders only.
	let store: Arc<dyn PolicyStore> = Arc::new(PolicyRepository::new(pool.clone()));

	debug!(
		user_id = %request.user.id,
		resource_type = %request.resource.resource_type,
		action = %action,
		"checking access"
	);
	Ok(DecisionEngine::new(store)
		.decide(&request.user, &request.resource, &action, &context)
		.await)
}
