// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy administration subcommands.

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use sqlx::SqlitePool;
use warden_server_auth::{Policy, PolicyId, Status};
use warden_server_db::{seed_default_policies, NewPolicy, PolicyRepository};

/// Reads a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
	if path == Path::new("-") {
		let mut buf = String::new();
		std::io::stdin()
			.read_to_string(&mut buf)
			.context("failed to read stdin")?;
		return Ok(buf);
	}
	std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub async fn seed(pool: &SqlitePool) -> anyhow::Result<String> {
	let inserted = seed_default_policies(&PolicyRepository::new(pool.clone())).await?;
	Ok(format!("seeded {inserted} policies"))
}

pub async fn list(pool: &SqlitePool, resource_type: Option<&str>) -> anyhow::Result<String> {
	let policies = PolicyRepository::new(pool.clone())
		.list_policies(resource_type)
		.await?;
	if policies.is_empty() {
		return Ok("no policies".to_string());
	}

	let mut out = String::new();
	for policy in &policies {
		writeln!(
			out,
			"{:>5}  {:>4}  {:<8}  {:<16}  {:<8}  {} ({} rules)",
			policy.id,
			policy.priority,
			policy.activation.status.to_string(),
			policy.resource_type,
			policy.action,
			policy.name,
			policy.rules.len()
		)?;
	}
	Ok(out.trim_end().to_string())
}

pub async fn show(pool: &SqlitePool, id: PolicyId) -> anyhow::Result<String> {
	let policy = fetch(pool, id).await?;
	Ok(serde_json::to_string_pretty(&policy)?)
}

pub async fn create(pool: &SqlitePool, json: &str) -> anyhow::Result<String> {
	let policy: NewPolicy = serde_json::from_str(json).context("invalid policy document")?;
	let id = PolicyRepository::new(pool.clone())
		.create_policy(&policy)
		.await?;
	Ok(format!("created policy {id}"))
}

pub async fn set_status(pool: &SqlitePool, id: PolicyId, status: Status) -> anyhow::Result<String> {
	if !PolicyRepository::new(pool.clone())
		.set_policy_status(id, status)
		.await?
	{
		bail!("policy {id} not found");
	}
	Ok(format!("policy {id} is now {status}"))
}

pub async fn delete(pool: &SqlitePool, id: PolicyId) -> anyhow::Result<String> {
	if !PolicyRepository::new(pool.clone()).delete_policy(id).await? {
		bail!("policy {id} not found");
	}
	Ok(format!("deleted policy {id}"))
}

async fn fetch(pool: &SqlitePool, id: PolicyId) -> anyhow::Result<Policy> {
	PolicyRepository::new(pool.clone())
		.get_policy(id)
		.await?
		.with_context(|| format!("policy {id} not found"))
}
