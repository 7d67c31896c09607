// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy repository for database operations.
//!
//! This module provides persistence for ABAC policies and their rules, and
//! implements [`PolicyStore`] so the decision engine can read straight from
//! SQLite. Writes validate policies before they reach the table: every rule
//! of one policy must carry the same effect.

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::collections::BTreeMap;
use warden_server_auth::abac::{sort_policies, PolicyCacheInvalidator, PolicyStore};
use warden_server_auth::{
	Activation, AuthError, Operator, Policy, PolicyId, Rule, RuleId, RuleType, Status,
};

use crate::error::DbError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A rule to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
	pub rule_type: RuleType,
	pub attribute_name: String,
	pub operator: Operator,
	pub value: String,
	#[serde(default = "default_effect")]
	pub effect: bool,
	#[serde(default)]
	pub activation: Activation,
}

fn default_effect() -> bool {
	true
}

impl NewRule {
	pub fn new(
		rule_type: RuleType,
		attribute_name: impl Into<String>,
		operator: Operator,
		value: impl Into<String>,
	) -> Self {
		Self {
			rule_type,
			attribute_name: attribute_name.into(),
			operator,
			value: value.into(),
			effect: true,
			activation: Activation::active(),
		}
	}

	pub fn with_effect(mut self, effect: bool) -> Self {
		self.effect = effect;
		self
	}

	pub fn with_activation(mut self, activation: Activation) -> Self {
		self.activation = activation;
		self
	}
}

/// A policy to be inserted together with its rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPolicy {
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub resource_type: String,
	pub action: String,
	#[serde(default)]
	pub priority: i32,
	#[serde(default)]
	pub activation: Activation,
	#[serde(default)]
	pub rules: Vec<NewRule>,
}

impl NewPolicy {
	pub fn new(
		name: impl Into<String>,
		resource_type: impl Into<String>,
		action: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			resource_type: resource_type.into(),
			action: action.into(),
			priority: 0,
			activation: Activation::active(),
			rules: Vec::new(),
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	pub fn with_activation(mut self, activation: Activation) -> Self {
		self.activation = activation;
		self
	}

	pub fn with_rule(mut self, rule: NewRule) -> Self {
		self.rules.push(rule);
		self
	}

	/// Authoring-time checks run before any insert.
	pub fn validate(&self) -> Result<(), DbError> {
		for (field, value) in [
			("name", &self.name),
			("resource_type", &self.resource_type),
			("action", &self.action),
		] {
			if value.trim().is_empty() {
				return Err(DbError::Validation(format!("{field} must not be empty")));
			}
		}
		if let Some(first) = self.rules.first() {
			if self.rules.iter().any(|r| r.effect != first.effect) {
				return Err(DbError::Conflict(format!(
					"rules of policy {:?} disagree on effect",
					self.name
				)));
			}
		}
		for rule in &self.rules {
			validate_rule(rule)?;
		}
		Ok(())
	}
}

fn validate_rule(rule: &NewRule) -> Result<(), DbError> {
	if rule.attribute_name.trim().is_empty() {
		return Err(DbError::Validation(
			"attribute_name must not be empty".to_string(),
		));
	}
	if rule.operator.is_numeric() && rule.value.trim().parse::<f64>().is_err() {
		return Err(DbError::Validation(format!(
			"operator {} needs a numeric value, got {:?}",
			rule.operator, rule.value
		)));
	}
	Ok(())
}

/// Stamps an empty activation date with the creation date.
fn stamp(activation: Activation, today: NaiveDate) -> Activation {
	Activation {
		activate_date: activation.activate_date.or(Some(today)),
		..activation
	}
}

/// Repository for policy and rule database operations.
#[derive(Clone)]
pub struct PolicyRepository {
	pool: SqlitePool,
	invalidator: Option<PolicyCacheInvalidator>,
}

impl PolicyRepository {
	/// Create a new policy repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			invalidator: None,
		}
	}

	/// Builder: clear this cache after every write.
	pub fn with_invalidator(mut self, invalidator: PolicyCacheInvalidator) -> Self {
		self.invalidator = Some(invalidator);
		self
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	async fn invalidate(&self) {
		if let Some(invalidator) = &self.invalidator {
			invalidator.invalidate().await;
		}
	}

	/// Create a policy and its rules in one transaction.
	///
	/// Empty activation dates are stamped with today's date.
	///
	/// # Errors
	/// `DbError::Validation` for empty names or non-numeric literals on
	/// ordering operators, `DbError::Conflict` for rules with mixed effects.
	#[tracing::instrument(
		skip(self, policy),
		fields(name = %policy.name, resource_type = %policy.resource_type, action = %policy.action)
	)]
	pub async fn create_policy(&self, policy: &NewPolicy) -> Result<PolicyId, DbError> {
		policy.validate()?;

		let today = Local::now().date_naive();
		let now = Utc::now().to_rfc3339();
		let activation = stamp(policy.activation, today);

		let mut tx = self.pool.begin().await?;
		let id: i64 = sqlx::query_scalar(
			r#"
			INSERT INTO policies (
				name, description, resource_type, action, priority,
				status, activate_date, deactivate_date, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			RETURNING id
			"#,
		)
		.bind(&policy.name)
		.bind(&policy.description)
		.bind(&policy.resource_type)
		.bind(&policy.action)
		.bind(policy.priority)
		.bind(activation.status.code())
		.bind(format_date(activation.activate_date))
		.bind(format_date(activation.deactivate_date))
		.bind(&now)
		.bind(&now)
		.fetch_one(&mut *tx)
		.await?;
		let policy_id = PolicyId::new(id);

		for rule in &policy.rules {
			insert_rule(&mut tx, policy_id, rule, today, &now).await?;
		}
		tx.commit().await?;

		tracing::info!(policy_id = %policy_id, rules = policy.rules.len(), "policy created");
		self.invalidate().await;
		Ok(policy_id)
	}

	/// Append a rule to an existing policy.
	///
	/// # Errors
	/// `DbError::NotFound` if the policy does not exist, `DbError::Conflict`
	/// if the rule's effect differs from the policy's existing rules.
	#[tracing::instrument(skip(self, rule), fields(policy_id = %policy_id))]
	pub async fn add_rule(&self, policy_id: PolicyId, rule: &NewRule) -> Result<RuleId, DbError> {
		validate_rule(rule)?;

		let mut tx = self.pool.begin().await?;
		let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM policies WHERE id = ?")
			.bind(policy_id.into_inner())
			.fetch_optional(&mut *tx)
			.await?;
		if exists.is_none() {
			return Err(DbError::NotFound(format!("policy {policy_id}")));
		}

		let effects: Vec<bool> =
			sqlx::query_scalar("SELECT DISTINCT effect FROM rules WHERE policy_id = ?")
				.bind(policy_id.into_inner())
				.fetch_all(&mut *tx)
				.await?;
		if effects.iter().any(|e| *e != rule.effect) {
			return Err(DbError::Conflict(format!(
				"rule effect {} differs from the other rules of policy {policy_id}",
				rule.effect
			)));
		}

		let today = Local::now().date_naive();
		let now = Utc::now().to_rfc3339();
		let rule_id = insert_rule(&mut tx, policy_id, rule, today, &now).await?;
		sqlx::query("UPDATE policies SET updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(policy_id.into_inner())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		tracing::info!(policy_id = %policy_id, rule_id = %rule_id, "rule added");
		self.invalidate().await;
		Ok(rule_id)
	}

	/// Get a policy with all of its rules (active or not), ordered by id.
	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	pub async fn get_policy(&self, id: PolicyId) -> Result<Option<Policy>, DbError> {
		let mut tx = self.pool.begin().await?;
		let row = sqlx::query(
			r#"
			SELECT id, name, description, resource_type, action, priority,
			       status, activate_date, deactivate_date
			FROM policies
			WHERE id = ?
			"#,
		)
		.bind(id.into_inner())
		.fetch_optional(&mut *tx)
		.await?;

		let Some(row) = row else {
			return Ok(None);
		};
		let mut policy = parse_policy_row(&row)?;

		let rows = sqlx::query(
			r#"
			SELECT id, policy_id, rule_type, attribute_name, operator, value, effect,
			       status, activate_date, deactivate_date
			FROM rules
			WHERE policy_id = ?
			ORDER BY id ASC
			"#,
		)
		.bind(id.into_inner())
		.fetch_all(&mut *tx)
		.await?;
		tx.commit().await?;

		for row in &rows {
			policy.rules.push(parse_rule_row(row).map_err(invalid_row)?);
		}
		Ok(Some(policy))
	}

	/// Get a policy by name.
	#[tracing::instrument(skip(self))]
	pub async fn get_policy_by_name(&self, name: &str) -> Result<Option<Policy>, DbError> {
		let id: Option<i64> =
			sqlx::query_scalar("SELECT id FROM policies WHERE name = ? ORDER BY id ASC LIMIT 1")
				.bind(name)
				.fetch_optional(&self.pool)
				.await?;
		match id {
			Some(id) => self.get_policy(PolicyId::new(id)).await,
			None => Ok(None),
		}
	}

	/// List policies, optionally for one resource type, with all their rules.
	///
	/// Ordered by priority descending then id ascending.
	#[tracing::instrument(skip(self))]
	pub async fn list_policies(&self, resource_type: Option<&str>) -> Result<Vec<Policy>, DbError> {
		let mut tx = self.pool.begin().await?;
		let policy_rows = sqlx::query(
			r#"
			SELECT id, name, description, resource_type, action, priority,
			       status, activate_date, deactivate_date
			FROM policies
			WHERE (?1 IS NULL OR resource_type = ?1)
			ORDER BY priority DESC, id ASC
			"#,
		)
		.bind(resource_type)
		.fetch_all(&mut *tx)
		.await?;

		let rule_rows = sqlx::query(
			r#"
			SELECT r.id, r.policy_id, r.rule_type, r.attribute_name, r.operator, r.value,
			       r.effect, r.status, r.activate_date, r.deactivate_date
			FROM rules r
			JOIN policies p ON p.id = r.policy_id
			WHERE (?1 IS NULL OR p.resource_type = ?1)
			ORDER BY r.id ASC
			"#,
		)
		.bind(resource_type)
		.fetch_all(&mut *tx)
		.await?;
		tx.commit().await?;

		let mut rules = group_rules(&rule_rows)?;
		let mut policies = Vec::with_capacity(policy_rows.len());
		for row in &policy_rows {
			let mut policy = parse_policy_row(row)?;
			policy.rules = rules
				.remove(&policy.id)
				.unwrap_or_default()
				.into_iter()
				.collect::<Result<_, _>>()
				.map_err(invalid_row)?;
			policies.push(policy);
		}
		tracing::debug!(count = policies.len(), "listed policies");
		Ok(policies)
	}

	/// Switch a policy on or off.
	///
	/// # Returns
	/// `true` if the policy exists.
	#[tracing::instrument(skip(self), fields(policy_id = %id, status = %status))]
	pub async fn set_policy_status(&self, id: PolicyId, status: Status) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE policies SET status = ?, updated_at = ? WHERE id = ?")
			.bind(status.code())
			.bind(Utc::now().to_rfc3339())
			.bind(id.into_inner())
			.execute(&self.pool)
			.await?;

		let updated = result.rows_affected() > 0;
		if updated {
			tracing::info!(policy_id = %id, status = %status, "policy status changed");
			self.invalidate().await;
		}
		Ok(updated)
	}

	/// Delete a policy and its rules.
	///
	/// # Returns
	/// `true` if the policy existed.
	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	pub async fn delete_policy(&self, id: PolicyId) -> Result<bool, DbError> {
		let mut tx = self.pool.begin().await?;
		sqlx::query("DELETE FROM rules WHERE policy_id = ?")
			.bind(id.into_inner())
			.execute(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM policies WHERE id = ?")
			.bind(id.into_inner())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(policy_id = %id, "policy deleted");
			self.invalidate().await;
		}
		Ok(deleted)
	}

	/// Policies governing `resource_type` / `action` that are active on `on`,
	/// each with only its rules active on `on`.
	///
	/// Policies carrying a rule with an unknown rule type or operator code are
	/// skipped with a warning: such a rule can never match, so the policy
	/// could never apply.
	#[tracing::instrument(skip(self))]
	pub async fn find_active(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, DbError> {
		let on_text = on.format(DATE_FORMAT).to_string();
		let mut tx = self.pool.begin().await?;

		let policy_rows = sqlx::query(
			r#"
			SELECT id, name, description, resource_type, action, priority,
			       status, activate_date, deactivate_date
			FROM policies
			WHERE resource_type = ?1 AND action = ?2 AND status = 1
			  AND (activate_date IS NULL OR activate_date <= ?3)
			  AND (deactivate_date IS NULL OR deactivate_date > ?3)
			ORDER BY priority DESC, id ASC
			"#,
		)
		.bind(resource_type)
		.bind(action)
		.bind(&on_text)
		.fetch_all(&mut *tx)
		.await?;

		let rule_rows = sqlx::query(
			r#"
			SELECT r.id, r.policy_id, r.rule_type, r.attribute_name, r.operator, r.value,
			       r.effect, r.status, r.activate_date, r.deactivate_date
			FROM rules r
			JOIN policies p ON p.id = r.policy_id
			WHERE p.resource_type = ?1 AND p.action = ?2 AND r.status = 1
			  AND (r.activate_date IS NULL OR r.activate_date <= ?3)
			  AND (r.deactivate_date IS NULL OR r.deactivate_date > ?3)
			ORDER BY r.id ASC
			"#,
		)
		.bind(resource_type)
		.bind(action)
		.bind(&on_text)
		.fetch_all(&mut *tx)
		.await?;
		tx.commit().await?;

		let mut rules = group_rules(&rule_rows)?;
		let mut policies = Vec::with_capacity(policy_rows.len());
		'policies: for row in &policy_rows {
			let mut policy = parse_policy_row(row)?;
			for parsed in rules.remove(&policy.id).unwrap_or_default() {
				match parsed {
					Ok(rule) => policy.rules.push(rule),
					Err(e) => {
						tracing::warn!(
							policy_id = %policy.id,
							policy = %policy.name,
							error = %e,
							"skipping policy with malformed rule"
						);
						continue 'policies;
					}
				}
			}
			policies.push(policy);
		}

		sort_policies(&mut policies);
		tracing::debug!(count = policies.len(), "loaded active policies");
		Ok(policies)
	}
}

#[async_trait]
impl PolicyStore for PolicyRepository {
	async fn find_active_policies(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, AuthError> {
		Ok(self.find_active(resource_type, action, on).await?)
	}
}

async fn insert_rule(
	tx: &mut Transaction<'_, Sqlite>,
	policy_id: PolicyId,
	rule: &NewRule,
	today: NaiveDate,
	now: &str,
) -> Result<RuleId, DbError> {
	let activation = stamp(rule.activation, today);
	let id: i64 = sqlx::query_scalar(
		r#"
		INSERT INTO rules (
			policy_id, rule_type, attribute_name, operator, value, effect,
			status, activate_date, deactivate_date, created_at, updated_at
		) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		RETURNING id
		"#,
	)
	.bind(policy_id.into_inner())
	.bind(rule.rule_type.code())
	.bind(&rule.attribute_name)
	.bind(rule.operator.code())
	.bind(&rule.value)
	.bind(rule.effect)
	.bind(activation.status.code())
	.bind(format_date(activation.activate_date))
	.bind(format_date(activation.deactivate_date))
	.bind(now)
	.bind(now)
	.fetch_one(&mut **tx)
	.await?;
	Ok(RuleId::new(id))
}

type ParsedRules = BTreeMap<PolicyId, Vec<Result<Rule, AuthError>>>;

/// Groups rule rows by policy, keeping per-row code errors for the caller.
fn group_rules(rows: &[SqliteRow]) -> Result<ParsedRules, DbError> {
	let mut grouped = ParsedRules::new();
	for row in rows {
		let policy_id = PolicyId::new(row.try_get("policy_id")?);
		grouped
			.entry(policy_id)
			.or_default()
			.push(parse_rule_row(row));
	}
	Ok(grouped)
}

fn invalid_row(e: AuthError) -> DbError {
	DbError::Internal(format!("invalid rule row: {e}"))
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
	date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(value: Option<String>, column: &str) -> Result<Option<NaiveDate>, DbError> {
	value
		.map(|s| {
			NaiveDate::parse_from_str(&s, DATE_FORMAT)
				.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
		})
		.transpose()
}

fn parse_activation(row: &SqliteRow) -> Result<Activation, DbError> {
	let status: i64 = row.try_get("status")?;
	Ok(Activation {
		status: Status::from_code(status),
		activate_date: parse_date(row.try_get("activate_date")?, "activate_date")?,
		deactivate_date: parse_date(row.try_get("deactivate_date")?, "deactivate_date")?,
	})
}

fn parse_policy_row(row: &SqliteRow) -> Result<Policy, DbError> {
	Ok(Policy {
		id: PolicyId::new(row.try_get("id")?),
		name: row.try_get("name")?,
		description: row.try_get("description")?,
		resource_type: row.try_get("resource_type")?,
		action: row.try_get("action")?,
		priority: row.try_get("priority")?,
		activation: parse_activation(row)?,
		rules: Vec::new(),
	})
}

/// Parses a rule row. Unknown codes come back as the matching [`AuthError`];
/// column and date errors are folded into [`AuthError::Store`].
fn parse_rule_row(row: &SqliteRow) -> Result<Rule, AuthError> {
	let column = |e: sqlx::Error| AuthError::Store(e.to_string());
	let rule_type: String = row.try_get("rule_type").map_err(column)?;
	let operator: String = row.try_get("operator").map_err(column)?;

	Ok(Rule {
		id: RuleId::new(row.try_get("id").map_err(column)?),
		rule_type: rule_type.parse()?,
		attribute_name: row.try_get("attribute_name").map_err(column)?,
		operator: operator.parse()?,
		value: row.try_get("value").map_err(column)?,
		effect: row.try_get("effect").map_err(column)?,
		activation: parse_activation(row)?,
	})
}
