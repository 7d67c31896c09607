// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bootstrap policies installed on a fresh database.

use warden_server_auth::abac::actions;
use warden_server_auth::{Operator, RuleType, USER_PROFILE_RESOURCE_TYPE};

use crate::error::DbError;
use crate::policy::{NewPolicy, NewRule, PolicyRepository};

/// Basic users may view their own profile.
pub const USER_PROFILE_VIEW_POLICY: &str = "UserProfile Policy Get";

/// The policies every deployment starts with.
pub fn default_policies() -> Vec<NewPolicy> {
	vec![NewPolicy::new(
		USER_PROFILE_VIEW_POLICY,
		USER_PROFILE_RESOURCE_TYPE,
		actions::VIEW,
	)
	.with_description("A policy to get a UserProfile")
	.with_priority(1)
	.with_rule(NewRule::new(
		RuleType::UserAttr,
		"profile.role",
		Operator::Equals,
		"BASIC",
	))
	.with_rule(NewRule::new(
		RuleType::Relationship,
		"is_owner",
		Operator::Equals,
		"True",
	))]
}

/// Installs each default policy whose name is not taken yet.
///
/// # Returns
/// The number of policies created.
#[tracing::instrument(skip(repo))]
pub async fn seed_default_policies(repo: &PolicyRepository) -> Result<usize, DbError> {
	let mut created = 0;
	for policy in default_policies() {
		if repo.get_policy_by_name(&policy.name).await?.is_some() {
			tracing::debug!(name = %policy.name, "default policy already present");
			continue;
		}
		repo.create_policy(&policy).await?;
		created += 1;
	}
	tracing::info!(created, "default policies seeded");
	Ok(created)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_policy_test_pool;

	#[tokio::test]
	async fn seeding_is_idempotent() {
		let repo = PolicyRepository::new(create_policy_test_pool().await);
		assert_eq!(seed_default_policies(&repo).await.unwrap(), 1);
		assert_eq!(seed_default_policies(&repo).await.unwrap(), 0);
		assert_eq!(repo.list_policies(None).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn profile_policy_shape() {
		let repo = PolicyRepository::new(create_policy_test_pool().await);
		seed_default_policies(&repo).await.unwrap();

		let policy = repo
			.get_policy_by_name(USER_PROFILE_VIEW_POLICY)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(policy.resource_type, "user_profile");
		assert_eq!(policy.action, "view");
		assert_eq!(policy.priority, 1);
		assert_eq!(policy.rules.len(), 2);
		assert_eq!(policy.rules[0].attribute_name, "profile.role");
		assert_eq!(policy.rules[1].rule_type, RuleType::Relationship);
		assert!(policy.rules.iter().all(|r| r.effect));
	}
}
