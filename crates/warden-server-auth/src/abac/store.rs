// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy-store collaborator.
//!
//! The engine reads policies through [`PolicyStore`] and never writes them.
//! Two implementations live here:
//!
//! - [`InMemoryPolicyStore`] - a locked vector, for tests and embedders that
//!   load policies from elsewhere
//! - [`CachedPolicyStore`] - a process-wide cache in front of any store, with
//!   an explicit [`PolicyCacheInvalidator`] that writers call after every
//!   policy or rule change
//!
//! The SQLite-backed store lives in `warden-server-db`.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::types::{sort_policies, Policy};
use crate::error::AuthError;
use crate::types::PolicyId;

/// Read access to active policies.
///
/// Implementations return policies governing `resource_type` / `action` that
/// are active on `on`, each carrying only its rules that are active on `on`,
/// ordered by id. Returned policies should be ordered by priority descending
/// then id ascending; the engine re-sorts regardless.
#[async_trait]
pub trait PolicyStore: Send + Sync {
	async fn find_active_policies(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, AuthError>;
}

#[async_trait]
impl<S: PolicyStore + ?Sized> PolicyStore for Arc<S> {
	async fn find_active_policies(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, AuthError> {
		(**self).find_active_policies(resource_type, action, on).await
	}
}

/// Narrows a full policy to what participates in evaluation on `on`.
pub fn active_view(policy: &Policy, on: NaiveDate) -> Policy {
	let mut view = policy.clone();
	view.rules.retain(|rule| rule.activation.is_active_on(on));
	view.rules.sort_by_key(|rule| rule.id);
	view
}

// =============================================================================
// In-memory store
// =============================================================================

/// Policies held in memory behind a read-write lock.
#[derive(Default)]
pub struct InMemoryPolicyStore {
	policies: RwLock<Vec<Policy>>,
}

impl InMemoryPolicyStore {
	pub fn new(policies: Vec<Policy>) -> Self {
		Self {
			policies: RwLock::new(policies),
		}
	}

	/// Adds a policy, replacing any existing policy with the same id.
	pub async fn upsert(&self, policy: Policy) {
		let mut policies = self.policies.write().await;
		policies.retain(|p| p.id != policy.id);
		policies.push(policy);
	}

	/// Removes a policy. Returns true if it existed.
	pub async fn remove(&self, id: PolicyId) -> bool {
		let mut policies = self.policies.write().await;
		let before = policies.len();
		policies.retain(|p| p.id != id);
		policies.len() != before
	}

	pub async fn len(&self) -> usize {
		self.policies.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.policies.read().await.is_empty()
	}
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
	async fn find_active_policies(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, AuthError> {
		let policies = self.policies.read().await;
		let mut found: Vec<Policy> = policies
			.iter()
			.filter(|p| p.governs(resource_type, action) && p.is_active_on(on))
			.map(|p| active_view(p, on))
			.collect();
		sort_policies(&mut found);
		Ok(found)
	}
}

// =============================================================================
// Cached store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	resource_type: String,
	action: String,
	on: NaiveDate,
}

/// Cached lookups plus a generation that every invalidation bumps.
///
/// A miss records the generation before reading the inner store and only
/// inserts if it is unchanged afterwards, so a result read before a write
/// can never be cached after that write's invalidation.
#[derive(Default)]
struct CacheState {
	generation: u64,
	entries: HashMap<CacheKey, Vec<Policy>>,
}

type PolicyCache = Arc<Mutex<CacheState>>;

/// Caches [`PolicyStore::find_active_policies`] results until invalidated.
///
/// Errors from the inner store are passed through and never cached. Entries
/// for dates before the one being filled are dropped on every miss, so a
/// long-running process holds at most the current day's lookups (plus any
/// future dates callers ask about).
pub struct CachedPolicyStore<S> {
	inner: S,
	cache: PolicyCache,
}

impl<S: PolicyStore> CachedPolicyStore<S> {
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			cache: Arc::new(Mutex::new(CacheState::default())),
		}
	}

	/// A handle that clears this cache. Clone it into every writer.
	pub fn invalidator(&self) -> PolicyCacheInvalidator {
		PolicyCacheInvalidator {
			cache: Arc::clone(&self.cache),
		}
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	/// Number of cached (resource type, action, date) entries.
	pub async fn cached_entries(&self) -> usize {
		self.cache.lock().await.entries.len()
	}
}

#[async_trait]
impl<S: PolicyStore> PolicyStore for CachedPolicyStore<S> {
	async fn find_active_policies(
		&self,
		resource_type: &str,
		action: &str,
		on: NaiveDate,
	) -> Result<Vec<Policy>, AuthError> {
		let key = CacheKey {
			resource_type: resource_type.to_string(),
			action: action.to_string(),
			on,
		};

		let generation = {
			let state = self.cache.lock().await;
			if let Some(hit) = state.entries.get(&key) {
				debug!(resource_type, action, "policy cache hit");
				return Ok(hit.clone());
			}
			state.generation
		};

		let policies = self
			.inner
			.find_active_policies(resource_type, action, on)
			.await?;

		let mut state = self.cache.lock().await;
		if state.generation == generation {
			state.entries.retain(|cached, _| cached.on >= on);
			state.entries.insert(key, policies.clone());
		} else {
			debug!(resource_type, action, "policy cache invalidated during lookup");
		}
		Ok(policies)
	}
}

/// Clears a [`CachedPolicyStore`]. Writers call this after every policy or
/// rule change.
#[derive(Clone)]
pub struct PolicyCacheInvalidator {
	cache: PolicyCache,
}

impl PolicyCacheInvalidator {
	pub async fn invalidate(&self) {
		let mut state = self.cache.lock().await;
		state.generation = state.generation.wrapping_add(1);
		let evicted = state.entries.len();
		state.entries.clear();
		info!(evicted, generation = state.generation, "policy cache invalidated");
	}
}

impl std::fmt::Debug for PolicyCacheInvalidator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PolicyCacheInvalidator").finish_non_exhaustive()
	}
}
