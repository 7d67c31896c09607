// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Warden policies.
//!
//! [`PolicyRepository`] stores policies and rules and implements the
//! engine's `PolicyStore` seam.

pub mod error;
pub mod migrations;
pub mod policy;
pub mod pool;
pub mod seed;
pub mod testing;

pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use policy::{NewPolicy, NewRule, PolicyRepository};
pub use pool::{create_pool, PoolSettings};
pub use seed::{default_policies, seed_default_policies, USER_PROFILE_VIEW_POLICY};
