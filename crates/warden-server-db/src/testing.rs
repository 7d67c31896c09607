// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers: in-memory pools with and without the schema.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations::run_migrations;

/// A single-connection in-memory pool. Every connection to `:memory:` is its
/// own database, so the pool must never open a second one.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true)
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

/// An in-memory pool with the policy schema applied.
pub async fn create_policy_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool)
		.await
		.expect("Failed to run migrations");
	pool
}
