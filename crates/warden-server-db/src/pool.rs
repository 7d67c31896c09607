// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection pool for the policy database.

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

/// Pool sizing and lock handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
	pub max_connections: u32,
	/// Wait this long on a locked database before returning `SQLITE_BUSY`.
	pub busy_timeout: Duration,
}

impl Default for PoolSettings {
	fn default() -> Self {
		Self {
			max_connections: 5,
			busy_timeout: Duration::from_secs(5),
		}
	}
}

/// Opens the policy database, creating the file if needed.
///
/// Connections use WAL journaling and enforce foreign keys, which the
/// rule-to-policy cascade depends on.
///
/// # Errors
/// Returns `DbError::Internal` for an unparseable URL and `DbError::Sqlx` when
/// the first connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str, settings: PoolSettings) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(settings.busy_timeout)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(settings.max_connections)
		.connect_with(options)
		.await?;

	tracing::debug!("policy database pool ready");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn creates_database_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("warden.db");
		let url = format!("sqlite:{}", path.display());

		let pool = create_pool(&url, PoolSettings::default()).await.unwrap();
		let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
		assert_eq!(one, 1);
		assert!(path.exists());
	}

	#[tokio::test]
	async fn applies_pool_settings() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite:{}", dir.path().join("sized.db").display());
		let settings = PoolSettings {
			max_connections: 2,
			busy_timeout: Duration::from_millis(250),
		};

		let pool = create_pool(&url, settings).await.unwrap();
		assert_eq!(pool.options().get_max_connections(), 2);

		let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(foreign_keys, 1);
		let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(busy_timeout, 250);
	}

	#[tokio::test]
	async fn rejects_unknown_url_parameters() {
		let err = create_pool("sqlite::memory:?flavour=strawberry", PoolSettings::default())
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}
}
