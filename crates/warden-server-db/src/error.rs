// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use warden_server_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Validation failed: {0}")]
	Validation(String),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for AuthError {
	fn from(e: DbError) -> Self {
		AuthError::Store(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn store_errors_surface_as_auth_store_errors() {
		let err: AuthError = DbError::Internal("pool closed".to_string()).into();
		assert!(matches!(err, AuthError::Store(msg) if msg == "Internal: pool closed"));
	}
}
