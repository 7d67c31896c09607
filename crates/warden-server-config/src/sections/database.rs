// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy database settings.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_URL: &str = "sqlite:./warden.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where policies live and how the pool talks to SQLite.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	/// How long a connection waits on a locked database before failing.
	pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		DatabaseConfigLayer::default().finalize()
	}
}

impl DatabaseConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.url.starts_with("sqlite:") {
			return Err(ConfigError::InvalidValue {
				key: "database.url".to_string(),
				message: format!("'{}' must use the sqlite: scheme", self.url),
			});
		}
		if self.max_connections == 0 {
			return Err(ConfigError::InvalidValue {
				key: "database.max_connections".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub busy_timeout_ms: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		self.url = other.url.or(self.url.take());
		self.max_connections = other.max_connections.or(self.max_connections);
		self.busy_timeout_ms = other.busy_timeout_ms.or(self.busy_timeout_ms);
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
			max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
			busy_timeout_ms: self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_point_at_a_local_file() {
		let config = DatabaseConfig::default();
		assert_eq!(config.url, "sqlite:./warden.db");
		assert_eq!(config.max_connections, 5);
		assert_eq!(config.busy_timeout_ms, 5_000);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn merge_only_overrides_present_fields() {
		let mut base: DatabaseConfigLayer = toml::from_str(
			"url = \"sqlite:/var/lib/warden/policies.db\"\nmax_connections = 8\n",
		)
		.unwrap();
		base.merge(DatabaseConfigLayer {
			max_connections: Some(2),
			..Default::default()
		});

		let config = base.finalize();
		assert_eq!(config.url, "sqlite:/var/lib/warden/policies.db");
		assert_eq!(config.max_connections, 2);
	}

	#[test]
	fn rejects_other_schemes_and_empty_pools() {
		let postgres = DatabaseConfig {
			url: "postgres://localhost/warden".to_string(),
			..Default::default()
		};
		assert!(matches!(
			postgres.validate(),
			Err(ConfigError::InvalidValue { key, .. }) if key == "database.url"
		));

		let empty = DatabaseConfig {
			max_connections: 0,
			..Default::default()
		};
		assert!(matches!(
			empty.validate(),
			Err(ConfigError::InvalidValue { key, .. }) if key == "database.max_connections"
		));
	}
}
