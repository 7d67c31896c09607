// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the Warden policy server.
//!
//! Settings are layered from built-in defaults, an optional TOML file and
//! `WARDEN_SERVER_*` environment variables, in increasing precedence.
//!
//! # Usage
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("policies live in {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub authz: AuthzConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WARDEN_SERVER_*`)
/// 2. Config file (`/etc/warden/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let authz = layer.authz.unwrap_or_default().finalize();

	database.validate()?;
	authz.validate()?;

	info!(
		database = %database.url,
		max_connections = database.max_connections,
		log_level = %logging.level,
		cache_enabled = authz.cache_enabled,
		forwarded_header = %authz.forwarded_header,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		authz,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	struct FixedSource {
		precedence: Precedence,
		layer: ServerConfigLayer,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok(self.layer.clone())
		}
	}

	fn with_url(precedence: Precedence, url: &str) -> Box<dyn ConfigSource> {
		Box::new(FixedSource {
			precedence,
			layer: ServerConfigLayer {
				database: Some(DatabaseConfigLayer {
					url: Some(url.to_string()),
					..Default::default()
				}),
				..Default::default()
			},
		})
	}

	#[test]
	fn test_defaults_resolve() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, "sqlite:./warden.db");
		assert_eq!(config.logging.level, "info");
		assert!(!config.authz.cache_enabled);
		assert_eq!(config.authz.forwarded_header, "x-forwarded-for");
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_sources(vec![
			with_url(Precedence::Environment, "sqlite:env.db"),
			with_url(Precedence::ConfigFile, "sqlite:file.db"),
			Box::new(DefaultsSource),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:env.db");
	}

	#[test]
	fn test_non_sqlite_url_rejected() {
		let err = load_sources(vec![with_url(
			Precedence::ConfigFile,
			"postgres://localhost/warden",
		)])
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_invalid_forwarded_header_rejected() {
		let layer = ServerConfigLayer {
			authz: Some(AuthzConfigLayer {
				forwarded_header: Some("x:forwarded".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(
			finalize(layer),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_load_config_with_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(
			&path,
			"[logging]\nlevel = \"warden=debug\"\n\n[authz]\nforwarded_header = \"X-Real-IP\"\n",
		)
		.unwrap();

		let config = load_sources(vec![Box::new(DefaultsSource), Box::new(TomlSource::new(&path))])
			.unwrap();
		assert_eq!(config.logging.level, "warden=debug");
		assert_eq!(config.authz.forwarded_header, "x-real-ip");
	}

	proptest! {
		#[test]
		fn later_precedence_overrides_earlier(
			file_url in "[a-z]{1,8}",
			env_url in proptest::option::of("[a-z]{1,8}"),
		) {
			let mut sources = vec![with_url(Precedence::ConfigFile, &format!("sqlite:{file_url}.db"))];
			if let Some(env_url) = &env_url {
				sources.push(with_url(Precedence::Environment, &format!("sqlite:{env_url}.db")));
			}
			sources.reverse();

			let config = load_sources(sources).unwrap();
			let expected = env_url.unwrap_or(file_url);
			prop_assert_eq!(config.database.url, format!("sqlite:{expected}.db"));
		}
	}
}
