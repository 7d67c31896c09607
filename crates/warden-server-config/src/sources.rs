// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{AuthzConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Default location of the system config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/warden/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WARDEN_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl EnvSource {
	/// Builds a layer from an arbitrary variable lookup.
	pub fn load_from(
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<ServerConfigLayer, ConfigError> {
		let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

		Ok(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: var("WARDEN_SERVER_DATABASE_URL"),
				max_connections: parse_number(
					"WARDEN_SERVER_DATABASE_MAX_CONNECTIONS",
					var("WARDEN_SERVER_DATABASE_MAX_CONNECTIONS"),
				)?,
				busy_timeout_ms: parse_number(
					"WARDEN_SERVER_DATABASE_BUSY_TIMEOUT_MS",
					var("WARDEN_SERVER_DATABASE_BUSY_TIMEOUT_MS"),
				)?,
			}),
			logging: Some(LoggingConfigLayer {
				level: var("WARDEN_SERVER_LOG_LEVEL"),
			}),
			authz: Some(AuthzConfigLayer {
				cache_enabled: parse_bool(
					"WARDEN_SERVER_AUTHZ_CACHE_ENABLED",
					var("WARDEN_SERVER_AUTHZ_CACHE_ENABLED"),
				)?,
				forwarded_header: var("WARDEN_SERVER_AUTHZ_FORWARDED_HEADER"),
			}),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::load_from(|name| std::env::var(name).ok())
	}
}

fn parse_number<T: std::str::FromStr>(
	name: &str,
	value: Option<String>,
) -> Result<Option<T>, ConfigError> {
	value
		.map(|v| {
			v.trim().parse().map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid number '{v}'"),
			})
		})
		.transpose()
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
	match value {
		None => Ok(None),
		Some(v) => match v.to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" | "on" => Ok(Some(true)),
			"0" | "false" | "no" | "off" => Ok(Some(false)),
			_ => Err(ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid boolean value '{v}'"),
			}),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_env_source_reads_all_sections() {
		let layer = EnvSource::load_from(env(&[
			("WARDEN_SERVER_DATABASE_URL", "sqlite:/tmp/w.db"),
			("WARDEN_SERVER_DATABASE_MAX_CONNECTIONS", "3"),
			("WARDEN_SERVER_LOG_LEVEL", "debug"),
			("WARDEN_SERVER_AUTHZ_CACHE_ENABLED", "TRUE"),
			("WARDEN_SERVER_AUTHZ_FORWARDED_HEADER", "x-real-ip"),
		]))
		.unwrap();

		let database = layer.database.unwrap();
		assert_eq!(database.url.as_deref(), Some("sqlite:/tmp/w.db"));
		assert_eq!(database.max_connections, Some(3));
		assert_eq!(database.busy_timeout_ms, None);
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
		let authz = layer.authz.unwrap();
		assert_eq!(authz.cache_enabled, Some(true));
		assert_eq!(authz.forwarded_header.as_deref(), Some("x-real-ip"));
	}

	#[test]
	fn test_env_source_ignores_empty_values() {
		let layer = EnvSource::load_from(env(&[("WARDEN_SERVER_DATABASE_URL", "")])).unwrap();
		assert!(layer.database.unwrap().url.is_none());
	}

	#[test]
	fn test_env_source_rejects_bad_number() {
		let err = EnvSource::load_from(env(&[("WARDEN_SERVER_DATABASE_BUSY_TIMEOUT_MS", "soon")]))
			.unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { key, .. } if key == "WARDEN_SERVER_DATABASE_BUSY_TIMEOUT_MS"
		));
	}

	#[test]
	fn test_env_source_rejects_bad_bool() {
		let err =
			EnvSource::load_from(env(&[("WARDEN_SERVER_AUTHZ_CACHE_ENABLED", "maybe")])).unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { key, .. } if key == "WARDEN_SERVER_AUTHZ_CACHE_ENABLED"
		));
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml")).load().unwrap();
		assert!(layer.database.is_none());
		assert!(layer.authz.is_none());
	}

	#[test]
	fn test_toml_source_parses_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/srv/warden.db"

[authz]
cache_enabled = true
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/srv/warden.db")
		);
		assert_eq!(layer.authz.unwrap().cache_enabled, Some(true));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[authz]\ncache_enabled = \"often\"").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
