// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization configuration: policy caching and client address lookup.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct AuthzConfig {
	/// Cache active-policy lookups until the next policy write.
	///
	/// Read by long-running embedders that wrap their policy repository in a
	/// `CachedPolicyStore` and attach its invalidator to the repository. The
	/// one-shot `warden` commands always read the store directly.
	pub cache_enabled: bool,
	/// Header whose first entry is taken as the client address.
	pub forwarded_header: String,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			cache_enabled: false,
			forwarded_header: DEFAULT_FORWARDED_HEADER.to_string(),
		}
	}
}

impl AuthzConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		let valid = !self.forwarded_header.is_empty()
			&& self
				.forwarded_header
				.bytes()
				.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
		if !valid {
			return Err(ConfigError::InvalidValue {
				key: "authz.forwarded_header".to_string(),
				message: format!("'{}' is not a valid header name", self.forwarded_header),
			});
		}
		Ok(())
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub cache_enabled: Option<bool>,
	#[serde(default)]
	pub forwarded_header: Option<String>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.cache_enabled.is_some() {
			self.cache_enabled = other.cache_enabled;
		}
		if other.forwarded_header.is_some() {
			self.forwarded_header = other.forwarded_header;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			cache_enabled: self.cache_enabled.unwrap_or(false),
			forwarded_header: self
				.forwarded_header
				.map(|h| h.trim().to_ascii_lowercase())
				.unwrap_or_else(|| DEFAULT_FORWARDED_HEADER.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = AuthzConfigLayer::default().finalize();
		assert_eq!(config, AuthzConfig::default());
		assert!(!config.cache_enabled);
		assert_eq!(config.forwarded_header, "x-forwarded-for");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_header_is_normalized() {
		let config = AuthzConfigLayer {
			cache_enabled: Some(true),
			forwarded_header: Some(" X-Real-IP ".to_string()),
		}
		.finalize();
		assert!(config.cache_enabled);
		assert_eq!(config.forwarded_header, "x-real-ip");
	}

	#[test]
	fn test_invalid_header_rejected() {
		let config = AuthzConfig {
			forwarded_header: "x forwarded".to_string(),
			..Default::default()
		};
		assert!(matches!(
			config.validate(),
			Err(ConfigError::InvalidValue { key, .. }) if key == "authz.forwarded_header"
		));
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = AuthzConfigLayer {
			cache_enabled: Some(true),
			forwarded_header: Some("x-real-ip".to_string()),
		};
		base.merge(AuthzConfigLayer {
			cache_enabled: Some(false),
			forwarded_header: None,
		});
		assert_eq!(base.cache_enabled, Some(false));
		assert_eq!(base.forwarded_header.as_deref(), Some("x-real-ip"));
	}
}
