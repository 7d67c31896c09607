// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{AuthzConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub authz: Option<AuthzConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(&mut self.authz, other.authz, AuthzConfigLayer::merge);
	}
}

fn merge_option<T>(target: &mut Option<T>, other: Option<T>, merge_fn: fn(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(t), Some(o)) => merge_fn(t, o),
		(None, Some(o)) => *target = Some(o),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(
			base.database.and_then(|d| d.url).as_deref(),
			Some("sqlite::memory:")
		);
	}

	#[test]
	fn test_merge_field_by_field() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
[authz]
cache_enabled = true
forwarded_header = "x-real-ip"
"#,
		)
		.unwrap();
		let overlay: ServerConfigLayer = toml::from_str(
			r#"
[authz]
cache_enabled = false
"#,
		)
		.unwrap();
		base.merge(overlay);

		let authz = base.authz.unwrap();
		assert_eq!(authz.cache_enabled, Some(false));
		assert_eq!(authz.forwarded_header.as_deref(), Some("x-real-ip"));
	}
}
