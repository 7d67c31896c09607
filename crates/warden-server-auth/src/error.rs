// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and authorization error types.

use thiserror::Error;

use crate::types::PolicyId;

/// Errors surfaced by the auth crate.
///
/// Policy evaluation itself never fails; these errors come from the gate
/// (authentication / denial), from policy-store collaborators, and from
/// authoring-time validation of policies and rules.
#[derive(Debug, Error)]
pub enum AuthError {
	// =========================================================================
	// Gate
	// =========================================================================
	/// No authenticated subject on the request.
	#[error("authentication required")]
	AuthenticationRequired,

	/// Denied by policy evaluation (or by the absence of an applicable policy).
	#[error("access denied")]
	AccessDenied,

	// =========================================================================
	// Policy data
	// =========================================================================
	/// A stored operator code is not part of the operator table.
	#[error("unknown operator: {0}")]
	UnknownOperator(String),

	/// A stored rule-type code is not a known attribute source.
	#[error("unknown rule type: {0}")]
	UnknownRuleType(String),

	/// The rules of one policy disagree on their effect.
	#[error("policy {0} has rules with conflicting effects")]
	ConflictingEffects(PolicyId),

	/// A policy failed authoring-time validation.
	#[error("invalid policy: {0}")]
	InvalidPolicy(String),

	// =========================================================================
	// Collaborators
	// =========================================================================
	/// The policy store could not be read.
	#[error("policy store unavailable: {0}")]
	Store(String),
}

impl AuthError {
	/// Returns true for errors that map to "not authenticated" (401-style).
	pub fn is_unauthenticated(&self) -> bool {
		matches!(self, AuthError::AuthenticationRequired)
	}

	/// Returns true for errors that map to "forbidden" (403-style).
	pub fn is_forbidden(&self) -> bool {
		matches!(self, AuthError::AccessDenied)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_messages() {
		assert_eq!(
			AuthError::AuthenticationRequired.to_string(),
			"authentication required"
		);
		assert_eq!(AuthError::AccessDenied.to_string(), "access denied");
		assert_eq!(
			AuthError::ConflictingEffects(PolicyId::new(3)).to_string(),
			"policy 3 has rules with conflicting effects"
		);
		assert_eq!(
			AuthError::UnknownOperator("regex".to_string()).to_string(),
			"unknown operator: regex"
		);
	}

	#[test]
	fn classification() {
		assert!(AuthError::AuthenticationRequired.is_unauthenticated());
		assert!(!AuthError::AuthenticationRequired.is_forbidden());
		assert!(AuthError::AccessDenied.is_forbidden());
		assert!(!AuthError::Store("down".to_string()).is_forbidden());
	}
}
