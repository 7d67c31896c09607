// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The operator table: pure comparisons between a resolved attribute and a
//! rule's stored literal.
//!
//! String operators work on the [`fmt::Display`](std::fmt::Display) form of
//! the attribute. Ordering operators parse both sides as `f64` and return
//! [`CompareError::NotNumeric`] when either side does not parse; the rule
//! evaluator turns every error into a mismatch.

use thiserror::Error;

use super::types::Operator;
use crate::attribute::AttributeValue;

/// A comparison that could not be carried out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
	#[error("unknown operator: {0}")]
	UnknownOperator(String),

	#[error("operand is not numeric: {0:?}")]
	NotNumeric(String),
}

impl Operator {
	/// Compares `actual` against `literal`.
	pub fn apply(self, actual: &AttributeValue, literal: &str) -> Result<bool, CompareError> {
		match self {
			Operator::Equals => Ok(actual.to_string() == literal),
			Operator::NotEquals => Ok(actual.to_string() != literal),
			Operator::Contains => Ok(actual.to_string().contains(literal)),
			Operator::In => {
				let actual = actual.to_string();
				Ok(literal.split(',').any(|item| item.trim() == actual))
			}
			Operator::GreaterThan => numeric(actual, literal, |a, b| a > b),
			Operator::LessThan => numeric(actual, literal, |a, b| a < b),
			Operator::GreaterThanOrEquals => numeric(actual, literal, |a, b| a >= b),
			Operator::LessThanOrEquals => numeric(actual, literal, |a, b| a <= b),
		}
	}
}

fn numeric(
	actual: &AttributeValue,
	literal: &str,
	cmp: impl Fn(f64, f64) -> bool,
) -> Result<bool, CompareError> {
	let lhs = actual
		.as_number()
		.ok_or_else(|| CompareError::NotNumeric(actual.to_string()))?;
	let rhs: f64 = literal
		.trim()
		.parse()
		.map_err(|_| CompareError::NotNumeric(literal.to_string()))?;
	Ok(cmp(lhs, rhs))
}

/// Looks up `code` in the operator table and applies it.
pub fn compare(code: &str, actual: &AttributeValue, literal: &str) -> Result<bool, CompareError> {
	let operator: Operator = code
		.parse()
		.map_err(|_| CompareError::UnknownOperator(code.to_string()))?;
	operator.apply(actual, literal)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn text(s: &str) -> AttributeValue {
		AttributeValue::from(s)
	}

	mod string_operators {
		use super::*;

		#[test]
		fn equals_compares_string_forms() {
			assert_eq!(compare("equals", &text("ADMIN"), "ADMIN"), Ok(true));
			assert_eq!(compare("equals", &text("ADMIN"), "admin"), Ok(false));
			assert_eq!(compare("equals", &AttributeValue::from(42i64), "42"), Ok(true));
			assert_eq!(compare("equals", &AttributeValue::from(true), "True"), Ok(true));
			assert_eq!(compare("equals", &AttributeValue::from(true), "true"), Ok(false));
		}

		#[test]
		fn not_equals_is_negation() {
			assert_eq!(compare("not_equals", &text("BASIC"), "ADMIN"), Ok(true));
			assert_eq!(compare("not_equals", &text("ADMIN"), "ADMIN"), Ok(false));
		}

		#[test]
		fn contains_checks_literal_is_substring() {
			assert_eq!(
				compare("contains", &text("Mozilla/5.0 (X11)"), "Mozilla"),
				Ok(true)
			);
			assert_eq!(compare("contains", &text("curl/8.0"), "Mozilla"), Ok(false));
			assert_eq!(compare("contains", &text("abc"), ""), Ok(true));
		}

		#[test]
		fn in_matches_list_elements() {
			assert_eq!(compare("in", &text("CONTROL"), "ADMIN,CONTROL"), Ok(true));
			assert_eq!(compare("in", &text("CONTROL"), "ADMIN, CONTROL"), Ok(true));
			assert_eq!(compare("in", &text("CONT"), "ADMIN,CONTROL"), Ok(false));
			assert_eq!(compare("in", &AttributeValue::from(3i64), "1,2,3"), Ok(true));
		}
	}

	mod numeric_operators {
		use super::*;

		#[test]
		fn ordering() {
			let five = AttributeValue::from(5i64);
			assert_eq!(compare("gt", &five, "4"), Ok(true));
			assert_eq!(compare("gt", &five, "5"), Ok(false));
			assert_eq!(compare("gte", &five, "5"), Ok(true));
			assert_eq!(compare("lt", &five, "5.5"), Ok(true));
			assert_eq!(compare("lte", &five, "4.9"), Ok(false));
		}

		#[test]
		fn numeric_text_is_parsed() {
			assert_eq!(compare("gte", &text("100.50"), "100.5"), Ok(true));
		}

		#[test]
		fn non_numeric_literal_is_an_error() {
			assert_eq!(
				compare("gt", &AttributeValue::from(5i64), "ten"),
				Err(CompareError::NotNumeric("ten".to_string()))
			);
		}

		#[test]
		fn non_numeric_actual_is_an_error() {
			assert!(compare("lt", &text("many"), "3").is_err());
			assert!(compare("lt", &AttributeValue::from(true), "3").is_err());
		}
	}

	#[test]
	fn unknown_operator_is_an_error() {
		assert_eq!(
			compare("matches", &text("x"), "x"),
			Err(CompareError::UnknownOperator("matches".to_string()))
		);
	}
}
