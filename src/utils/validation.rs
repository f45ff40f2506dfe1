//! Input validation primitives.
//!
//! Helpers for unwrapping required values with descriptive errors.

use crate::error::{Error, Result};
use regex::Regex;

/// Require an Option to contain a value, with hints for resolution.
pub fn require_with_hints<T>(
    opt: Option<T>,
    field: &str,
    message: &str,
    hints: Vec<String>,
) -> Result<T> {
    opt.ok_or_else(|| {
        hints.into_iter().fold(
            Error::validation_invalid_argument(field, message, None, None),
            Error::with_hint,
        )
    })
}

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None, None))
    } else {
        Ok(trimmed)
    }
}

/// Require a collection to be non-empty.
pub fn require_non_empty_vec<'a, T>(vec: &'a [T], field: &str, message: &str) -> Result<&'a [T]> {
    if vec.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None, None))
    } else {
        Ok(vec)
    }
}

/// Require a value to be a single token safe to splice into quoted source text
/// and file names: letters, digits, `.`, `_`, `+`, `-`.
pub fn require_token<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = require_non_empty(value, field, "Value cannot be empty")?;
    let re = Regex::new(r"^[A-Za-z0-9._+-]+$")
        .map_err(|e| Error::internal_unexpected(e.to_string()))?;
    if re.is_match(value) {
        Ok(value)
    } else {
        Err(Error::validation_invalid_argument(
            field,
            format!("'{}' may only contain letters, digits, '.', '_', '+', '-'", value),
            Some(value.to_string()),
            None,
        ))
    }
}
