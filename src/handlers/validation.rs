//! Request field validation shared by the handlers.
//!
//! Errors are collected per field and reported together as a single
//! `VALIDATION_FAILED` response whose `details` maps field names to messages.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ApiError, validation_error};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex is valid"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Accumulates field errors.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Map<String, Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field`; the first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| Value::String(message.into()));
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Checks a character length range on a trimmed value.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: Option<usize>) {
        let len = value.trim().chars().count();
        match max {
            Some(max) if len < min || len > max => {
                self.add(field, format!("must be between {min} and {max} characters"))
            }
            None if len < min => self.add(field, format!("must be at least {min} characters")),
            _ => {}
        }
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error("Validation failed", Value::Object(self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email(" jane@example.co.uk "));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn length_checks() {
        let mut errors = FieldErrors::new();
        errors.length("name", "Al", 3, Some(50));
        errors.length("title", "A fine title", 5, Some(100));
        errors.length("description", "short", 20, None);

        assert!(errors.has("name"));
        assert!(!errors.has("title"));
        assert!(errors.has("description"));
    }

    #[test]
    fn reports_all_fields_in_details() {
        let mut errors = FieldErrors::new();
        errors.required("city", "  ");
        errors.add("price", "must be greater than 0");
        errors.add("price", "ignored");

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["city"], "is required");
        assert_eq!(details["price"], "must be greater than 0");
    }
}
