//! Form validation helpers
//!
//! A [`Validator`] collects errors for a single submitted form. Checks are
//! plain predicates built by the constructors below and applied one after
//! another with [`Validator::check_field`]; nothing short-circuits, so every
//! field gets checked.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Accumulated validation errors for one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validator {
    /// First error message recorded for each field
    pub field_errors: HashMap<String, String>,
    /// Errors that do not belong to a single field, in insertion order
    pub non_field_errors: Vec<String>,
}

impl Validator {
    /// True iff no field or non-field errors were recorded
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` for `key` unless the field already has an error
    pub fn add_field_error(&mut self, key: &str, message: impl Into<String>) {
        self.field_errors
            .entry(key.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record an error that is not tied to a field
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Run `predicate` on `value` and record `message` for `key` on failure
    pub fn check_field<T, P>(&mut self, predicate: P, value: &T, key: &str, message: &str)
    where
        T: ?Sized,
        P: Fn(&T) -> bool,
    {
        if !predicate(value) {
            self.add_field_error(key, message);
        }
    }
}

/// Shared email pattern (the WHATWG "valid email address" grammar)
pub fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+",
            r"@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
            r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        ))
        .expect("Failed to compile email regex")
    })
}

/// Value contains something other than whitespace
pub fn not_blank() -> impl Fn(&str) -> bool {
    |value| !value.trim().is_empty()
}

/// At most `limit` characters
pub fn max_chars(limit: usize) -> impl Fn(&str) -> bool {
    move |value| value.chars().count() <= limit
}

/// At least `limit` characters
pub fn min_chars(limit: usize) -> impl Fn(&str) -> bool {
    move |value| value.chars().count() >= limit
}

/// Value is one of `permitted`
pub fn permitted_value<T: PartialEq>(permitted: Vec<T>) -> impl Fn(&T) -> bool {
    move |value| permitted.contains(value)
}

/// Value matches `regex`
pub fn matches(regex: &'static Regex) -> impl Fn(&str) -> bool {
    move |value| regex.is_match(value)
}
