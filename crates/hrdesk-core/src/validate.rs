//! # Validate Module
//!
//! Shared field checks for incoming drafts and patches.
//!
//! Drafts arrive with every field optional so that absent fields can be
//! reported together instead of failing on the first one.

use crate::{HrError, HrResult};

/// Collects missing required fields while extracting their values.
///
/// ```ignore
/// let mut req = Required::default();
/// let name = req.text("name", draft.name);
/// let email = req.text("email", draft.email);
/// req.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    /// Take a required text field. Blank strings count as missing.
    pub fn text(&mut self, field: &'static str, value: Option<String>) -> String {
        match clean(value) {
            Some(text) => text,
            None => {
                self.missing.push(field);
                String::new()
            }
        }
    }

    /// Take a required non-text field.
    pub fn value<T: Default>(&mut self, field: &'static str, value: Option<T>) -> T {
        value.unwrap_or_else(|| {
            self.missing.push(field);
            T::default()
        })
    }

    /// Fail with every missing field, in the order they were checked.
    pub fn finish(self) -> HrResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(HrError::MissingFields(self.missing))
        }
    }
}

/// Trim optional text; blank becomes `None`.
#[must_use]
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Canonical form used for uniqueness and lookups.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Minimal shape check: `local@domain.tld`, no whitespace.
pub fn check_email(email: &str) -> HrResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(HrError::Validation(format!("Invalid email address: {email}")))
    }
}

/// Case-insensitive equality for names that must be unique.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
