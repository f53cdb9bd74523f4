//! # Error Module
//!
//! The single error type returned by every core operation.

use thiserror::Error;

/// Result alias used across the core.
pub type HrResult<T> = Result<T, HrError>;

/// Errors produced by the HR domain engine.
#[derive(Debug, Error)]
pub enum HrError {
    /// The requested document does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The operation would break a uniqueness rule or an illegal state transition.
    #[error("{0}")]
    Conflict(String),

    /// A field is present but its value is unacceptable.
    #[error("{0}")]
    Validation(String),

    /// Required body fields were absent or blank.
    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Email/password pair did not match an active account.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Reset token unknown, already used, or expired.
    #[error("Password reset token is invalid or has expired")]
    InvalidResetToken,

    /// Refresh session unknown, already exchanged, or expired.
    #[error("Session has expired or been revoked")]
    SessionExpired,

    /// The caller may not perform this operation on this document.
    #[error("{0}")]
    Forbidden(String),

    /// Underlying redb failure.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// Document (de)serialization failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// Password hashing backend failure.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl HrError {
    /// Shorthand for [`HrError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

// redb splits its failures across several types; funnel them through redb::Error.
macro_rules! storage_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for HrError {
                fn from(err: $ty) -> Self {
                    Self::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_message_lists_every_field() {
        let err = HrError::MissingFields(vec!["name", "email"]);
        assert_eq!(err.to_string(), "Missing required field(s): name, email");
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = HrError::not_found("department", "abc");
        assert_eq!(err.to_string(), "department not found: abc");
    }
}
