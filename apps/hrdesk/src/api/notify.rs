//! Delivery of password-reset links.

use chrono::{DateTime, Utc};
use hrdesk_core::User;
use tracing::info;

/// Hands a reset token to the account owner.
pub trait ResetNotifier: Send + Sync {
    fn send_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>);
}

/// Writes the reset link to the log. Development stand-in for email.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    base_url: String,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn link(&self, token: &str) -> String {
        format!("{}?token={token}", self.base_url)
    }
}

impl ResetNotifier for LogNotifier {
    fn send_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>) {
        info!(
            user_id = %user.id,
            email = %user.email,
            %expires_at,
            link = %self.link(token),
            "password reset link"
        );
    }
}
