//! # Credentials Module
//!
//! Password hashing and password-reset tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Reset tokens are 32 random
//! bytes handed to the user once (base64url, no padding); only their
//! SHA-256 hex digest is persisted, so a leaked database cannot be replayed
//! against the reset endpoint.

use crate::{HrError, HrResult};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Random bytes in a reset token.
pub const RESET_TOKEN_BYTES: usize = 32;

/// Reject passwords that do not meet the policy.
pub fn check_password_policy(plain: &str) -> HrResult<()> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(HrError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(plain: &str) -> HrResult<String> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HrError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// An unparseable stored hash counts as a mismatch.
#[must_use]
pub fn verify_password(plain: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hex SHA-256 of a token, the form kept at rest.
#[must_use]
pub fn sha256_hex(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A freshly generated reset token. The plain value leaves the process once.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn digest(&self) -> String {
        sha256_hex(&self.0)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

// Tokens are secrets; keep them out of logs.
impl std::fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResetToken(..)")
    }
}
