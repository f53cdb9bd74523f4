//! # Account Module
//!
//! Login verification, password changes, and the password-reset flow.
//!
//! Session tokens themselves are issued by the app layer. The core owns
//! `User::token_version`, which every token embeds, and one
//! [`RefreshSession`] per live refresh token. Anything that should end
//! existing sessions (reset, password change, "log out everywhere") bumps
//! the version and drops the user's refresh sessions.
//!
//! Refresh rotation: `open_session` stores a session whose id goes into the
//! refresh token. `rotate_session` deletes it and stores a successor in the
//! same transaction, so a refresh token can be exchanged exactly once.
//!
//! Reset flow:
//! 1. `issue_reset` stores a [`ResetTicket`] keyed by SHA-256 of a fresh
//!    token and hands the plain token to the caller for delivery.
//! 2. `consume_reset` hashes the presented token, checks expiry, sets the
//!    new password and deletes the ticket. Each token works once.

use crate::credentials::{
    ResetToken, check_password_policy, hash_password, sha256_hex, verify_password,
};
use crate::directory::{NewUser, Role, User, create_user};
use crate::storage::{Document, Store, WriteTx};
use crate::validate::normalize_email;
use crate::{HrError, HrResult};
use chrono::{DateTime, Duration, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

/// Persisted record of an outstanding password reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTicket {
    /// Hex SHA-256 of the token; the primary key.
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Document for ResetTicket {
    const KIND: &'static str = "reset ticket";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("reset_tickets");

    fn key(&self) -> &str {
        &self.token_hash
    }
}

/// Server-side half of one refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Document for RefreshSession {
    const KIND: &'static str = "refresh session";
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("refresh_sessions");

    fn key(&self) -> &str {
        &self.id
    }
}

/// `now + ttl`, refusing lifetimes past chrono's range.
pub fn expiry(now: DateTime<Utc>, ttl: Duration) -> HrResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| HrError::Validation("Lifetime is out of range".into()))
}

fn revoke(tx: &WriteTx, user: &mut User, now: DateTime<Utc>) -> HrResult<()> {
    user.token_version = user.token_version.wrapping_add(1);
    user.updated_at = now;
    drop_sessions_of(tx, &user.id, None)?;
    tx.put(user)
}

/// Delete `user_id`'s refresh sessions; with `expired_at`, only those
/// already expired at that instant.
pub(crate) fn drop_sessions_of(
    tx: &WriteTx,
    user_id: &str,
    expired_at: Option<DateTime<Utc>>,
) -> HrResult<()> {
    for session in tx.all::<RefreshSession>()? {
        let stale = expired_at.is_none_or(|at| session.expires_at <= at);
        if session.user_id == user_id && stale {
            tx.delete::<RefreshSession>(&session.id)?;
        }
    }
    Ok(())
}

fn start_session(
    tx: &WriteTx,
    user_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> HrResult<RefreshSession> {
    let session = RefreshSession {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: expiry(now, ttl)?,
    };
    tx.put(&session)?;
    Ok(session)
}

fn drop_tickets_of(tx: &WriteTx, user_id: &str) -> HrResult<()> {
    for ticket in tx.all::<ResetTicket>()? {
        if ticket.user_id == user_id {
            tx.delete::<ResetTicket>(&ticket.token_hash)?;
        }
    }
    Ok(())
}

/// Verify an email/password pair.
///
/// Unknown email, wrong password and inactive account are indistinguishable.
pub fn authenticate(store: &Store, email: &str, password: &str) -> HrResult<User> {
    let email = normalize_email(email);
    let user = store.read(|tx| match tx.user_id_by_email(&email)? {
        Some(id) => tx.get::<User>(&id),
        None => Ok(None),
    })?;
    match user {
        Some(user) if user.active && verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(HrError::InvalidCredentials),
    }
}

/// Start a password reset.
///
/// Returns the user, the plain token and its expiry, or `None` for unknown
/// or inactive accounts so callers can answer the same way regardless.
pub fn issue_reset(
    store: &Store,
    email: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> HrResult<Option<(User, ResetToken, DateTime<Utc>)>> {
    let email = normalize_email(email);
    let expires_at = expiry(now, ttl)?;
    store.write(|tx| {
        let user = match tx.user_id_by_email(&email)? {
            Some(id) => tx.get::<User>(&id)?,
            None => None,
        };
        let Some(user) = user.filter(|u| u.active) else {
            return Ok(None);
        };

        drop_tickets_of(tx, &user.id)?;
        let token = ResetToken::generate();
        tx.put(&ResetTicket {
            token_hash: token.digest(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at,
        })?;
        Ok(Some((user, token, expires_at)))
    })
}

/// Finish a password reset with the token from [`issue_reset`].
pub fn consume_reset(
    store: &Store,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> HrResult<User> {
    check_password_policy(new_password)?;
    let hash = sha256_hex(token.trim());

    let ticket = store.write(|tx| {
        let ticket = tx
            .get::<ResetTicket>(&hash)?
            .ok_or(HrError::InvalidResetToken)?;
        if ticket.expires_at <= now {
            tx.delete::<ResetTicket>(&hash)?;
            return Ok(None);
        }
        Ok(Some(ticket))
    })?;
    // The expired ticket's deletion is committed before reporting failure.
    let ticket = ticket.ok_or(HrError::InvalidResetToken)?;

    let password_hash = hash_password(new_password)?;
    store.write(|tx| {
        // Re-read: the ticket may have been consumed concurrently.
        if tx.get::<ResetTicket>(&hash)?.is_none() {
            return Err(HrError::InvalidResetToken);
        }
        let mut user: User = tx.require(&ticket.user_id)?;
        user.password_hash = password_hash;
        revoke(tx, &mut user, now)?;
        drop_tickets_of(tx, &user.id)?;
        Ok(user)
    })
}

/// Change a password knowing the current one.
pub fn change_password(
    store: &Store,
    user_id: &str,
    current: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> HrResult<User> {
    check_password_policy(new_password)?;
    let user: User = store.require(user_id)?;
    if !verify_password(current, &user.password_hash) {
        return Err(HrError::InvalidCredentials);
    }
    let password_hash = hash_password(new_password)?;
    store.write(|tx| {
        let mut user: User = tx.require(user_id)?;
        user.password_hash = password_hash;
        revoke(tx, &mut user, now)?;
        Ok(user)
    })
}

/// Invalidate every token issued to `user_id`.
pub fn revoke_sessions(store: &Store, user_id: &str, now: DateTime<Utc>) -> HrResult<User> {
    store.write(|tx| {
        let mut user: User = tx.require(user_id)?;
        revoke(tx, &mut user, now)?;
        Ok(user)
    })
}

/// Store a refresh session for `user_id`, pruning their expired ones.
pub fn open_session(
    store: &Store,
    user_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> HrResult<RefreshSession> {
    store.write(|tx| {
        tx.require::<User>(user_id)?;
        drop_sessions_of(tx, user_id, Some(now))?;
        start_session(tx, user_id, ttl, now)
    })
}

/// Exchange a live refresh session for a new one.
///
/// The presented session is consumed; a second exchange of the same id
/// fails with [`HrError::SessionExpired`].
pub fn rotate_session(
    store: &Store,
    session_id: &str,
    user_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> HrResult<(User, RefreshSession)> {
    store.write(|tx| {
        let session = tx
            .get::<RefreshSession>(session_id)?
            .filter(|s| s.user_id == user_id && s.expires_at > now)
            .ok_or(HrError::SessionExpired)?;
        tx.delete::<RefreshSession>(&session.id)?;

        let user = tx
            .get::<User>(user_id)?
            .filter(|u| u.active)
            .ok_or(HrError::SessionExpired)?;
        let next = start_session(tx, user_id, ttl, now)?;
        Ok((user, next))
    })
}

/// End one refresh session. Unknown ids are ignored.
pub fn close_session(store: &Store, session_id: &str) -> HrResult<()> {
    store.write(|tx| {
        tx.delete::<RefreshSession>(session_id)?;
        Ok(())
    })
}

/// Create the first administrator account.
///
/// Refuses when any administrator already exists.
pub fn bootstrap_admin(
    store: &Store,
    name: &str,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> HrResult<User> {
    let has_admin = store.all::<User>()?.iter().any(User::is_admin);
    if has_admin {
        return Err(HrError::Conflict("An administrator already exists".into()));
    }
    create_user(
        store,
        NewUser {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            role: Some(Role::Admin),
            ..NewUser::default()
        },
        now,
    )
}

// =============================================================================
// TESTS
// =============================================================================
