//! JWT sessions.
//!
//! Access tokens travel in `Authorization: Bearer`. Refresh tokens live in
//! an `HttpOnly` cookie scoped to `/api/auth`. Both embed the user's token
//! version; a token whose version no longer matches the stored user is
//! rejected, which is how logout-all, password changes and deactivation
//! revoke sessions without a token blacklist.
//!
//! A refresh token also names its stored `RefreshSession` in `sid`. The
//! refresh endpoint consumes that session, so each refresh token is
//! accepted once.

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::config::ServerConfig;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use hrdesk_core::account::RefreshSession;
use hrdesk_core::{Role, User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    /// `User::token_version` at issue time.
    pub ver: u32,
    pub kind: TokenKind,
    /// Refresh session id; refresh tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// HS256 keys and lifetimes for both token kinds.
pub struct TokenKeys {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenKeys {
    pub fn new(config: &ServerConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        Self {
            access: KeyPair::new(&config.access_secret),
            refresh: KeyPair::new(&config.refresh_secret),
            access_ttl: Duration::minutes(i64::from(config.access_ttl_minutes)),
            refresh_ttl: Duration::days(i64::from(config.refresh_ttl_days)),
            validation,
        }
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`.
    #[must_use]
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Lifetime of the refresh session behind each refresh token.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.kind).encoding,
        )
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn issue_access(&self, user: &User, now: DateTime<Utc>) -> ApiResult<String> {
        let exp = now
            .checked_add_signed(self.access_ttl)
            .ok_or_else(|| ApiError::Internal("access token expiry out of range".into()))?;
        self.sign(&Claims {
            sub: user.id.clone(),
            role: user.role,
            ver: user.token_version,
            kind: TokenKind::Access,
            sid: None,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    /// Refresh token for a stored session; it expires with the session.
    pub fn issue_refresh(
        &self,
        user: &User,
        session: &RefreshSession,
        now: DateTime<Utc>,
    ) -> ApiResult<String> {
        self.sign(&Claims {
            sub: user.id.clone(),
            role: user.role,
            ver: user.token_version,
            kind: TokenKind::Refresh,
            sid: Some(session.id.clone()),
            iat: now.timestamp(),
            exp: session.expires_at.timestamp(),
        })
    }

    pub fn issue_pair(
        &self,
        user: &User,
        session: &RefreshSession,
        now: DateTime<Utc>,
    ) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access(user, now)?,
            refresh: self.issue_refresh(user, session, now)?,
        })
    }

    /// Check signature, expiry and kind. Staleness is checked against the
    /// store by [`resolve`].
    pub fn verify(&self, token: &str, kind: TokenKind) -> ApiResult<Claims> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)?;
        if data.claims.kind != kind {
            return Err(ApiError::unauthorized("Wrong token type"));
        }
        Ok(data.claims)
    }
}

/// Load the user behind verified claims and make sure the session is live.
pub async fn resolve(state: &AppState, claims: Claims) -> ApiResult<User> {
    let Claims { sub, ver, .. } = claims;
    let user = state.run(move |store| store.get::<User>(&sub)).await?;
    match user {
        None => Err(ApiError::unauthorized("Account no longer exists")),
        Some(user) if !user.active => Err(ApiError::unauthorized("Account is inactive")),
        Some(user) if user.token_version != ver => {
            Err(ApiError::unauthorized("Session has been revoked"))
        }
        Some(user) => Ok(user),
    }
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let claims = state.tokens.verify(token, TokenKind::Access)?;
        Ok(Self(resolve(state, claims).await?))
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Administrator access required"));
        }
        Ok(Self(user))
    }
}

// =============================================================================
// COOKIES
// =============================================================================

pub fn refresh_cookie(token: String, config: &ServerConfig) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path(REFRESH_COOKIE_PATH)
        .secure(config.cookie_secure)
        .max_age(time::Duration::days(i64::from(config.refresh_ttl_days)))
        .build()
}

/// Matches the refresh cookie's path so `CookieJar::remove` clears it.
pub fn cleared_refresh_cookie() -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE).path(REFRESH_COOKIE_PATH).build()
}
