//! `/api/auth`: login, refresh rotation, logout, password reset and change.

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::response::{ApiJson, done, ok};
use crate::api::session::{
    AuthUser, REFRESH_COOKIE, TokenKind, TokenPair, cleared_refresh_cookie, refresh_cookie,
    resolve,
};
use axum::{
    Router,
    extract::State,
    response::Response,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use hrdesk_core::account::{self, RefreshSession};
use hrdesk_core::validate::{Required, normalize_email};
use hrdesk_core::{User, UserView};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
        .route("/password", put(change_password))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Body returned whenever a new session is handed out.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserView,
}

/// Set the refresh cookie and build the body for a stored session.
fn session_response(
    state: &AppState,
    jar: CookieJar,
    user: User,
    session: &RefreshSession,
) -> ApiResult<(CookieJar, SessionBody)> {
    let TokenPair { access, refresh } = state.tokens.issue_pair(&user, session, Utc::now())?;
    let jar = jar.add(refresh_cookie(refresh, &state.config));
    Ok((
        jar,
        SessionBody {
            access_token: access,
            token_type: "Bearer",
            expires_in: state.tokens.access_ttl_secs(),
            user: UserView::from(user),
        },
    ))
}

/// Store a new refresh session for `user` and hand out its tokens.
async fn open_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> ApiResult<(CookieJar, SessionBody)> {
    let ttl = state.tokens.refresh_ttl();
    let id = user.id.clone();
    let session = state
        .run(move |store| account::open_session(store, &id, ttl, Utc::now()))
        .await?;
    session_response(state, jar, user, &session)
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Response)> {
    let mut req = Required::default();
    let email = req.text("email", body.email);
    let password = req.value("password", body.password);
    req.finish()?;

    let email = normalize_email(&email);
    state.throttle("login", &email)?;

    let attempt = email.clone();
    let user = state
        .run(move |store| account::authenticate(store, &attempt, &password))
        .await
        .inspect_err(|_| warn!(%email, "login failed"))?;

    info!(user_id = %user.id, "login");
    let (jar, body) = open_session(&state, jar, user).await?;
    Ok((jar, ok("Login successful", body)))
}

async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Response)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let claims = state.tokens.verify(&token, TokenKind::Refresh)?;
    let session_id = claims
        .sid
        .clone()
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;
    let user = resolve(&state, claims).await?;

    let ttl = state.tokens.refresh_ttl();
    let (user, session) = state
        .run(move |store| {
            account::rotate_session(store, &session_id, &user.id, ttl, Utc::now())
        })
        .await
        .inspect_err(|_| warn!("refresh token reuse or stale session"))?;

    info!(user_id = %user.id, "session refreshed");
    let (jar, body) = session_response(&state, jar, user, &session)?;
    Ok((jar, ok("Token refreshed", body)))
}

/// Clear the cookie and end its refresh session, if it names a live one.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Response)> {
    let session_id = jar
        .get(REFRESH_COOKIE)
        .and_then(|cookie| state.tokens.verify(cookie.value(), TokenKind::Refresh).ok())
        .and_then(|claims| claims.sid);
    if let Some(id) = session_id {
        state
            .run(move |store| account::close_session(store, &id))
            .await?;
    }
    Ok((jar.remove(cleared_refresh_cookie()), done("Logged out")))
}

async fn logout_all(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Response)> {
    let now = Utc::now();
    let id = user.id.clone();
    state
        .run(move |store| account::revoke_sessions(store, &id, now))
        .await?;
    info!(user_id = %user.id, "all sessions revoked");
    Ok((
        jar.remove(cleared_refresh_cookie()),
        done("Logged out of all sessions"),
    ))
}

async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Response> {
    let mut req = Required::default();
    let email = req.text("email", body.email);
    req.finish()?;

    let email = normalize_email(&email);
    state.throttle("forgot", &email)?;

    let now = Utc::now();
    let ttl = Duration::minutes(i64::from(state.config.reset_ttl_minutes));
    let issued = state
        .run(move |store| account::issue_reset(store, &email, ttl, now))
        .await?;

    if let Some((user, token, expires_at)) = issued {
        info!(user_id = %user.id, "password reset issued");
        state.notifier.send_reset(&user, token.as_str(), expires_at);
    }
    Ok(done(
        "If that email is registered, a password reset link has been sent",
    ))
}

async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<(CookieJar, Response)> {
    let mut req = Required::default();
    let token = req.value("token", body.token);
    let password = req.value("password", body.password);
    req.finish()?;

    let now = Utc::now();
    let user = state
        .run(move |store| account::consume_reset(store, &token, &password, now))
        .await?;

    info!(user_id = %user.id, "password reset completed");
    Ok((
        jar.remove(cleared_refresh_cookie()),
        done("Password has been reset, please log in"),
    ))
}

async fn me(AuthUser(user): AuthUser) -> Response {
    ok("Current user", UserView::from(user))
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<(CookieJar, Response)> {
    let mut req = Required::default();
    let current = req.value("current_password", body.current_password);
    let new_password = req.value("new_password", body.new_password);
    req.finish()?;

    let now = Utc::now();
    let id = user.id.clone();
    let user = state
        .run(move |store| account::change_password(store, &id, &current, &new_password, now))
        .await?;

    info!(user_id = %user.id, "password changed");
    // Other sessions are now stale; this one continues on fresh tokens.
    let (jar, body) = open_session(&state, jar, user).await?;
    Ok((jar, ok("Password changed", body)))
}
