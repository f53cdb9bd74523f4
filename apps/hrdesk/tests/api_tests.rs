//! Integration tests for the HTTP API.
//!
//! Drives the full router in-process with axum-test. Each test gets a
//! fresh database seeded with one administrator.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use hrdesk::api::notify::ResetNotifier;
use hrdesk::api::{AppState, router};
use hrdesk::config::ServerConfig;
use hrdesk_core::account::bootstrap_admin;
use hrdesk_core::{Store, User};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const ADMIN_EMAIL: &str = "admin@corp.io";
const PASSWORD: &str = "password123";

/// Records reset tokens instead of delivering them.
#[derive(Default)]
struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ResetNotifier for CapturingNotifier {
    fn send_reset(&self, user: &User, token: &str, _expires_at: DateTime<Utc>) {
        self.sent
            .lock()
            .unwrap()
            .push((user.email.clone(), token.to_string()));
    }
}

struct Harness {
    server: TestServer,
    notifier: Arc<CapturingNotifier>,
    _dir: TempDir,
}

fn test_config() -> ServerConfig {
    ServerConfig::with_secrets(
        "access-secret-for-tests-access-secret",
        "refresh-secret-for-tests-refresh-secret",
    )
}

fn harness_with(config: ServerConfig) -> Harness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Store::open(dir.path().join("hrdesk.redb")).unwrap();
    bootstrap_admin(&store, "Root Admin", ADMIN_EMAIL, PASSWORD, Utc::now()).unwrap();

    let notifier = Arc::new(CapturingNotifier::default());
    let state = AppState::new(store, config, notifier.clone()).unwrap();
    let server = TestServer::new(router(state)).unwrap();
    Harness {
        server,
        notifier,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(test_config())
}

async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn admin_token(server: &TestServer) -> String {
    login(server, ADMIN_EMAIL, PASSWORD).await
}

/// Create an employee and return `(id, access token)`.
async fn employee(server: &TestServer, admin: &str, name: &str, email: &str) -> (String, String) {
    let response = server
        .post("/api/users")
        .authorization_bearer(admin)
        .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let token = login(server, email, PASSWORD).await;
    (id, token)
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

// =============================================================================
// ENVELOPE AND ROUTING TESTS
// =============================================================================

#[tokio::test]
async fn test_health_reports_version() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let h = harness();
    let response = h.server.get("/api/nothing-here").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = harness();
    let response = h
        .server
        .post("/api/auth/login")
        .text("{not json")
        .content_type("application/json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_missing_fields_are_named() {
    let h = harness();
    let response = h.server.post("/api/auth/login").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["message"],
        "Missing required field(s): email, password"
    );
}

// =============================================================================
// AUTH TESTS
// =============================================================================

#[tokio::test]
async fn test_login_returns_token_and_refresh_cookie() {
    let h = harness();
    let response = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ADMIN@corp.io", "password": PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 15 * 60);
    assert_eq!(body["data"]["user"]["id"], "EMP0001");
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert!(body["data"]["user"].get("token_version").is_none());

    let cookie = response.cookie("refresh_token");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/api/auth"));
}

#[tokio::test]
async fn test_login_failures_are_unauthorized() {
    let h = harness();
    for (email, password) in [(ADMIN_EMAIL, "wrong-password"), ("nobody@corp.io", PASSWORD)] {
        let response = h
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_login_is_rate_limited_per_email() {
    let mut config = test_config();
    config.auth_rate_per_minute = 2;
    let h = harness_with(config);

    for _ in 0..2 {
        h.server
            .post("/api/auth/login")
            .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
    h.server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_idle_throttle_keys_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("hrdesk.redb")).unwrap();
    let mut config = test_config();
    // One cell every millisecond, so a single attempt is forgotten quickly.
    config.auth_rate_per_minute = 60_000;
    let state = AppState::new(store, config, Arc::new(CapturingNotifier::default())).unwrap();

    for n in 0..50 {
        state.throttle("login", &format!("user{n}@corp.io")).unwrap();
    }
    assert_eq!(state.limiter.len(), 50);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(state.prune_limiter(), 0);

    // Pruning never forgets a key that is still inside its window.
    let mut strict = test_config();
    strict.auth_rate_per_minute = 1;
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("hrdesk.redb")).unwrap();
    let state = AppState::new(store, strict, Arc::new(CapturingNotifier::default())).unwrap();
    state.throttle("login", ADMIN_EMAIL).unwrap();
    assert_eq!(state.prune_limiter(), 1);
    assert!(state.throttle("login", ADMIN_EMAIL).is_err());
}

#[tokio::test]
async fn test_oversized_token_lifetime_is_refused_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("hrdesk.redb")).unwrap();
    let mut config = test_config();
    config.refresh_ttl_days = u32::MAX;
    assert!(AppState::new(store, config, Arc::new(CapturingNotifier::default())).is_err());
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let h = harness();
    h.server
        .get("/api/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/auth/me")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let response = h.server.get("/api/auth/me").authorization_bearer(&token).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_refresh_rotates_session_from_cookie() {
    let h = harness();
    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    let cookie = login.cookie("refresh_token");

    let response = h.server.post("/api/auth/refresh").add_cookie(cookie).await;
    response.assert_status_ok();
    let token = response.json::<Value>()["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!response.cookie("refresh_token").value().is_empty());

    h.server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_refresh_cookie_is_single_use() {
    let h = harness();
    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    let original = login.cookie("refresh_token");

    let refreshed = h
        .server
        .post("/api/auth/refresh")
        .add_cookie(original.clone())
        .await;
    refreshed.assert_status_ok();
    let rotated = refreshed.cookie("refresh_token");
    assert_ne!(rotated.value(), original.value());

    let replay = h.server.post("/api/auth/refresh").add_cookie(original).await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        replay.json::<Value>()["message"],
        "Session has expired or been revoked"
    );

    h.server
        .post("/api/auth/refresh")
        .add_cookie(rotated)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_logout_ends_the_refresh_session() {
    let h = harness();
    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    let cookie = login.cookie("refresh_token");

    h.server
        .post("/api/auth/logout")
        .add_cookie(cookie.clone())
        .await
        .assert_status_ok();
    h.server
        .post("/api/auth/refresh")
        .add_cookie(cookie)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_missing_or_wrong_kind() {
    let h = harness();
    h.server
        .post("/api/auth/refresh")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // An access token is signed with the other secret.
    let access = admin_token(&h.server).await;
    h.server
        .post("/api/auth/refresh")
        .add_cookie(axum_extra::extract::cookie::Cookie::new("refresh_token", access))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let h = harness();
    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    let cookie = login.cookie("refresh_token");

    let response = h.server.post("/api/auth/logout").add_cookie(cookie).await;
    response.assert_status_ok();
    assert!(response.cookie("refresh_token").value().is_empty());
}

#[tokio::test]
async fn test_logout_all_revokes_outstanding_tokens() {
    let h = harness();
    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    let cookie = login.cookie("refresh_token");
    let token = login.json::<Value>()["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    h.server
        .post("/api/auth/logout-all")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    let stale = h.server.get("/api/auth/me").authorization_bearer(&token).await;
    stale.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(stale.json::<Value>()["message"], "Session has been revoked");
    h.server
        .post("/api/auth/refresh")
        .add_cookie(cookie)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_answers_the_same_for_unknown_email() {
    let h = harness();
    let unknown = h
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "ghost@corp.io" }))
        .await;
    let known = h
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": ADMIN_EMAIL }))
        .await;

    unknown.assert_status_ok();
    known.assert_status_ok();
    assert_eq!(
        unknown.json::<Value>()["message"],
        known.json::<Value>()["message"]
    );
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let h = harness();
    let old_token = admin_token(&h.server).await;

    h.server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": ADMIN_EMAIL }))
        .await
        .assert_status_ok();
    let reset = h.notifier.last_token_for(ADMIN_EMAIL).unwrap();

    h.server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset, "password": "fresh-password" }))
        .await
        .assert_status_ok();

    // Single use.
    h.server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset, "password": "another-password" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Old sessions and password are gone.
    h.server
        .get("/api/auth/me")
        .authorization_bearer(&old_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .post("/api/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    login(&h.server, ADMIN_EMAIL, "fresh-password").await;
}

#[tokio::test]
async fn test_reset_with_unknown_token_fails() {
    let h = harness();
    h.server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": "made-up", "password": "fresh-password" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_keeps_current_session() {
    let h = harness();
    let old_token = admin_token(&h.server).await;

    let wrong = h
        .server
        .put("/api/auth/password")
        .authorization_bearer(&old_token)
        .json(&json!({ "current_password": "nope-nope", "new_password": "fresh-password" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .put("/api/auth/password")
        .authorization_bearer(&old_token)
        .json(&json!({ "current_password": PASSWORD, "new_password": "fresh-password" }))
        .await;
    response.assert_status_ok();
    let new_token = response.json::<Value>()["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    h.server
        .get("/api/auth/me")
        .authorization_bearer(&old_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/auth/me")
        .authorization_bearer(&new_token)
        .await
        .assert_status_ok();
}

// =============================================================================
// DIRECTORY TESTS
// =============================================================================

#[tokio::test]
async fn test_admin_creates_sequential_employees() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (first, _) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;
    let (second, _) = employee(&h.server, &admin, "Ben", "ben@corp.io").await;
    assert_eq!(first, "EMP0002");
    assert_eq!(second, "EMP0003");

    let duplicate = h
        .server
        .post("/api/users")
        .authorization_bearer(&admin)
        .json(&json!({ "name": "Ana 2", "email": "ANA@corp.io", "password": PASSWORD }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_employee_cannot_create_users() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .post("/api/users")
        .authorization_bearer(&ana)
        .json(&json!({ "name": "Eve", "email": "eve@corp.io", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_directory_search() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    employee(&h.server, &admin, "Ana Lima", "ana@corp.io").await;
    let (_, ben) = employee(&h.server, &admin, "Ben Okafor", "ben@corp.io").await;

    let response = h
        .server
        .get("/api/users")
        .add_query_param("search", "lima")
        .authorization_bearer(&ben)
        .await;
    response.assert_status_ok();
    let users = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], "Ana Lima");

    let admins = h
        .server
        .get("/api/users")
        .add_query_param("role", "admin")
        .authorization_bearer(&ben)
        .await;
    assert_eq!(admins.json::<Value>()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_employee_updates_only_own_profile_fields() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;
    let (ben_id, _) = employee(&h.server, &admin, "Ben", "ben@corp.io").await;

    let response = h
        .server
        .put(&format!("/api/users/{ana_id}"))
        .authorization_bearer(&ana)
        .json(&json!({ "phone": "+1 555 0100", "role": "admin" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["phone"], "+1 555 0100");
    assert_eq!(body["data"]["role"], "employee");

    h.server
        .put(&format!("/api/users/{ben_id}"))
        .authorization_bearer(&ana)
        .json(&json!({ "phone": "0" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .put(&format!("/api/users/{ana_id}"))
        .authorization_bearer(&admin)
        .json(&json!({ "active": false }))
        .await
        .assert_status_ok();

    h.server
        .get("/api/auth/me")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .post("/api/auth/login")
        .json(&json!({ "email": "ana@corp.io", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_cannot_remove_themselves() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    h.server
        .delete("/api/users/EMP0001")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
    h.server
        .put("/api/users/EMP0001")
        .authorization_bearer(&admin)
        .json(&json!({ "role": "employee" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_user() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, _) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .delete(&format!("/api/users/{ana_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    h.server
        .get(&format!("/api/users/{ana_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// DEPARTMENT / POSITION TESTS
// =============================================================================

#[tokio::test]
async fn test_departments_and_positions() {
    let h = harness();
    let admin = admin_token(&h.server).await;

    let dept = h
        .server
        .post("/api/departments")
        .authorization_bearer(&admin)
        .json(&json!({ "name": "Engineering" }))
        .await;
    dept.assert_status(StatusCode::CREATED);
    let dept_id = dept.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    h.server
        .post("/api/departments")
        .authorization_bearer(&admin)
        .json(&json!({ "name": "engineering" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let position = h
        .server
        .post("/api/positions")
        .authorization_bearer(&admin)
        .json(&json!({ "title": "Backend Engineer", "department_id": dept_id }))
        .await;
    position.assert_status(StatusCode::CREATED);

    let filtered = h
        .server
        .get("/api/positions")
        .add_query_param("department", &dept_id)
        .authorization_bearer(&admin)
        .await;
    let list = filtered.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Backend Engineer");

    // Still referenced by the position.
    h.server
        .delete(&format!("/api/departments/{dept_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_position_requires_existing_department() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    h.server
        .post("/api/positions")
        .authorization_bearer(&admin)
        .json(&json!({ "title": "Ghost", "department_id": "missing" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_employee_reads_but_cannot_write_master_data() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .get("/api/departments")
        .authorization_bearer(&ana)
        .await
        .assert_status_ok();
    h.server
        .post("/api/departments")
        .authorization_bearer(&ana)
        .json(&json!({ "name": "Shadow IT" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// =============================================================================
// EVENT TESTS
// =============================================================================

#[tokio::test]
async fn test_events_upcoming_filter() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    for (title, starts_on) in [("Launch party", "2000-01-01"), ("Centennial", "2099-06-01")] {
        h.server
            .post("/api/events")
            .authorization_bearer(&admin)
            .json(&json!({ "title": title, "starts_on": starts_on }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let all = h.server.get("/api/events").authorization_bearer(&admin).await;
    assert_eq!(all.json::<Value>()["data"].as_array().unwrap().len(), 2);

    let upcoming = h
        .server
        .get("/api/events")
        .add_query_param("upcoming", "true")
        .authorization_bearer(&admin)
        .await;
    let events = upcoming.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], "Centennial");
    assert_eq!(events[0]["created_by"], "EMP0001");
}

#[tokio::test]
async fn test_event_validation() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let response = h
        .server
        .post("/api/events")
        .authorization_bearer(&admin)
        .json(&json!({ "description": "no title" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["message"],
        "Missing required field(s): title, starts_on"
    );
}

// =============================================================================
// LEAVE TESTS
// =============================================================================

fn leave_body(from: &str, to: &str) -> Value {
    json!({ "leave_type": "annual", "from": from, "to": to, "reason": "Family trip" })
}

#[tokio::test]
async fn test_leave_approval_workflow() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    let applied = h
        .server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body("2099-03-02", "2099-03-04"))
        .await;
    applied.assert_status(StatusCode::CREATED);
    let body: Value = applied.json();
    assert_eq!(body["data"]["id"], "LV0001");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["employee_id"], ana_id.as_str());
    assert_eq!(body["data"]["days"], 3);

    h.server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body("2099-03-04", "2099-03-06"))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Employees cannot decide.
    h.server
        .post("/api/leaves/LV0001/decision")
        .authorization_bearer(&ana)
        .json(&json!({ "status": "approved" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let decided = h
        .server
        .post("/api/leaves/LV0001/decision")
        .authorization_bearer(&admin)
        .json(&json!({ "status": "approved", "remark": "Enjoy" }))
        .await;
    decided.assert_status_ok();
    let body: Value = decided.json();
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["review"]["reviewer_id"], "EMP0001");

    // No longer pending.
    h.server
        .post("/api/leaves/LV0001/cancel")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::CONFLICT);
    h.server
        .delete("/api/leaves/LV0001")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_decision_must_approve_or_reject() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;
    h.server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body("2099-03-02", "2099-03-02"))
        .await
        .assert_status(StatusCode::CREATED);

    h.server
        .post("/api/leaves/LV0001/decision")
        .authorization_bearer(&admin)
        .json(&json!({ "status": "cancelled" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaves_are_private_to_their_owner() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;
    let (_, ben) = employee(&h.server, &admin, "Ben", "ben@corp.io").await;

    h.server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body("2099-05-01", "2099-05-02"))
        .await
        .assert_status(StatusCode::CREATED);

    h.server
        .get("/api/leaves/LV0001")
        .authorization_bearer(&ben)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .put("/api/leaves/LV0001")
        .authorization_bearer(&ben)
        .json(&json!({ "reason": "Hijack" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let ben_list = h.server.get("/api/leaves").authorization_bearer(&ben).await;
    assert!(ben_list.json::<Value>()["data"].as_array().unwrap().is_empty());

    let pending = h
        .server
        .get("/api/leaves")
        .add_query_param("status", "pending")
        .authorization_bearer(&admin)
        .await;
    assert_eq!(pending.json::<Value>()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_owner_edits_and_cancels_pending_leave() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;
    h.server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body("2099-05-01", "2099-05-02"))
        .await
        .assert_status(StatusCode::CREATED);

    let edited = h
        .server
        .put("/api/leaves/LV0001")
        .authorization_bearer(&ana)
        .json(&json!({ "to": "2099-05-05" }))
        .await;
    edited.assert_status_ok();
    assert_eq!(edited.json::<Value>()["data"]["to"], "2099-05-05");

    let cancelled = h
        .server
        .post("/api/leaves/LV0001/cancel")
        .authorization_bearer(&ana)
        .await;
    cancelled.assert_status_ok();
    assert_eq!(cancelled.json::<Value>()["data"]["status"], "cancelled");
}

// =============================================================================
// ATTENDANCE TESTS
// =============================================================================

#[tokio::test]
async fn test_check_in_and_out() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .post("/api/attendance/check-out")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::CONFLICT);

    let checked_in = h
        .server
        .post("/api/attendance/check-in")
        .authorization_bearer(&ana)
        .await;
    checked_in.assert_status_ok();
    assert_eq!(
        checked_in.json::<Value>()["data"]["id"],
        format!("{ana_id}:{}", today())
    );

    h.server
        .post("/api/attendance/check-in")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::CONFLICT);

    let checked_out = h
        .server
        .post("/api/attendance/check-out")
        .authorization_bearer(&ana)
        .await;
    checked_out.assert_status_ok();
    assert!(!checked_out.json::<Value>()["data"]["check_out"].is_null());

    let mine = h.server.get("/api/attendance").authorization_bearer(&ana).await;
    assert_eq!(mine.json::<Value>()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_in_blocked_by_approved_leave() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .post("/api/leaves")
        .authorization_bearer(&ana)
        .json(&leave_body(&today(), &today()))
        .await
        .assert_status(StatusCode::CREATED);
    h.server
        .post("/api/leaves/LV0001/decision")
        .authorization_bearer(&admin)
        .json(&json!({ "status": "approved" }))
        .await
        .assert_status_ok();

    h.server
        .post("/api/attendance/check-in")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_records_attendance() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    let body = json!({ "employee_id": ana_id, "date": "2099-01-05", "status": "absent" });
    h.server
        .post("/api/attendance")
        .authorization_bearer(&ana)
        .json(&body)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let recorded = h
        .server
        .post("/api/attendance")
        .authorization_bearer(&admin)
        .json(&body)
        .await;
    recorded.assert_status(StatusCode::CREATED);
    let id = format!("{ana_id}:2099-01-05");
    assert_eq!(recorded.json::<Value>()["data"]["id"], id.as_str());

    let updated = h
        .server
        .put(&format!("/api/attendance/{id}"))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "half_day", "note": "Doctor" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["data"]["status"], "half_day");

    let ranged = h
        .server
        .get("/api/attendance")
        .add_query_param("from", "2099-01-01")
        .add_query_param("to", "2099-01-31")
        .authorization_bearer(&admin)
        .await;
    assert_eq!(ranged.json::<Value>()["data"].as_array().unwrap().len(), 1);

    h.server
        .delete(&format!("/api/attendance/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_attendance_reports_worked_minutes() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (ana_id, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    let recorded = h
        .server
        .post("/api/attendance")
        .authorization_bearer(&admin)
        .json(&json!({
            "employee_id": ana_id,
            "date": "2099-01-06",
            "check_in": "2099-01-06T09:00:00Z",
            "check_out": "2099-01-06T17:30:00Z",
            "status": "present"
        }))
        .await;
    recorded.assert_status(StatusCode::CREATED);
    assert_eq!(recorded.json::<Value>()["data"]["worked_minutes"], 510);

    let mine = h.server.get("/api/attendance").authorization_bearer(&ana).await;
    let body: Value = mine.json();
    assert_eq!(body["data"][0]["worked_minutes"], 510);
    assert_eq!(body["data"][0]["employee_id"], ana_id.as_str());

    let checked_in = h
        .server
        .post("/api/attendance/check-in")
        .authorization_bearer(&ana)
        .await;
    assert!(checked_in.json::<Value>()["data"]["worked_minutes"].is_null());
}

// =============================================================================
// DASHBOARD TESTS
// =============================================================================

#[tokio::test]
async fn test_dashboard_is_admin_only() {
    let h = harness();
    let admin = admin_token(&h.server).await;
    let (_, ana) = employee(&h.server, &admin, "Ana", "ana@corp.io").await;

    h.server
        .get("/api/dashboard")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = h.server.get("/api/dashboard").authorization_bearer(&admin).await;
    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(data["employees"], 2);
    assert_eq!(data["active_employees"], 2);
    assert_eq!(data["pending_leaves"], 0);
}
