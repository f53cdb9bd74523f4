//! `/api/users`: the employee directory.

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::response::{ApiJson, ApiQuery, created, done, ok};
use crate::api::session::{AdminUser, AuthUser};
use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use chrono::Utc;
use hrdesk_core::UserView;
use hrdesk_core::directory::{self, NewUser, ProfilePatch, UserFilter, UserPatch};
use serde_json::Value;
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<Response> {
    let users = state
        .run(move |store| directory::list_users(store, &filter))
        .await?;
    let users: Vec<UserView> = users.into_iter().map(UserView::from).collect();
    Ok(ok("Users retrieved", users))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(draft): ApiJson<NewUser>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let user = state
        .run(move |store| directory::create_user(store, draft, now))
        .await?;
    info!(user_id = %user.id, by = %admin.id, "user created");
    Ok(created("User created", UserView::from(user)))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user = state
        .run(move |store| directory::get_user(store, &id))
        .await?;
    Ok(ok("User retrieved", UserView::from(user)))
}

/// Administrators send a full [`UserPatch`]; everyone else may only send
/// a [`ProfilePatch`] for their own record.
async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let invalid = |e: serde_json::Error| ApiError::BadRequest(format!("Invalid request body: {e}"));

    let user = if actor.is_admin() {
        let patch: UserPatch = serde_json::from_value(body).map_err(invalid)?;
        let demotes_self = patch.active == Some(false)
            || patch.role.is_some_and(|role| role != actor.role);
        if actor.id == id && demotes_self {
            return Err(ApiError::Conflict(
                "Administrators cannot demote or deactivate themselves".into(),
            ));
        }
        state
            .run(move |store| directory::update_user(store, &id, patch, now))
            .await?
    } else if actor.id == id {
        let patch: ProfilePatch = serde_json::from_value(body).map_err(invalid)?;
        state
            .run(move |store| directory::update_profile(store, &id, patch, now))
            .await?
    } else {
        return Err(ApiError::forbidden("You can only update your own profile"));
    };

    info!(user_id = %user.id, by = %actor.id, "user updated");
    Ok(ok("User updated", UserView::from(user)))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    if admin.id == id {
        return Err(ApiError::Conflict(
            "Administrators cannot delete their own account".into(),
        ));
    }
    let user = state
        .run(move |store| directory::delete_user(store, &id))
        .await?;
    info!(user_id = %user.id, by = %admin.id, "user deleted");
    Ok(done("User deleted"))
}
