//! `/api/leaves`: applications and the approval workflow.
//!
//! Employees see and manage their own applications. Administrators see
//! everything and decide pending ones.

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::response::{ApiJson, ApiQuery, created, done, ok};
use crate::api::session::{AdminUser, AuthUser};
use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use hrdesk_core::leave::{self, Decision, LeaveFilter, LeavePatch, LeaveView, NewLeave};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(apply))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/decision", post(decide))
        .route("/{id}/cancel", post(cancel))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(mut filter): ApiQuery<LeaveFilter>,
) -> ApiResult<Response> {
    if !actor.is_admin() {
        filter.employee = Some(actor.id);
    }
    let leaves = state.run(move |store| leave::list(store, &filter)).await?;
    let leaves: Vec<LeaveView> = leaves.into_iter().map(LeaveView::from).collect();
    Ok(ok("Leave applications retrieved", leaves))
}

async fn apply(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(draft): ApiJson<NewLeave>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let application = state
        .run(move |store| leave::apply(store, &actor.id, draft, now))
        .await?;
    info!(leave_id = %application.id, employee_id = %application.employee_id, "leave applied");
    Ok(created("Leave application submitted", LeaveView::from(application)))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let application = state.run(move |store| leave::get(store, &id)).await?;
    if !actor.is_admin() && application.employee_id != actor.id {
        return Err(ApiError::forbidden(
            "You can only view your own leave applications",
        ));
    }
    Ok(ok("Leave application retrieved", LeaveView::from(application)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<LeavePatch>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let application = state
        .run(move |store| leave::update(store, &id, &actor.id, patch, now))
        .await?;
    Ok(ok("Leave application updated", LeaveView::from(application)))
}

async fn decide(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(decision): ApiJson<Decision>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let application = state
        .run(move |store| leave::decide(store, &id, &admin.id, decision, now))
        .await?;
    info!(
        leave_id = %application.id,
        status = application.status.as_str(),
        "leave decided"
    );
    Ok(ok("Leave application reviewed", LeaveView::from(application)))
}

async fn cancel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let application = state
        .run(move |store| leave::cancel(store, &id, &actor.id, now))
        .await?;
    Ok(ok("Leave application cancelled", LeaveView::from(application)))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state
        .run(move |store| leave::delete(store, &id, &actor))
        .await?;
    Ok(done("Leave application deleted"))
}
