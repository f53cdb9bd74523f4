//! `/api/attendance`: self check-in/out and administrator records.

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
use hrdesk_core::attendance::{
    self, AttendanceFilter, AttendancePatch, AttendanceView, ManualRecord,
};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/check-out", post(check_out))
        .route("/", get(list).post(record))
        .route("/{id}", get(show).put(update).delete(remove))
}

async fn check_in(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Response> {
    let now = Utc::now();
    let entry = state
        .run(move |store| attendance::check_in(store, &actor.id, now))
        .await?;
    info!(employee_id = %entry.employee_id, "checked in");
    Ok(ok("Checked in", AttendanceView::from(entry)))
}

async fn check_out(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Response> {
    let now = Utc::now();
    let entry = state
        .run(move |store| attendance::check_out(store, &actor.id, now))
        .await?;
    info!(employee_id = %entry.employee_id, "checked out");
    Ok(ok("Checked out", AttendanceView::from(entry)))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(mut filter): ApiQuery<AttendanceFilter>,
) -> ApiResult<Response> {
    if !actor.is_admin() {
        filter.employee = Some(actor.id);
    }
    let entries = state
        .run(move |store| attendance::list(store, &filter))
        .await?;
    let entries: Vec<AttendanceView> = entries.into_iter().map(AttendanceView::from).collect();
    Ok(ok("Attendance retrieved", entries))
}

async fn record(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(manual): ApiJson<ManualRecord>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let entry = state
        .run(move |store| attendance::record(store, manual, now))
        .await?;
    Ok(created("Attendance recorded", AttendanceView::from(entry)))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let entry = state.run(move |store| attendance::get(store, &id)).await?;
    if !actor.is_admin() && entry.employee_id != actor.id {
        return Err(ApiError::forbidden(
            "You can only view your own attendance",
        ));
    }
    Ok(ok("Attendance retrieved", AttendanceView::from(entry)))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<AttendancePatch>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let entry = state
        .run(move |store| attendance::update(store, &id, patch, now))
        .await?;
    Ok(ok("Attendance updated", AttendanceView::from(entry)))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state
        .run(move |store| attendance::delete(store, &id))
        .await?;
    Ok(done("Attendance deleted"))
}
