//! `/api/departments` and `/api/positions`.

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::api::response::{ApiJson, ApiQuery, created, done, ok};
use crate::api::session::{AdminUser, AuthUser};
use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use chrono::Utc;
use hrdesk_core::org::{self, DepartmentDraft, DepartmentPatch, PositionDraft, PositionPatch};
use serde::Deserialize;
use tracing::info;

pub fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/{id}",
            get(show_department)
                .put(update_department)
                .delete(delete_department),
        )
}

pub fn position_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_positions).post(create_position))
        .route(
            "/{id}",
            get(show_position).put(update_position).delete(delete_position),
        )
}

// =============================================================================
// DEPARTMENTS
// =============================================================================

async fn list_departments(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Response> {
    let departments = state.run(org::list_departments).await?;
    Ok(ok("Departments retrieved", departments))
}

async fn create_department(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(draft): ApiJson<DepartmentDraft>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let department = state
        .run(move |store| org::create_department(store, draft, now))
        .await?;
    info!(department_id = %department.id, by = %admin.id, "department created");
    Ok(created("Department created", department))
}

async fn show_department(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let department = state
        .run(move |store| org::get_department(store, &id))
        .await?;
    Ok(ok("Department retrieved", department))
}

async fn update_department(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<DepartmentPatch>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let department = state
        .run(move |store| org::update_department(store, &id, patch, now))
        .await?;
    Ok(ok("Department updated", department))
}

async fn delete_department(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let department = state
        .run(move |store| org::delete_department(store, &id))
        .await?;
    info!(department_id = %department.id, by = %admin.id, "department deleted");
    Ok(done("Department deleted"))
}

// =============================================================================
// POSITIONS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct PositionQuery {
    department: Option<String>,
}

async fn list_positions(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(query): ApiQuery<PositionQuery>,
) -> ApiResult<Response> {
    let positions = state
        .run(move |store| org::list_positions(store, query.department.as_deref()))
        .await?;
    Ok(ok("Positions retrieved", positions))
}

async fn create_position(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(draft): ApiJson<PositionDraft>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let position = state
        .run(move |store| org::create_position(store, draft, now))
        .await?;
    info!(position_id = %position.id, by = %admin.id, "position created");
    Ok(created("Position created", position))
}

async fn show_position(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let position = state
        .run(move |store| org::get_position(store, &id))
        .await?;
    Ok(ok("Position retrieved", position))
}

async fn update_position(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<PositionPatch>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let position = state
        .run(move |store| org::update_position(store, &id, patch, now))
        .await?;
    Ok(ok("Position updated", position))
}

async fn delete_position(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let position = state
        .run(move |store| org::delete_position(store, &id))
        .await?;
    info!(position_id = %position.id, by = %admin.id, "position deleted");
    Ok(done("Position deleted"))
}
