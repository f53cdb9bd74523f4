//! `/api/events`: announcements. Everyone reads, administrators write.

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
use hrdesk_core::events::{self, EventPatch, NewEvent};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
struct EventQuery {
    #[serde(default)]
    upcoming: bool,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> ApiResult<Response> {
    let today = query.upcoming.then(|| Utc::now().date_naive());
    let events = state
        .run(move |store| events::list(store, today))
        .await?;
    Ok(ok("Events retrieved", events))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(draft): ApiJson<NewEvent>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let event = state
        .run(move |store| events::create(store, draft, &admin.id, now))
        .await?;
    Ok(created("Event created", event))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let event = state.run(move |store| events::get(store, &id)).await?;
    Ok(ok("Event retrieved", event))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<EventPatch>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let event = state
        .run(move |store| events::update(store, &id, patch, now))
        .await?;
    Ok(ok("Event updated", event))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state.run(move |store| events::delete(store, &id)).await?;
    Ok(done("Event deleted"))
}
