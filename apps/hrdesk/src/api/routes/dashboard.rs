//! `/api/dashboard`: administrator summary.

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::api::response::ok;
use crate::api::session::AdminUser;
use axum::{Router, extract::State, response::Response, routing::get};
use chrono::Utc;
use hrdesk_core::dashboard;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(summary))
}

async fn summary(State(state): State<AppState>, AdminUser(_): AdminUser) -> ApiResult<Response> {
    let today = Utc::now().date_naive();
    let summary = state
        .run(move |store| dashboard::summary(store, today))
        .await?;
    Ok(ok("Dashboard summary", summary))
}
