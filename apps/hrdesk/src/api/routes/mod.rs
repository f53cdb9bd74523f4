//! Route table under `/api`.

pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod leaves;
pub mod org;
pub mod users;

use super::AppState;
use axum::Router;

pub fn api() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/users", users::routes())
        .nest("/departments", org::department_routes())
        .nest("/positions", org::position_routes())
        .nest("/events", events::routes())
        .nest("/leaves", leaves::routes())
        .nest("/attendance", attendance::routes())
        .nest("/dashboard", dashboard::routes())
}
