//! The JSON envelope and body/query extractors that speak it.
//!
//! Success: `{"success": true, "message": "...", "data": ...}`
//! Failure: `{"success": false, "message": "..."}`

use super::error::ApiError;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

fn respond<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    let body = Envelope {
        success: true,
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

/// 200 with a payload.
pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::OK, message, Some(data))
}

/// 201 with the created resource.
pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::CREATED, message, Some(data))
}

/// 200 without a payload.
pub fn done(message: &str) -> Response {
    respond::<()>(StatusCode::OK, message, None)
}

/// `Json<T>` whose rejections come back as 400 envelopes.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejections come back as 400 envelopes.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
