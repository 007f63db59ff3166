use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto;
use crate::context::RequestContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's account as resolved by the auth middleware.
pub async fn me(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    Json(dto::user_to_json(ctx.account()))
}
