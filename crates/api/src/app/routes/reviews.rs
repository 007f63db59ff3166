use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new().route("/", post(submit_review))
}

pub async fn submit_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::ReviewRequest>,
) -> Response {
    match services.booking.submit_review(ctx.identity(), body.into()).await {
        Ok(review) => (StatusCode::CREATED, Json(dto::review_to_json(&review))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
