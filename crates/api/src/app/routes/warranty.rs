use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warranties))
        .route("/claim", post(claim_warranty))
}

pub async fn list_warranties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_warranties(ctx.identity()).await {
        Ok(ws) => Json(ws.iter().map(dto::warranty_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn claim_warranty(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::ClaimRequest>,
) -> Response {
    let (warranty_id, claim) = body.into_parts();

    match services.booking.claim_warranty(ctx.identity(), warranty_id, claim).await {
        Ok(claim) => Json(json!({
            "claimId": claim.id.to_string(),
            "status": claim.status.as_str(),
            "message": "Warranty claim submitted",
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
