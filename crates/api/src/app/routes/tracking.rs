use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use tukangin_core::OrderId;
use tukangin_dispatch::Tracking;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new().route("/:id", get(track_order))
}

/// Outside PROCESSING this answers 200 with `success:false`, never an error.
pub async fn track_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.tracking(ctx.identity(), order_id).await {
        Ok(Tracking::Live(view)) => Json(json!({"success": true, "data": view})).into_response(),
        Ok(Tracking::Disabled) => Json(json!({
            "success": false,
            "message": "Live tracking is not available for this order",
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
