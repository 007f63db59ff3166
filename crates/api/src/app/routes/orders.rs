use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use tukangin_core::{Money, OrderId};
use tukangin_dispatch::Assignment;
use tukangin_infra::booking::PaymentRequest;

use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/payment", post(pay_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/professional", get(order_professional))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::CreateOrderRequest>,
) -> Response {
    match services.booking.place_order(ctx.identity(), body.into()).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_orders(ctx.identity()).await {
        Ok(orders) => Json(orders.iter().map(dto::order_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.get_order(ctx.identity(), order_id).await {
        Ok(view) => Json(dto::order_with_payments_to_json(&view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn pay_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<dto::PaymentRequest>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    tracing::debug!(%order_id, has_token = body.payment_token.is_some(), "payment attempt");

    let request = PaymentRequest {
        amount: Money::new(body.amount),
        payment_method: body.payment_method,
    };

    match services.booking.settle_payment(ctx.identity(), order_id, request).await {
        Ok(receipt) => Json(json!({
            "success": true,
            "data": {
                "receipt_id": receipt.receipt_id,
                "order_status": receipt.order_status.as_str(),
                "payment_type": receipt.kind.as_str(),
                "amount": receipt.amount.amount(),
                "message": receipt.message,
            },
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.cancel_order(ctx.identity(), order_id).await {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Unassigned is a normal answer (200, `success:false`).
pub async fn order_professional(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.assignment(ctx.identity(), order_id).await {
        Ok(Assignment::Assigned(view)) => Json(json!({"success": true, "data": view})).into_response(),
        Ok(Assignment::Unassigned) => Json(json!({
            "success": false,
            "data": null,
            "message": "No professional has been assigned yet",
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
