use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use tukangin_core::Money;
use tukangin_infra::booking::VoucherCheck;

use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new().route("/check", post(check_voucher))
}

/// An unusable voucher is `{valid:false, message}` with 200.
pub async fn check_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::VoucherCheckRequest>,
) -> Response {
    let subtotal = body.subtotal.map(Money::new);

    match services.booking.check_voucher(ctx.identity(), &body.code, subtotal).await {
        Ok(VoucherCheck::Valid { voucher, discount }) => Json(json!({
            "valid": true,
            "code": voucher.code,
            "discount_type": voucher.effective_type().as_str(),
            "discount_value": voucher.discount_value,
            "max_discount": voucher.max_discount.map(|m| m.amount()),
            "discount": discount.map(|m| m.amount()),
        }))
        .into_response(),
        Ok(VoucherCheck::Invalid(reason)) => Json(json!({
            "valid": false,
            "message": reason.to_string(),
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
