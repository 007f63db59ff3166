//! Admin dashboard routes: users, orders, professionals and vouchers.
//!
//! Role checks happen in the booking service (ADMIN or DEVELOPER); the
//! handlers only parse and map.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use tukangin_core::{OrderId, UserId};

use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/suspend", post(suspend_user))
        .route("/users/:id/reactivate", post(reactivate_user))
        .route("/users/:id/role", post(change_role))
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", post(set_order_status))
        .route("/orders/:id/assign", post(assign_professional))
        .route("/professionals", get(list_professionals).post(create_professional))
        .route("/vouchers", get(list_vouchers).post(create_voucher))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_users(ctx.identity()).await {
        Ok(users) => Json(users.iter().map(dto::user_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn suspend_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.suspend_user(ctx.identity(), user_id).await {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.reactivate_user(ctx.identity(), user_id).await {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<dto::ChangeRoleRequest>,
) -> Response {
    let user_id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.change_role(ctx.identity(), user_id, body.role).await {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_all_orders(ctx.identity()).await {
        Ok(orders) => Json(orders.iter().map(dto::order_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<dto::SetStatusRequest>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.booking.set_order_status(ctx.identity(), order_id, body.status).await {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn assign_professional(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<dto::AssignRequest>,
) -> Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .booking
        .assign_professional(ctx.identity(), order_id, body.professional_id)
        .await
    {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Professionals and vouchers
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_professionals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_professionals(ctx.identity()).await {
        Ok(ps) => Json(ps.iter().map(dto::professional_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_professional(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::CreateProfessionalRequest>,
) -> Response {
    match services.booking.create_professional(ctx.identity(), body.into()).await {
        Ok(p) => (StatusCode::CREATED, Json(dto::professional_to_json(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_vouchers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    match services.booking.list_vouchers(ctx.identity()).await {
        Ok(vs) => Json(vs.iter().map(dto::voucher_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<dto::CreateVoucherRequest>,
) -> Response {
    match services.booking.create_voucher(ctx.identity(), body.into()).await {
        Ok(v) => (StatusCode::CREATED, Json(dto::voucher_to_json(&v))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
