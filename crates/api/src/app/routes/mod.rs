use axum::{Router, routing::get};

pub mod admin;
pub mod orders;
pub mod reviews;
pub mod system;
pub mod tracking;
pub mod vouchers;
pub mod warranty;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .nest("/orders", orders::router())
        .nest("/tracking", tracking::router())
        .nest("/reviews", reviews::router())
        .nest("/vouchers", vouchers::router())
        .nest("/warranty", warranty::router())
        .nest("/admin", admin::router())
}
