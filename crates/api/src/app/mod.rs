//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, bus, read cache, invalidator)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `extract.rs`: strict JSON body extractor
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use tukangin_auth::Hs256JwtValidator;
use tukangin_infra::{AppConfig, BookingStore};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(&config.jwt_secret, services))
}

/// Build the router over an existing store. Tests use this to seed data
/// through the store while driving the API over HTTP.
pub fn build_app_with_store(jwt_secret: &str, store: Arc<dyn BookingStore>) -> anyhow::Result<Router> {
    let services = services::services_for_store(store, tukangin_infra::config::DEFAULT_CACHE_CAPACITY)?;
    Ok(router(jwt_secret, services))
}

fn router(jwt_secret: &str, services: services::AppServices) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let services = Arc::new(services);
    let auth_state = middleware::AuthState {
        jwt,
        services: Arc::clone(&services),
    };

    // Protected routes: require a valid identity token.
    let protected = routes::router()
        .layer(axum::Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
