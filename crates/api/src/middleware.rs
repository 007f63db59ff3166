use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use tukangin_auth::{Identity, JwtValidator, RoleRequirement, authorize};
use tukangin_infra::ServiceError;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<AppServices>,
}

/// Resolve the bearer token into a [`RequestContext`].
///
/// The account is provisioned on first sign-in, then checked for
/// suspension before the handler extracts its body: a suspended caller
/// gets 403 even when the request is also malformed. Role requirements
/// stay with the operations, which run the full gate again.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized = || errors::json_error(StatusCode::UNAUTHORIZED, "Unauthorized");

    let token = extract_bearer(req.headers()).map_err(|_| unauthorized())?;
    let claims = state
        .jwt
        .validate(token, Utc::now())
        .map_err(|_| unauthorized())?;

    let identity = Identity::from(&claims);
    let account = state
        .services
        .booking
        .provision(&identity)
        .await
        .map_err(errors::service_error_to_response)?;

    authorize(Some(&identity), Some(&account), RoleRequirement::ANY)
        .map_err(|e| errors::service_error_to_response(ServiceError::from(e)))?;

    req.extensions_mut()
        .insert(RequestContext::new(identity, account));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        h
    }

    #[test]
    fn bearer_token_is_extracted_and_trimmed() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def ")), Ok("abc.def"));
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Basic abc")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer   ")), Err(StatusCode::UNAUTHORIZED));
    }
}
