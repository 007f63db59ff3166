use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tukangin_infra::ServiceError;

const INTERNAL_ERROR: &str = "Internal server error";

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "Unauthorized"),
        ServiceError::SuspensionBlocked => json_error(StatusCode::FORBIDDEN, err.to_string()),
        ServiceError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, msg),
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, msg),
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        // Detail was logged where it happened.
        ServiceError::Unexpected(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, answering 400 when malformed.
pub fn parse_id<T: core::str::FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, format!("invalid {what} id")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        let cases = [
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::SuspensionBlocked, StatusCode::FORBIDDEN),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::not_found("Order"), StatusCode::NOT_FOUND),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Unexpected("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn ids_that_do_not_parse_are_bad_requests() {
        let res = parse_id::<tukangin_core::OrderId>("nope", "order").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
