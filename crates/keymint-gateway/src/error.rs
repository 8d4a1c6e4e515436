use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keymint_core::Error;
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Wraps a core error so the HTTP layer can map it onto a status code
/// without leaking store internals to the client.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = match &self.0 {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid"),
            Error::Exhausted(_) => (StatusCode::SERVICE_UNAVAILABLE, "exhausted"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::Conflict { .. } | Error::Upstream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(json!({ "success": false, "error": label }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError(Error::NotFound("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_maps_to_400() {
        let response = ApiError(Error::Invalid("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn exhausted_maps_to_503() {
        let response = ApiError(Error::Exhausted("db_a_e".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
