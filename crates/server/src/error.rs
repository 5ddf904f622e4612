//! HTTP error mapping.
//!
//! Every service error is translated to a status code here; unexpected
//! failures are logged in full and reported to the client as a generic
//! internal error with no detail leaked.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use service::ServiceError;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// No credential, or one that did not verify.
    Unauthenticated(String),
    /// Route-level role gate failed.
    Forbidden(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Service(err) => match err {
                ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                ServiceError::InvalidSignature => {
                    (StatusCode::BAD_REQUEST, "invalid signature".to_string())
                }
                ServiceError::PaymentNotCaptured => {
                    (StatusCode::BAD_REQUEST, "payment not successful".to_string())
                }
                ServiceError::Authorization(msg) => (StatusCode::FORBIDDEN, msg),
                ServiceError::NotFound(entity) => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found"))
                }
                ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg),
                ServiceError::GatewayUnavailable(msg) => {
                    error!(detail = %msg, "External service unavailable");
                    (
                        StatusCode::BAD_GATEWAY,
                        "external service unavailable".to_string(),
                    )
                }
                ServiceError::Db(_) | ServiceError::Pool(_) | ServiceError::Unexpected(_) => {
                    error!(detail = %err, "Internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "something went wrong".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
