use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};
use semstore_core::{ServiceError, Violation};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<Violation>,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    violations: Vec<Violation>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            violations: Vec::new(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_argument", message)
    }

    fn validation_failed(violations: Vec<Violation>) -> Self {
        Self {
            violations,
            ..Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_argument",
                "request failed validation",
            )
        }
    }

    fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    fn request_timeout() -> Self {
        Self::new(
            StatusCode::REQUEST_TIMEOUT,
            "request_timeout",
            "request timed out",
        )
    }

    fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, "not_implemented", message)
    }

    pub(crate) fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                code: self.code,
                message: self.message,
                violations: self.violations,
            }),
        )
            .into_response()
    }
}

pub(crate) fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    let status = rejection.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("request body exceeds configured size limit");
    }
    if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        return ApiError::invalid_argument("content-type must be application/json");
    }
    ApiError::invalid_argument("invalid JSON payload")
}

pub(crate) fn map_service_error(error: ServiceError) -> ApiError {
    match error {
        ServiceError::Validation(failure) => {
            tracing::debug!(%failure, "request rejected by validation");
            ApiError::validation_failed(failure.into_violations())
        }
        ServiceError::NotFound(id) => ApiError::not_found(format!("entry '{id}' not found")),
        ServiceError::Conflict(id) => ApiError::conflict(format!("entry '{id}' already exists")),
        ServiceError::Unavailable(message) => {
            tracing::error!(%message, "entry store unavailable");
            ApiError::service_unavailable("entry store is unavailable")
        }
        ServiceError::Unsupported(operation) => {
            ApiError::not_implemented(format!("{operation} is not implemented"))
        }
    }
}

pub(crate) async fn handle_middleware_error(error: BoxError) -> Response {
    if error.is::<tower::timeout::error::Elapsed>() {
        return ApiError::request_timeout().into_response();
    }

    tracing::error!(%error, "middleware error");
    ApiError::internal("internal middleware error").into_response()
}
