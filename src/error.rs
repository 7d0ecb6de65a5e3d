// Error taxonomy for third-party service calls and HTTP-facing API errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failure talking to a monitored service (through a tunnel or directly).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Bad or missing credential against an auth-requiring endpoint.
    #[error("unauthorized")]
    Unauthorized,

    /// Any non-2xx status other than 401.
    #[error("HTTP error {0}")]
    HttpError(u16),

    /// Network, tunnel or timeout failure.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Map an HTTP status code: 401 is `Unauthorized`, other non-2xx are `HttpError`.
    pub fn check_status(status: u16) -> Result<(), ServiceError> {
        match status {
            200..=299 => Ok(()),
            401 => Err(ServiceError::Unauthorized),
            code => Err(ServiceError::HttpError(code)),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            match ServiceError::check_status(status.as_u16()) {
                Err(e) => e,
                Ok(()) => ServiceError::Unreachable(err.to_string()),
            }
        } else {
            ServiceError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::MalformedResponse(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by agent HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound(String),
    BadRequest(String),
    /// A backing dependency (e.g. the Docker daemon) is not reachable.
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<crate::docker_repo::DockerActionError> for ApiError {
    fn from(err: crate::docker_repo::DockerActionError) -> Self {
        use crate::docker_repo::DockerActionError;
        match err {
            DockerActionError::Unavailable => ApiError::Unavailable(err.to_string()),
            DockerActionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DockerActionError::Failed(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
