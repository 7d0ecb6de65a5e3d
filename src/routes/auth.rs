// Bearer token check for every route except /health.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;

const PUBLIC_PATH: &str = "/health";

pub(super) async fn require_bearer(
    State(expected): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == PUBLIC_PATH {
        return Ok(next.run(request).await);
    }
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if token != Some(expected.as_str()) {
        tracing::debug!(path = %request.uri().path(), "rejected request without valid token");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
