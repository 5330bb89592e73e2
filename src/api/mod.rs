pub mod admin;
pub mod public;
pub mod user;

use axum::{http::StatusCode, response::Response, Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::AppContext;

use admin::admin_api_router;
use public::{public_api_router, uploads::uploads_router};
use user::user_api_router;

pub type ApiResult = Result<Response, ApiError>;

pub fn create_api_router(ctx: AppContext) -> Router {
    Router::new()
        .nest("/api", public_api_router(&ctx))
        .nest("/api/user", user_api_router(&ctx))
        .nest("/api/admin", admin_api_router(&ctx))
        .merge(uploads_router(ctx.storage.clone()))
}

/// JSON response tagged as successful for the logging middleware.
pub fn respond(status: StatusCode, body: Value) -> Response {
    to_response((status, Json(body)), Ok(()))
}

/// Parses an id from the path; anything malformed cannot exist, so it is a 404.
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(not_found))
}

/// Trimmed, non-empty query or body value.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
