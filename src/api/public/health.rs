use axum::{http::StatusCode, routing::get, Router};
use serde_json::json;

use crate::api::respond;

pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> axum::response::Response {
    respond(StatusCode::OK, json!({ "success": true, "status": "ok" }))
}
