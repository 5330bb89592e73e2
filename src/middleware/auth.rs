use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;

#[derive(Clone, Debug)]
pub struct AdminState {
    /// `None` leaves the admin routes open.
    pub api_key: Option<Arc<str>>,
}

pub async fn admin_middleware(
    State(state): State<AdminState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => next.run(req).await,
        Some(_) => {
            warn!(uri = %req.uri(), "Rejected admin request with a wrong key");
            ApiError::Unauthorized.into_response()
        }
        None => ApiError::Unauthorized.into_response(),
    }
}
