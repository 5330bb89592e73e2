use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{non_blank, respond, ApiResult};
use crate::error::ApiError;
use crate::services::{catalog::round_to, checkout};
use crate::AppContext;

pub fn discounts_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/discounts/validate", post(validate_code))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct ValidateCode {
    code: Option<String>,
    subtotal: Option<f64>,
}

/// Quotes a code against a subtotal without redeeming it.
async fn validate_code(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ValidateCode>,
) -> ApiResult {
    let code = non_blank(payload.code).ok_or_else(|| ApiError::validation("code is required"))?;
    let subtotal = payload.subtotal.unwrap_or(0.0).max(0.0);

    let discount = checkout::check_code(db.as_ref(), &code, subtotal).await?;
    let amount = round_to(discount.amount_off(subtotal), 2);

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": {
                "code": discount.code,
                "type": discount.discount_type,
                "discount": discount.discount,
                "discount_amount": amount,
                "subtotal_after_discount": round_to(subtotal - amount, 2),
            }
        }),
    ))
}
