use axum::{extract::Extension, http::StatusCode, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

use crate::api::{respond, ApiResult};
use crate::services::stats;
use crate::AppContext;

pub fn admin_analytics_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/analytics/revenue", get(revenue))
        .route("/analytics/orders", get(orders))
        .route("/analytics/products", get(products))
        .route("/analytics/customers", get(customers))
        .layer(Extension(ctx.db.clone()))
}

async fn revenue(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::revenue_report(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn orders(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::order_volume_report(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn products(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::product_mix(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn customers(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::customer_mix(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}
