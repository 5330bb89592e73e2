use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::ai::GenerativeModel;
use crate::api::{respond, ApiResult};
use crate::error::ApiError;
use crate::services::recommendation;
use crate::AppContext;

pub fn recommendations_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/recommendations", post(get_recommendations))
        .layer(Extension(ctx.db.clone()))
        .layer(Extension(ctx.ai.clone()))
}

#[derive(Deserialize)]
struct RecommendationRequest {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
}

async fn get_recommendations(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(ai): Extension<Arc<dyn GenerativeModel>>,
    Json(payload): Json<RecommendationRequest>,
) -> ApiResult {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("query is required"));
    }
    let limit = payload.limit.filter(|l| *l > 0).unwrap_or(10);

    let catalogue = recommendation::load_catalogue(db.as_ref()).await?;
    if catalogue.is_empty() {
        return Err(ApiError::not_found("No products available"));
    }

    let outcome = recommendation::recommend(ai.as_ref(), query, &catalogue, limit).await;
    let fallback = outcome.is_fallback();

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": outcome.into_products(),
            "query": query,
            "fallback": fallback,
        }),
    ))
}
