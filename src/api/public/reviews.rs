use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{parse_id, respond, ApiResult};
use crate::entities::{
    product::Entity as ProductEntity,
    review::{self, Entity as ReviewEntity},
};
use crate::error::ApiError;
use crate::AppContext;

pub fn reviews_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/products/:id/reviews", get(get_reviews).post(add_review))
        .layer(Extension(ctx.db.clone()))
}

async fn get_reviews(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let reviews = ReviewEntity::find()
        .filter(review::Column::ProductId.eq(id))
        .order_by_desc(review::Column::PostedDate)
        .order_by_desc(review::Column::CreatedAt)
        .all(db.as_ref())
        .await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": reviews.len(), "data": reviews }),
    ))
}

#[derive(Deserialize)]
struct NewReview {
    user_name: Option<String>,
    rating: Option<i32>,
    comment: Option<String>,
}

async fn add_review(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<NewReview>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;

    let user_name = payload.user_name.filter(|name| !name.trim().is_empty());
    let (Some(user_name), Some(rating)) = (user_name, payload.rating) else {
        return Err(ApiError::validation("user_name and rating are required"));
    };
    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation("Rating must be between 1 and 5"));
    }

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    if ProductEntity::find_by_id(id).one(&txn).await?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let now = Utc::now();
    let review = review::ActiveModel {
        product_id: Set(id),
        user_name: Set(user_name.trim().to_string()),
        rating: Set(rating),
        comment: Set(payload.comment.unwrap_or_default()),
        posted_date: Set(now.date_naive()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "message": "Review added successfully",
            "review_id": review.id,
        }),
    ))
}
