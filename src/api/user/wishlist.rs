use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::UserQuery;
use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    product::{self, Entity as ProductEntity},
    wishlist_item::{self, Entity as WishlistItemEntity},
};
use crate::error::ApiError;
use crate::services::catalog;
use crate::AppContext;

pub fn wishlist_router(ctx: &AppContext) -> Router {
    Router::new()
        .route(
            "/wishlist",
            get(get_wishlist)
                .post(add_to_wishlist)
                .delete(remove_from_wishlist),
        )
        .layer(Extension(ctx.db.clone()))
}

#[derive(Serialize)]
struct WishlistEntry {
    id: Uuid,
    product_id: Uuid,
    name: String,
    price: f64,
    image: Option<String>,
    rating: f64,
    created_at: chrono::DateTime<Utc>,
}

impl WishlistEntry {
    fn new(item: wishlist_item::Model, product: product::Model, rating: f64) -> WishlistEntry {
        WishlistEntry {
            id: item.id,
            product_id: product.id,
            image: product.primary_image(),
            name: product.name,
            price: product.price,
            rating,
            created_at: item.created_at,
        }
    }
}

async fn get_wishlist(
    Query(params): Query<UserQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let user_id = params.require()?;

    let rows = WishlistItemEntity::find()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .order_by_desc(wishlist_item::Column::CreatedAt)
        .find_also_related(ProductEntity)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(rows.len());
    // Rows whose product has since been deleted are skipped.
    for (item, product) in rows {
        if let Some(product) = product {
            let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
            data.push(WishlistEntry::new(item, product, rating));
        }
    }

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct WishlistPayload {
    user_id: Option<String>,
    product_id: Option<String>,
}

impl WishlistPayload {
    fn require(self) -> Result<(String, Uuid), ApiError> {
        let (Some(user_id), Some(product_id)) =
            (non_blank(self.user_id), non_blank(self.product_id))
        else {
            return Err(ApiError::validation("user_id and product_id are required"));
        };
        Ok((user_id, parse_id(&product_id, "Product not found")?))
    }
}

async fn add_to_wishlist(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<WishlistPayload>,
) -> ApiResult {
    let (user_id, product_id) = payload.require()?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    if ProductEntity::find_by_id(product_id).one(&txn).await?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let existing = WishlistItemEntity::find()
        .filter(wishlist_item::Column::UserId.eq(user_id.as_str()))
        .filter(wishlist_item::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation("Product already in wishlist"));
    }

    let item = wishlist_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(product_id),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "data": item,
            "message": "Product added to wishlist",
        }),
    ))
}

async fn remove_from_wishlist(
    Query(params): Query<WishlistPayload>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let (user_id, product_id) = params.require()?;

    WishlistItemEntity::delete_many()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .filter(wishlist_item::Column::ProductId.eq(product_id))
        .exec(db.as_ref())
        .await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Product removed from wishlist" }),
    ))
}
