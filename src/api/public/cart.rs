use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    cart_item::{self, Entity as CartItemEntity},
    product::{self, Entity as ProductEntity},
};
use crate::error::ApiError;
use crate::services::{
    catalog::round_to,
    checkout::{self, CartLine},
};
use crate::AppContext;

pub fn cart_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_to_cart))
        .route("/cart/:id", put(update_cart_item).delete(remove_cart_item))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct CartItemResponse {
    id: Uuid,
    product_id: Uuid,
    product_name: Option<String>,
    size: Option<String>,
    color: Option<String>,
    quantity: i32,
    price: f64,
    image_url: Option<String>,
    description: Option<String>,
}

impl CartItemResponse {
    fn new(item: cart_item::Model, product: Option<product::Model>) -> CartItemResponse {
        CartItemResponse {
            id: item.id,
            product_id: item.product_id,
            product_name: product.as_ref().map(|p| p.name.clone()),
            size: item.size,
            color: item.color,
            quantity: item.quantity,
            price: item.price,
            image_url: product.as_ref().and_then(product::Model::primary_image),
            description: product.map(|p| p.description),
        }
    }
}

async fn get_cart(
    Query(params): Query<SessionQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let session_id =
        non_blank(params.session_id).ok_or_else(|| ApiError::validation("session_id is required"))?;

    let rows = CartItemEntity::find()
        .filter(cart_item::Column::SessionId.eq(session_id))
        .order_by_desc(cart_item::Column::CreatedAt)
        .find_also_related(ProductEntity)
        .all(db.as_ref())
        .await?;

    let items: Vec<CartItemResponse> = rows
        .into_iter()
        .map(|(item, product)| CartItemResponse::new(item, product))
        .collect();
    let subtotal: f64 = items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": {
                "items": items,
                "subtotal": round_to(subtotal, 2),
                "item_count": items.len(),
            }
        }),
    ))
}

#[derive(Deserialize, Validate)]
struct AddToCart {
    session_id: Option<String>,
    product_id: Option<String>,
    size: Option<String>,
    color: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    quantity: Option<i32>,
}

async fn add_to_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<AddToCart>,
) -> ApiResult {
    payload.validate()?;

    let (Some(session_id), Some(product_id)) =
        (non_blank(payload.session_id), non_blank(payload.product_id))
    else {
        return Err(ApiError::validation("session_id and product_id are required"));
    };
    let product_id = parse_id(&product_id, "Product not found")?;

    let line = CartLine {
        session_id,
        product_id,
        size: non_blank(payload.size),
        color: non_blank(payload.color),
        quantity: payload.quantity.unwrap_or(1),
    };
    let cart_item_id = checkout::add_to_cart(db.as_ref(), &line).await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "message": "Item added to cart",
            "cart_item_id": cart_item_id,
        }),
    ))
}

#[derive(Deserialize)]
struct UpdateQuantity {
    quantity: Option<i32>,
}

async fn update_cart_item(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UpdateQuantity>,
) -> ApiResult {
    let quantity = payload
        .quantity
        .filter(|q| *q >= 1)
        .ok_or_else(|| ApiError::validation("Valid quantity is required"))?;
    let id = parse_id(&id, "Cart item not found")?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let item = CartItemEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart item not found"))?;
    let mut item = item.into_active_model();
    item.quantity = Set(quantity);
    let item = item.update(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Cart item updated", "data": item }),
    ))
}

async fn remove_cart_item(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Cart item not found")?;
    let result = CartItemEntity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Cart item not found"));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Item removed from cart" }),
    ))
}
