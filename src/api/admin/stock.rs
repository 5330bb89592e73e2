use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::dashboard::LimitQuery;
use crate::api::{parse_id, respond, ApiResult};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::error::ApiError;
use crate::services::{
    inventory::{self, SizeStockInput, LOW_STOCK_THRESHOLD},
    stats,
};
use crate::AppContext;

pub fn admin_stock_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/stock/overview", get(stock_overview))
        .route("/stock/low-stock", get(low_stock))
        .route("/stock/out-of-stock", get(out_of_stock))
        .route("/stock/:id", put(update_stock))
        .route("/stock/:id/sizes", get(get_sizes).put(replace_sizes))
        .layer(Extension(ctx.db.clone()))
}

async fn stock_overview(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::stock_overview(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn low_stock(
    Query(params): Query<LimitQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let products = ProductEntity::find()
        .filter(product::Column::Stock.gt(0))
        .filter(product::Column::Stock.lt(LOW_STOCK_THRESHOLD))
        .order_by_asc(product::Column::Stock)
        .limit(params.or(10) as u64)
        .all(db.as_ref())
        .await?;

    let data: Vec<_> = products
        .into_iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "category": p.category.unwrap_or_default(),
                "current_stock": p.stock,
                "minimum_stock": LOW_STOCK_THRESHOLD,
            })
        })
        .collect();

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn out_of_stock(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let products = ProductEntity::find()
        .filter(product::Column::Stock.lte(0))
        .order_by_desc(product::Column::UpdatedAt)
        .all(db.as_ref())
        .await?;

    let data: Vec<_> = products
        .into_iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "category": p.category.unwrap_or_default(),
                "last_order_date": p.updated_at,
            })
        })
        .collect();

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct StockUpdate {
    stock: Option<i32>,
}

async fn update_stock(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<StockUpdate>,
) -> ApiResult {
    let stock = payload
        .stock
        .filter(|s| *s >= 0)
        .ok_or_else(|| ApiError::validation("Valid stock value is required"))?;
    let id = parse_id(&id, "Product not found")?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let product = ProductEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let mut product = product.into_active_model();
    product.stock = Set(stock);
    product.updated_at = Set(Utc::now());
    product.update(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Stock updated successfully" }),
    ))
}

async fn get_sizes(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let product = ProductEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let sizes = inventory::sizes_for(db.as_ref(), id).await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": {
                "product_id": product.id,
                "total_stock": product.stock,
                "sizes": sizes,
            }
        }),
    ))
}

#[derive(Deserialize)]
struct SizesPayload {
    #[serde(default)]
    sizes: Vec<SizeStockInput>,
}

async fn replace_sizes(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<SizesPayload>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let (product, sizes) = inventory::replace_sizes(db.as_ref(), id, payload.sizes).await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "message": "Size stock updated successfully",
            "data": {
                "product_id": product.id,
                "total_stock": product.stock,
                "sizes": sizes,
            }
        }),
    ))
}
