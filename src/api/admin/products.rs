use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::product::{self, Entity as ProductEntity, ProductStatus};
use crate::error::ApiError;
use crate::services::{
    catalog::{self, contains_ci, PageRequest, Pagination},
    inventory::{self, stock_status, ProductInput, LOW_STOCK_THRESHOLD},
    stats,
};
use crate::AppContext;

pub fn admin_products_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct AdminProductQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    category: Option<String>,
    /// Either a product status (`active`/`inactive`) or a stock status
    /// (`low_stock`/`out_of_stock`).
    status: Option<String>,
}

#[derive(Serialize)]
struct AdminProduct {
    id: Uuid,
    name: String,
    description: String,
    category: Option<String>,
    brand: Option<String>,
    price: f64,
    original_price: Option<f64>,
    image_url: Option<String>,
    image_urls: Value,
    color: Value,
    size: Value,
    tags: Value,
    stock: i32,
    status: &'static str,
    product_status: ProductStatus,
    rating: f64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl AdminProduct {
    fn new(value: product::Model, rating: f64) -> AdminProduct {
        AdminProduct {
            status: stock_status(value.stock),
            product_status: value.status,
            id: value.id,
            name: value.name,
            description: value.description,
            category: value.category,
            brand: value.brand,
            price: value.price,
            original_price: value.original_price,
            image_url: value.image_url,
            image_urls: value.image_urls,
            color: value.color,
            size: value.size,
            tags: value.tags,
            stock: value.stock,
            rating,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

fn status_condition(status: &str) -> Result<Condition, ApiError> {
    let condition = match status {
        "out_of_stock" => Condition::all().add(product::Column::Stock.lte(0)),
        "low_stock" => Condition::all()
            .add(product::Column::Stock.gt(0))
            .add(product::Column::Stock.lt(LOW_STOCK_THRESHOLD)),
        other => {
            let status: ProductStatus = other.parse().map_err(ApiError::Validation)?;
            Condition::all().add(product::Column::Status.eq(status))
        }
    };
    Ok(condition)
}

async fn list_products(
    Query(params): Query<AdminProductQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let request = PageRequest::new(params.page, params.limit, 10);

    let mut query = ProductEntity::find();
    if let Some(search) = non_blank(params.search) {
        query = query.filter(contains_ci(product::Column::Name, &search));
    }
    if let Some(category) = non_blank(params.category) {
        query = query.filter(product::Column::Category.eq(category));
    }
    if let Some(status) = non_blank(params.status) {
        query = query.filter(status_condition(&status)?);
    }

    let total = query.clone().count(db.as_ref()).await?;
    let products = query
        .order_by_desc(product::Column::CreatedAt)
        .offset(request.offset())
        .limit(request.limit)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(products.len());
    for product in products {
        let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
        data.push(AdminProduct::new(product, rating));
    }

    let pagination = Pagination::new(request, total);
    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": data,
            "pagination": {
                "page": pagination.page,
                "limit": pagination.limit,
                "total": pagination.total,
                "total_pages": pagination.total_pages,
            }
        }),
    ))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProductInput>,
) -> ApiResult {
    let product = inventory::create_product(db.as_ref(), payload).await?;
    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "data": product,
            "message": "Product created successfully",
        }),
    ))
}

async fn get_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let product = ProductEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let rating = catalog::rating(db.as_ref(), id, 1).await?;
    let total_sold = stats::total_sold(db.as_ref(), id).await?;
    let sizes = inventory::sizes_for(db.as_ref(), id).await?;

    let mut data = serde_json::to_value(&product).map_err(|e| ApiError::Internal(e.to_string()))?;
    data["rating"] = json!(rating);
    data["total_sold"] = json!(total_sold);
    data["sizes"] = json!(sizes);

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn update_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<Value>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    if payload.as_object().map_or(true, |fields| fields.is_empty()) {
        return Err(ApiError::validation("No fields to update"));
    }
    let input: ProductInput =
        serde_json::from_value(payload).map_err(|e| ApiError::Validation(e.to_string()))?;

    let product = inventory::update_product(db.as_ref(), id, input).await?;
    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": product,
            "message": "Product updated successfully",
        }),
    ))
}

async fn delete_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let result = ProductEntity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Product not found"));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Product deleted successfully" }),
    ))
}
