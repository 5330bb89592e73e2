use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    customer::Entity as CustomerEntity,
    order::{self, Entity as OrderEntity, Status},
    order_item::{self, Entity as OrderItemEntity},
    product::Entity as ProductEntity,
};
use crate::error::ApiError;
use crate::services::{
    catalog::{PageRequest, Pagination},
    stats,
};
use crate::AppContext;

pub fn admin_orders_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/stats", get(order_stats))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_status))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct AdminOrdersQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    status: Option<String>,
}

#[derive(Serialize)]
struct AdminOrderRow {
    id: Uuid,
    order_number: String,
    customer: String,
    email: String,
    phone: String,
    date: chrono::DateTime<Utc>,
    status: Status,
    total: f64,
    subtotal: f64,
    discount: f64,
    delivery_fee: f64,
    items_count: u64,
}

impl AdminOrderRow {
    /// Case-insensitive match on customer name, e-mail or order number.
    fn matches(&self, needle: &str) -> bool {
        [&self.customer, &self.email, &self.order_number]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

async fn list_orders(
    Query(params): Query<AdminOrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let request = PageRequest::new(params.page, params.limit, 10);

    let mut query = OrderEntity::find();
    if let Some(status) = non_blank(params.status).filter(|s| s != "all") {
        let status: Status = status.parse().map_err(ApiError::Validation)?;
        query = query.filter(order::Column::Status.eq(status));
    }

    let total = query.clone().count(db.as_ref()).await?;
    let orders = query
        .order_by_desc(order::Column::CreatedAt)
        .find_also_related(CustomerEntity)
        .offset(request.offset())
        .limit(request.limit)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(orders.len());
    for (order, customer) in orders {
        let items_count = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .count(db.as_ref())
            .await?;
        let (name, email, phone) = match customer {
            Some(c) => (
                c.full_name.unwrap_or_else(|| "Unknown".to_string()),
                c.email.unwrap_or_default(),
                c.phone_number.unwrap_or_default(),
            ),
            None => ("Unknown".to_string(), String::new(), String::new()),
        };

        data.push(AdminOrderRow {
            id: order.id,
            order_number: order.order_number(),
            customer: name,
            email,
            phone,
            date: order.created_at,
            status: order.status,
            total: order.total,
            subtotal: order.subtotal,
            discount: order.discount,
            delivery_fee: order.delivery_fee,
            items_count,
        });
    }

    // Search only narrows the fetched page; pagination still counts every order.
    if let Some(search) = non_blank(params.search) {
        let needle = search.to_lowercase();
        data.retain(|row| row.matches(&needle));
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

async fn get_order(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Order not found")?;
    let (order, customer) = OrderEntity::find_by_id(id)
        .find_also_related(CustomerEntity)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let lines = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(db.as_ref())
        .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        // Prefer the live product; fall back to the snapshot taken at checkout.
        let product = ProductEntity::find_by_id(line.product_id)
            .one(db.as_ref())
            .await?;
        let (name, image) = match product {
            Some(p) => (p.name.clone(), p.primary_image()),
            None => (
                line.product_name.clone().unwrap_or_else(|| "Unknown Product".to_string()),
                line.product_image.clone(),
            ),
        };
        items.push(json!({
            "id": line.id,
            "product_id": line.product_id,
            "product_name": name,
            "size": line.size,
            "color": line.color,
            "quantity": line.quantity,
            "price": line.price,
            "image_url": image.unwrap_or_default(),
        }));
    }

    let order_number = order.order_number();
    let mut data = serde_json::to_value(&order).map_err(|e| ApiError::Internal(e.to_string()))?;
    data["customers"] = json!(customer);
    data["items"] = json!(items);
    data["order_number"] = json!(order_number);

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: Option<String>,
}

async fn update_status(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<StatusUpdate>,
) -> ApiResult {
    let status: Status = payload
        .status
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::Validation)?;
    let id = parse_id(&id, "Order not found")?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let order = OrderEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    let mut order = order.into_active_model();
    order.status = Set(status);
    order.updated_at = Set(Utc::now());
    let order = order.update(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": order,
            "message": format!("Order status updated to {status}"),
        }),
    ))
}

async fn order_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::order_status_counts(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}
