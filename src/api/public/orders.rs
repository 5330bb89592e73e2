use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    customer::{self, Entity as CustomerEntity},
    order::{self, Entity as OrderEntity, Status},
    order_item::{self, Entity as OrderItemEntity},
};
use crate::error::ApiError;
use crate::services::{
    catalog::{PageRequest, Pagination},
    checkout::{self, CustomerDetails, NewOrder},
};
use crate::AppContext;

const DEFAULT_DELIVERY_FEE: f64 = 15.0;
const PREVIEW_IMAGES: u64 = 4;

pub fn orders_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Debug, Default, Deserialize, Validate)]
struct CustomerPayload {
    full_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    email: Option<String>,
    phone_number: Option<String>,
    district: Option<String>,
    thana: Option<String>,
    full_address: Option<String>,
}

#[derive(Deserialize, Validate)]
struct CreateOrder {
    session_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    customer: CustomerPayload,
    #[validate(range(min = 0.0, max = 100.0, message = "discount_percentage must be between 0 and 100"))]
    discount_percentage: Option<f64>,
    discount_code: Option<String>,
    #[validate(range(min = 0.0, message = "delivery_fee must not be negative"))]
    delivery_fee: Option<f64>,
    user_id: Option<String>,
}

async fn create_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateOrder>,
) -> ApiResult {
    let session_id =
        non_blank(payload.session_id.clone()).ok_or_else(|| ApiError::validation("session_id is required"))?;
    payload.validate()?;

    let customer = payload.customer;
    let new_order = NewOrder {
        session_id,
        customer: CustomerDetails {
            full_name: customer.full_name,
            email: customer.email,
            phone_number: customer.phone_number,
            district: customer.district,
            thana: customer.thana,
            full_address: customer.full_address,
        },
        discount_percentage: payload.discount_percentage.unwrap_or(0.0),
        discount_code: non_blank(payload.discount_code),
        delivery_fee: payload.delivery_fee.unwrap_or(DEFAULT_DELIVERY_FEE),
        user_id: non_blank(payload.user_id),
    };

    let placed = checkout::place_order(db.as_ref(), new_order).await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "message": "Order created successfully",
            "order_id": placed.order_id,
            "order_summary": placed.totals.rounded(),
        }),
    ))
}

#[derive(Deserialize)]
struct OrdersQuery {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<String>,
}

#[derive(Serialize)]
struct OrderPreview {
    id: Uuid,
    name: String,
    address: String,
    order_status: Status,
    order_date: chrono::DateTime<chrono::Utc>,
    product_images: Vec<String>,
}

async fn list_orders(
    Query(params): Query<OrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let request = PageRequest::new(params.page, params.limit, 10);

    let mut query = OrderEntity::find();
    if let Some(status) = non_blank(params.status) {
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
        let product_images: Vec<Option<String>> = OrderItemEntity::find()
            .select_only()
            .column(order_item::Column::ProductImage)
            .filter(order_item::Column::OrderId.eq(order.id))
            .limit(PREVIEW_IMAGES)
            .into_tuple()
            .all(db.as_ref())
            .await?;

        data.push(OrderPreview {
            id: order.id,
            name: customer
                .as_ref()
                .and_then(|c| c.full_name.clone())
                .unwrap_or_default(),
            address: customer
                .and_then(|c| c.full_address)
                .unwrap_or_default(),
            order_status: order.status,
            order_date: order.created_at,
            product_images: product_images.into_iter().flatten().collect(),
        });
    }

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "count": data.len(),
            "data": data,
            "pagination": Pagination::new(request, total),
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
    let customer = customer.unwrap_or_else(|| empty_customer(order.customer_id));

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(db.as_ref())
        .await?;
    let lines: Vec<serde_json::Value> = items
        .into_iter()
        .map(|item| {
            json!({
                "product_image": item.product_image,
                "product_name": item.product_name,
                "price": item.price,
                "quantity": item.quantity,
            })
        })
        .collect();

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": {
                "name": customer.full_name.unwrap_or_default(),
                "order_date": order.created_at,
                "phone": customer.phone_number.unwrap_or_default(),
                "status": order.status,
                "district": customer.district.unwrap_or_default(),
                "thana": customer.thana.unwrap_or_default(),
                "address": customer.full_address.unwrap_or_default(),
                "order": lines,
                "subtotal": order.subtotal,
                "shipping": order.delivery_fee,
                "total": order.total,
            }
        }),
    ))
}

fn empty_customer(id: Uuid) -> customer::Model {
    customer::Model {
        id,
        user_id: None,
        full_name: None,
        email: None,
        phone_number: None,
        district: None,
        thana: None,
        full_address: None,
        created_at: chrono::Utc::now(),
    }
}
