use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{non_blank, respond, ApiResult};
use crate::entities::{
    customer::{self, Entity as CustomerEntity},
    order::{self, Entity as OrderEntity, Status},
    order_item::{self, Entity as OrderItemEntity},
};
use crate::error::ApiError;
use crate::services::catalog::PageRequest;
use crate::AppContext;

pub fn user_orders_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/orders", get(order_history))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct HistoryQuery {
    user_id: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Default, Serialize)]
struct CustomerBlock {
    full_name: String,
    phone_number: String,
    district: String,
    thana: String,
    full_address: String,
}

impl CustomerBlock {
    fn new(customer: Option<customer::Model>) -> CustomerBlock {
        match customer {
            Some(customer) => CustomerBlock {
                full_name: customer.full_name.unwrap_or_default(),
                phone_number: customer.phone_number.unwrap_or_default(),
                district: customer.district.unwrap_or_default(),
                thana: customer.thana.unwrap_or_default(),
                full_address: customer.full_address.unwrap_or_default(),
            },
            None => CustomerBlock::default(),
        }
    }
}

#[derive(Serialize)]
struct OrderHistoryEntry {
    id: Uuid,
    order_number: String,
    date: chrono::DateTime<chrono::Utc>,
    status: Status,
    total: f64,
    subtotal: f64,
    discount: f64,
    delivery_fee: f64,
    customer: CustomerBlock,
    items: Vec<order_item::Model>,
}

async fn order_history(
    Query(params): Query<HistoryQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let user_id =
        non_blank(params.user_id).ok_or_else(|| ApiError::validation("user_id is required"))?;
    let request = PageRequest::new(params.page, params.limit, 10);

    let orders = OrderEntity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .find_also_related(CustomerEntity)
        .offset(request.offset())
        .limit(request.limit)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(orders.len());
    for (order, customer) in orders {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(db.as_ref())
            .await?;

        data.push(OrderHistoryEntry {
            id: order.id,
            order_number: order.order_number(),
            date: order.created_at,
            status: order.status,
            total: order.total,
            subtotal: order.subtotal,
            discount: order.discount,
            delivery_fee: order.delivery_fee,
            customer: CustomerBlock::new(customer),
            items,
        });
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": data.len(), "data": data }),
    ))
}
