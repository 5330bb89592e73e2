use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    customer::{self, Entity as CustomerEntity},
    order::{self, Entity as OrderEntity},
};
use crate::error::ApiError;
use crate::services::{
    catalog::{contains_ci, round_to, PageRequest, Pagination},
    stats,
};
use crate::AppContext;

pub fn admin_customers_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/stats", get(customer_stats))
        .route("/customers/:id", get(get_customer))
        .route("/customers/:id/orders", get(customer_orders))
        .layer(Extension(ctx.db.clone()))
}

/// Orders belonging to `customer`, newest first. Account holders are matched
/// on `user_id` so every checkout they made counts; guests only have the
/// order created with their customer row.
async fn orders_for<C>(db: &C, customer: &customer::Model) -> Result<Vec<order::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let owner = match &customer.user_id {
        Some(user_id) => order::Column::UserId.eq(user_id.as_str()),
        None => order::Column::CustomerId.eq(customer.id),
    };
    OrderEntity::find()
        .filter(owner)
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
}

fn lifetime_spend(orders: &[order::Model]) -> f64 {
    let spent: f64 = orders
        .iter()
        .filter(|o| !o.status.is_lost_sale())
        .map(|o| o.total)
        .sum();
    round_to(spent, 2)
}

#[derive(Deserialize)]
struct CustomersQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
}

async fn list_customers(
    Query(params): Query<CustomersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let request = PageRequest::new(params.page, params.limit, 10);

    let mut query = CustomerEntity::find();
    if let Some(search) = non_blank(params.search) {
        query = query.filter(
            Condition::any()
                .add(contains_ci(customer::Column::FullName, &search))
                .add(contains_ci(customer::Column::Email, &search)),
        );
    }

    let total = query.clone().count(db.as_ref()).await?;
    let customers = query
        .order_by_desc(customer::Column::CreatedAt)
        .offset(request.offset())
        .limit(request.limit)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(customers.len());
    for customer in customers {
        let orders = orders_for(db.as_ref(), &customer).await?;
        data.push(json!({
            "id": customer.id,
            "user_id": customer.user_id,
            "full_name": customer.full_name.unwrap_or_else(|| "Unknown".to_string()),
            "email": customer.email.unwrap_or_default(),
            "phone_number": customer.phone_number.unwrap_or_default(),
            "district": customer.district.unwrap_or_default(),
            "thana": customer.thana.unwrap_or_default(),
            "full_address": customer.full_address.unwrap_or_default(),
            "status": "active",
            "created_at": customer.created_at,
            "orders_count": orders.len(),
            "total_spent": lifetime_spend(&orders),
        }));
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

async fn find_customer(db: &DatabaseConnection, raw_id: &str) -> Result<customer::Model, ApiError> {
    let id = parse_id(raw_id, "Customer not found")?;
    CustomerEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))
}

async fn get_customer(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let customer = find_customer(db.as_ref(), &id).await?;
    let orders = orders_for(db.as_ref(), &customer).await?;

    let mut data = serde_json::to_value(&customer).map_err(|e| ApiError::Internal(e.to_string()))?;
    data["orders_count"] = json!(orders.len());
    data["total_spent"] = json!(lifetime_spend(&orders));
    data["orders"] = json!(orders);

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn customer_orders(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let customer = find_customer(db.as_ref(), &id).await?;
    let orders = orders_for(db.as_ref(), &customer).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": orders })))
}

async fn customer_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::customer_stats(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}
