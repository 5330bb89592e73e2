use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::{
    discount::{self, DiscountStatus, DiscountType, Entity as DiscountEntity},
    order::{self, Entity as OrderEntity},
};
use crate::error::ApiError;
use crate::services::{
    catalog::{contains_ci, round_to, PageRequest, Pagination},
    inventory::double_option,
};
use crate::AppContext;

const DEFAULT_USAGE_LIMIT: i32 = 100;

pub fn admin_discounts_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/discounts", get(list_discounts).post(create_discount))
        .route("/discounts/stats", get(discount_stats))
        .route(
            "/discounts/:id",
            get(get_discount).put(update_discount).delete(delete_discount),
        )
        .layer(Extension(ctx.db.clone()))
}

/// Discount as shown to admins, with expiry applied to `status`.
#[derive(Serialize)]
struct DiscountView {
    id: Uuid,
    code: String,
    discount: f64,
    #[serde(rename = "type")]
    discount_type: DiscountType,
    expiration_date: Option<NaiveDate>,
    status: DiscountStatus,
    usage_count: i32,
    usage_limit: i32,
    min_order_value: f64,
    created_at: chrono::DateTime<Utc>,
}

impl DiscountView {
    fn new(value: discount::Model, today: NaiveDate) -> DiscountView {
        DiscountView {
            status: value.effective_status(today),
            id: value.id,
            code: value.code,
            discount: value.discount,
            discount_type: value.discount_type,
            expiration_date: value.expiration_date,
            usage_count: value.usage_count,
            usage_limit: value.usage_limit,
            min_order_value: value.min_order_value,
            created_at: value.created_at,
        }
    }
}

#[derive(Deserialize)]
struct DiscountsQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    status: Option<String>,
}

async fn list_discounts(
    Query(params): Query<DiscountsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let request = PageRequest::new(params.page, params.limit, 10);
    let today = Utc::now().date_naive();

    let mut query = DiscountEntity::find();
    if let Some(search) = non_blank(params.search) {
        query = query.filter(contains_ci(discount::Column::Code, &search));
    }
    if let Some(status) = non_blank(params.status).filter(|s| s != "all") {
        let status: DiscountStatus = status.parse().map_err(ApiError::Validation)?;
        query = query.filter(status_condition(status, today));
    }

    let total = query.clone().count(db.as_ref()).await?;
    let discounts = query
        .order_by_desc(discount::Column::CreatedAt)
        .offset(request.offset())
        .limit(request.limit)
        .all(db.as_ref())
        .await?;

    let data: Vec<DiscountView> = discounts
        .into_iter()
        .map(|d| DiscountView::new(d, today))
        .collect();

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

/// Filter matching the status an admin would see, expiry included.
fn status_condition(status: DiscountStatus, today: NaiveDate) -> Condition {
    let not_expired = Condition::any()
        .add(discount::Column::ExpirationDate.is_null())
        .add(discount::Column::ExpirationDate.gte(today));
    match status {
        DiscountStatus::Expired => Condition::any()
            .add(discount::Column::Status.eq(DiscountStatus::Expired))
            .add(discount::Column::ExpirationDate.lt(today)),
        other => Condition::all()
            .add(discount::Column::Status.eq(other))
            .add(not_expired),
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
struct DiscountInput {
    code: Option<String>,
    #[validate(range(min = 0.0, message = "discount must not be negative"))]
    discount: Option<f64>,
    #[serde(rename = "type")]
    discount_type: Option<DiscountType>,
    #[serde(default, deserialize_with = "double_option")]
    expiration_date: Option<Option<String>>,
    status: Option<DiscountStatus>,
    #[validate(range(min = 0, message = "usage_limit must not be negative"))]
    usage_limit: Option<i32>,
    #[validate(range(min = 0.0, message = "min_order_value must not be negative"))]
    min_order_value: Option<f64>,
}

impl DiscountInput {
    fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.discount.is_none()
            && self.discount_type.is_none()
            && self.expiration_date.is_none()
            && self.status.is_none()
            && self.usage_limit.is_none()
            && self.min_order_value.is_none()
    }

    fn code(&self) -> Result<Option<String>, ApiError> {
        match &self.code {
            None => Ok(None),
            Some(code) => non_blank(Some(code.clone()))
                .map(|code| Some(code.to_uppercase()))
                .ok_or_else(|| ApiError::validation("code must not be empty")),
        }
    }

    /// `Some(None)` clears the date; an empty string counts as clearing too.
    fn expiration_date(&self) -> Result<Option<Option<NaiveDate>>, ApiError> {
        match &self.expiration_date {
            None => Ok(None),
            Some(raw) => match non_blank(raw.clone()) {
                None => Ok(Some(None)),
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map(|date| Some(Some(date)))
                    .map_err(|_| ApiError::validation("expiration_date must be YYYY-MM-DD")),
            },
        }
    }
}

async fn ensure_code_free<C>(db: &C, code: &str, except: Option<Uuid>) -> Result<(), ApiError>
where
    C: sea_orm::ConnectionTrait,
{
    let mut query = DiscountEntity::find().filter(discount::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(discount::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(ApiError::validation("Discount code already exists"));
    }
    Ok(())
}

async fn create_discount(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<DiscountInput>,
) -> ApiResult {
    payload.validate()?;
    let code = payload
        .code()?
        .ok_or_else(|| ApiError::validation("code is required"))?;
    let discount_type = payload.discount_type.unwrap_or(DiscountType::Percentage);
    let value = payload.discount.unwrap_or(0.0);
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(ApiError::validation("Percentage discount must be between 0 and 100"));
    }
    let expiration_date = payload.expiration_date()?.flatten();

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;
    ensure_code_free(&txn, &code, None).await?;

    let discount = discount::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        discount: Set(value),
        discount_type: Set(discount_type),
        expiration_date: Set(expiration_date),
        status: Set(DiscountStatus::Active),
        usage_count: Set(0),
        usage_limit: Set(payload.usage_limit.unwrap_or(DEFAULT_USAGE_LIMIT)),
        min_order_value: Set(payload.min_order_value.unwrap_or(0.0)),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "data": DiscountView::new(discount, Utc::now().date_naive()),
            "message": "Discount created successfully",
        }),
    ))
}

async fn get_discount(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Discount not found")?;
    let discount = DiscountEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Discount not found"))?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": DiscountView::new(discount, Utc::now().date_naive()),
        }),
    ))
}

async fn update_discount(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<DiscountInput>,
) -> ApiResult {
    let id = parse_id(&id, "Discount not found")?;
    if payload.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }
    payload.validate()?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let existing = DiscountEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Discount not found"))?;

    let discount_type = payload.discount_type.unwrap_or(existing.discount_type);
    let value = payload.discount.unwrap_or(existing.discount);
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(ApiError::validation("Percentage discount must be between 0 and 100"));
    }

    let mut model = existing.into_active_model();
    if let Some(code) = payload.code()? {
        ensure_code_free(&txn, &code, Some(id)).await?;
        model.code = Set(code);
    }
    if let Some(expiration_date) = payload.expiration_date()? {
        model.expiration_date = Set(expiration_date);
    }
    model.discount_type = Set(discount_type);
    model.discount = Set(value);
    if let Some(status) = payload.status {
        model.status = Set(status);
    }
    if let Some(usage_limit) = payload.usage_limit {
        model.usage_limit = Set(usage_limit);
    }
    if let Some(min_order_value) = payload.min_order_value {
        model.min_order_value = Set(min_order_value);
    }
    let discount = model.update(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": DiscountView::new(discount, Utc::now().date_naive()),
            "message": "Discount updated successfully",
        }),
    ))
}

async fn delete_discount(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Discount not found")?;
    let result = DiscountEntity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Discount not found"));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Discount deleted successfully" }),
    ))
}

#[derive(Debug, Default, Serialize, PartialEq)]
struct DiscountStats {
    active: usize,
    expired: usize,
    total_uses: i64,
    discount_value_given: f64,
}

impl DiscountStats {
    fn tally(discounts: &[discount::Model], today: NaiveDate, value_given: f64) -> DiscountStats {
        let mut stats = DiscountStats {
            discount_value_given: round_to(value_given, 2),
            ..Default::default()
        };
        for discount in discounts {
            match discount.effective_status(today) {
                DiscountStatus::Active => stats.active += 1,
                DiscountStatus::Expired => stats.expired += 1,
                DiscountStatus::Inactive => {}
            }
            stats.total_uses += i64::from(discount.usage_count);
        }
        stats
    }
}

async fn discount_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let discounts = DiscountEntity::find().all(db.as_ref()).await?;
    let given: Vec<f64> = OrderEntity::find()
        .select_only()
        .column(order::Column::Discount)
        .filter(order::Column::DiscountCode.is_not_null())
        .into_tuple()
        .all(db.as_ref())
        .await?;

    let data = DiscountStats::tally(&discounts, Utc::now().date_naive(), given.iter().sum());
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}
