use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{respond, ApiResult};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::services::{inventory::LOW_STOCK_THRESHOLD, stats};
use crate::AppContext;

const BEST_SELLING_LIMIT: usize = 5;
const LOW_STOCK_LIMIT: usize = 10;

pub fn dashboard_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/sales", get(dashboard_sales))
        .route("/dashboard/best-selling", get(best_selling))
        .route("/dashboard/low-stock", get(low_stock))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
pub(super) struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn or(&self, default: usize) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(default)
    }
}

async fn dashboard_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::dashboard_stats(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn dashboard_sales(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let data = stats::monthly_sales(db.as_ref()).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn best_selling(
    Query(params): Query<LimitQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let data = stats::best_sellers(db.as_ref(), params.or(BEST_SELLING_LIMIT)).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn low_stock(
    Query(params): Query<LimitQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let products = ProductEntity::find()
        .filter(product::Column::Stock.lt(LOW_STOCK_THRESHOLD))
        .order_by_asc(product::Column::Stock)
        .limit(params.or(LOW_STOCK_LIMIT) as u64)
        .all(db.as_ref())
        .await?;

    let data: Vec<_> = products
        .into_iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "stock": p.stock,
                "category": p.category.unwrap_or_else(|| "Uncategorized".to_string()),
            })
        })
        .collect();

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}
