pub mod analytics;
pub mod customers;
pub mod dashboard;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod size_charts;
pub mod stock;
pub mod upload;

use axum::{middleware::from_fn_with_state, Router};

use analytics::admin_analytics_router;
use customers::admin_customers_router;
use dashboard::dashboard_router;
use discounts::admin_discounts_router;
use orders::admin_orders_router;
use products::admin_products_router;
use size_charts::admin_size_charts_router;
use stock::admin_stock_router;
use upload::upload_router;

use crate::middleware::auth::{admin_middleware, AdminState};
use crate::AppContext;

pub fn admin_api_router(ctx: &AppContext) -> Router {
    Router::new()
        .merge(dashboard_router(ctx))
        .merge(admin_products_router(ctx))
        .merge(admin_orders_router(ctx))
        .merge(admin_customers_router(ctx))
        .merge(admin_discounts_router(ctx))
        .merge(admin_stock_router(ctx))
        .merge(admin_analytics_router(ctx))
        .merge(admin_size_charts_router(ctx))
        .merge(upload_router(ctx))
        .route_layer(from_fn_with_state(
            AdminState {
                api_key: ctx.admin_api_key.clone(),
            },
            admin_middleware,
        ))
}
