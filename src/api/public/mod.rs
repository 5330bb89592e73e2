pub mod cart;
pub mod discounts;
pub mod health;
pub mod orders;
pub mod products;
pub mod recommendations;
pub mod reviews;
pub mod try_on;
pub mod uploads;

use axum::Router;

use crate::AppContext;
use cart::cart_router;
use discounts::discounts_router;
use health::health_router;
use orders::orders_router;
use products::products_router;
use recommendations::recommendations_router;
use reviews::reviews_router;
use try_on::try_on_router;

pub fn public_api_router(ctx: &AppContext) -> Router {
    Router::new()
        .merge(products_router(ctx))
        .merge(reviews_router(ctx))
        .merge(cart_router(ctx))
        .merge(orders_router(ctx))
        .merge(discounts_router(ctx))
        .merge(recommendations_router(ctx))
        .merge(try_on_router(ctx))
        .merge(health_router())
}
