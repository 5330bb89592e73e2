//! Account routes. Identity arrives as a `user_id` supplied by the caller.

pub mod addresses;
pub mod orders;
pub mod profile;
pub mod wishlist;

use axum::Router;
use serde::Deserialize;

use crate::api::non_blank;
use crate::error::ApiError;
use crate::AppContext;
use addresses::addresses_router;
use orders::user_orders_router;
use profile::profile_router;
use wishlist::wishlist_router;

pub fn user_api_router(ctx: &AppContext) -> Router {
    Router::new()
        .merge(profile_router(ctx))
        .merge(addresses_router(ctx))
        .merge(user_orders_router(ctx))
        .merge(wishlist_router(ctx))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    pub fn require(self) -> Result<String, ApiError> {
        non_blank(self.user_id).ok_or_else(|| ApiError::validation("user_id is required"))
    }
}
