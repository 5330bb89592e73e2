pub mod ai;
pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod services;
pub mod storage;

use axum::{middleware::from_fn, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ai::GenerativeModel;
use crate::api::create_api_router;
use crate::middleware::logging::logging_middleware;
use crate::services::try_on::ImageFetcher;
use crate::storage::ObjectStorage;

/// Everything a handler may need, built once at start-up.
#[derive(Clone)]
pub struct AppContext {
    pub db: Arc<DatabaseConnection>,
    pub ai: Arc<dyn GenerativeModel>,
    pub storage: Arc<dyn ObjectStorage>,
    pub images: ImageFetcher,
    pub admin_api_key: Option<Arc<str>>,
}

pub fn create_app(ctx: AppContext) -> Router {
    create_api_router(ctx)
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
