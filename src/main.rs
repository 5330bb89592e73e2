use sea_orm::Database;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storefront_api::{
    ai::GeminiClient,
    config::Config,
    create_app,
    entities::setup_schema,
    services::try_on::ImageFetcher,
    storage::{LocalStorage, ObjectStorage, SupabaseStorage},
    AppContext,
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let db = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    if config.ai_api_key.is_none() {
        warn!("GOOGLE_AI_API_KEY is not set; recommendations fall back to keyword matching");
    }
    let ai = GeminiClient::new(config.ai_api_base.clone(), config.ai_api_key.clone())?;

    let storage: Arc<dyn ObjectStorage> =
        match (&config.supabase_url, &config.supabase_service_key) {
            (Some(url), Some(key)) => {
                info!(bucket = %config.storage_bucket, "Storing images in Supabase");
                Arc::new(SupabaseStorage::new(url, key, &config.storage_bucket))
            }
            _ => {
                info!(dir = %config.upload_dir.display(), "Storing images on local disk");
                Arc::new(LocalStorage::new(&config.upload_dir, config.public_base_url()))
            }
        };

    let ctx = AppContext {
        db: Arc::new(db),
        ai: Arc::new(ai),
        storage,
        images: ImageFetcher::new()?,
        admin_api_key: config.admin_api_key.as_deref().map(Arc::from),
    };
    if ctx.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY is not set; admin routes are open");
    }

    let app = create_app(ctx);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Storefront API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
