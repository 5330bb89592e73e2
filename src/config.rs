//! Process configuration, read once at startup.

use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://storefront.db?mode=rwc";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reads from environment variables:
/// - `HOST` / `PORT`: bind address (default `0.0.0.0:3000`)
/// - `DATABASE_URL`: relational store (default: local SQLite file)
/// - `GOOGLE_AI_API_KEY`, `GEMINI_API_BASE`: generative-AI endpoint
/// - `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`, `STORAGE_BUCKET`: hosted image bucket
/// - `UPLOAD_DIR`, `PUBLIC_BASE_URL`: local image storage when no bucket is configured
/// - `ADMIN_API_KEY`: bearer key for `/api/admin`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub ai_api_key: Option<String>,
    pub ai_api_base: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub storage_bucket: String,
    pub upload_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub admin_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            ai_api_key: get("GOOGLE_AI_API_KEY"),
            ai_api_base: get("GEMINI_API_BASE").unwrap_or(defaults.ai_api_base),
            supabase_url: get("SUPABASE_URL"),
            supabase_service_key: get("SUPABASE_SERVICE_KEY"),
            storage_bucket: get("STORAGE_BUCKET").unwrap_or(defaults.storage_bucket),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: get("PUBLIC_BASE_URL"),
            admin_api_key: get("ADMIN_API_KEY"),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base used to build URLs for locally stored images.
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            ai_api_key: None,
            ai_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            supabase_url: None,
            supabase_service_key: None,
            storage_bucket: "product-images".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            public_base_url: None,
            admin_api_key: None,
        }
    }
}
