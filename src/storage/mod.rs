//! Image object storage: a hosted bucket in production, a local directory otherwise.

pub mod local;
pub mod supabase;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

pub use local::LocalStorage;
pub use supabase::SupabaseStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

/// Where an uploaded object ended up.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Directory served under `/uploads` when objects live on local disk.
    fn local_dir(&self) -> Option<&Path> {
        None
    }
}

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Lower-cased, filesystem and URL safe version of an uploaded file name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_CHARS.replace_all(base, "_").to_lowercase();
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.').to_string();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Rejects traversal and absolute paths before they reach a backend.
pub fn validate_object_path(path: &str) -> Result<&str, StorageError> {
    let trimmed = path.trim().trim_start_matches('/');
    let bad = trimmed.is_empty()
        || trimmed.split('/').any(|segment| segment == ".." || segment.is_empty())
        || trimmed.contains('\\');
    if bad {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(trimmed)
    }
}
