use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{non_blank, respond, ApiResult};
use crate::error::ApiError;
use crate::storage::{sanitize_file_name, ObjectStorage, StoredObject};
use crate::AppContext;

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
/// Room for a handful of full-size files plus multipart framing.
const MAX_UPLOAD_BODY: usize = 50 * 1024 * 1024;

pub fn upload_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/upload/images", post(upload_images).delete(delete_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY))
        .layer(Extension(ctx.storage.clone()))
}

fn allowed_content_types() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("image/jpeg", "jpg"),
        ("image/jpg", "jpg"),
        ("image/png", "png"),
        ("image/webp", "webp"),
        ("image/gif", "gif"),
    ])
}

#[derive(Debug, Serialize)]
struct UploadedImage {
    url: String,
    path: String,
    original_name: String,
}

impl UploadedImage {
    fn new(stored: StoredObject, original_name: String) -> Self {
        Self {
            url: stored.url,
            path: stored.path,
            original_name,
        }
    }
}

/// Object path for an upload: unique prefix, sanitised name, matching extension.
fn object_path(original_name: &str, extension: &str) -> String {
    let name = sanitize_file_name(original_name);
    let name = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{extension}"),
        _ => format!("{name}.{extension}"),
    };
    format!("products/{}-{}", Uuid::new_v4(), name)
}

/// Checks one file and returns the extension it will be stored under.
fn check_file(content_type: &str, size: usize) -> Result<&'static str, String> {
    let extension = allowed_content_types()
        .get(content_type)
        .copied()
        .ok_or_else(|| "Invalid file type. Only JPEG, PNG, WebP and GIF are allowed.".to_string())?;
    if size > MAX_FILE_SIZE {
        return Err("File too large. Maximum size is 5MB.".to_string());
    }
    Ok(extension)
}

async fn upload_images(
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
    mut multipart: Multipart,
) -> ApiResult {
    let mut uploaded = Vec::new();
    let mut errors = Vec::new();
    let mut received = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if !matches!(field.name(), Some("files") | Some("files[]")) {
            continue;
        }
        received += 1;

        let original_name = field
            .file_name()
            .map(str::to_owned)
            .unwrap_or_else(|| "image".to_string());
        let content_type = field
            .content_type()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        let extension = match check_file(&content_type, data.len()) {
            Ok(extension) => extension,
            Err(message) => {
                errors.push(format!("{original_name}: {message}"));
                continue;
            }
        };

        let path = object_path(&original_name, extension);
        match storage.put(&path, &content_type, data.to_vec()).await {
            Ok(stored) => {
                info!(path = %stored.path, "Stored uploaded image");
                uploaded.push(UploadedImage::new(stored, original_name));
            }
            Err(err) => {
                warn!(error = %err, name = %original_name, "Image upload failed");
                errors.push(format!("{original_name}: {err}"));
            }
        }
    }

    if received == 0 {
        return Err(ApiError::validation("No files provided"));
    }

    let message = format!("{} file(s) uploaded successfully", uploaded.len());
    Ok(respond(
        StatusCode::OK,
        json!({
            "success": !uploaded.is_empty(),
            "message": message,
            "uploaded": uploaded,
            "errors": errors,
        }),
    ))
}

#[derive(Deserialize)]
struct DeletePayload {
    path: Option<String>,
}

async fn delete_image(
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
    Json(payload): Json<DeletePayload>,
) -> ApiResult {
    let path = non_blank(payload.path).ok_or_else(|| ApiError::validation("path is required"))?;
    storage.delete(&path).await?;
    info!(path = %path, "Deleted uploaded image");

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Image deleted successfully" }),
    ))
}
