use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::ApiResult;
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::storage::{sanitize_file_name, ObjectStorage};

/// Serves objects written by local storage. Hosted buckets serve their own URLs.
pub fn uploads_router(storage: Arc<dyn ObjectStorage>) -> Router {
    Router::new()
        .route("/uploads/:name", get(serve_upload))
        .layer(Extension(storage))
}

async fn serve_upload(
    Path(name): Path<String>,
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
) -> ApiResult {
    let dir = storage
        .local_dir()
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    // Stored names are already sanitized, so anything that changes here was never written.
    if sanitize_file_name(&name) != name {
        return Err(ApiError::not_found("Not found"));
    }

    let path = dir.join(&name);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Not found"))?;

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(file);
    let body = axum::body::Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    Ok(to_response((headers, body), Ok(())))
}
