use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    http::StatusCode,
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::ai::GenerativeModel;
use crate::api::{respond, ApiResult};
use crate::error::ApiError;
use crate::services::try_on::{self, normalize_image, ImageFetcher};
use crate::AppContext;

/// Two phone photos fit comfortably below this.
const MAX_TRY_ON_BODY: usize = 20 * 1024 * 1024;

pub fn try_on_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/virtual-try-on", post(virtual_try_on))
        .layer(DefaultBodyLimit::max(MAX_TRY_ON_BODY))
        .layer(Extension(ctx.ai.clone()))
        .layer(Extension(ctx.images.clone()))
}

#[derive(Default)]
struct TryOnForm {
    person_image: Option<Vec<u8>>,
    product_image: Option<Vec<u8>>,
    product_image_url: Option<String>,
}

impl TryOnForm {
    async fn read(mut multipart: Multipart) -> Result<TryOnForm, ApiError> {
        let mut form = TryOnForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("person_image") => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Validation(e.body_text()))?;
                    if !data.is_empty() {
                        form.person_image = Some(data.to_vec());
                    }
                }
                Some("product_image") => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Validation(e.body_text()))?;
                    if !data.is_empty() {
                        form.product_image = Some(data.to_vec());
                    }
                }
                Some("product_image_url") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(e.body_text()))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        form.product_image_url = Some(text.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn virtual_try_on(
    Extension(ai): Extension<Arc<dyn GenerativeModel>>,
    Extension(fetcher): Extension<ImageFetcher>,
    multipart: Multipart,
) -> ApiResult {
    let form = TryOnForm::read(multipart).await?;

    let person = form
        .person_image
        .ok_or_else(|| ApiError::validation("person_image is required"))?;
    let garment = match (form.product_image, form.product_image_url) {
        (Some(bytes), _) => bytes,
        (None, Some(url)) => {
            info!(url = %url, "Fetching product image for try-on");
            fetcher.fetch(&url).await?
        }
        (None, None) => {
            return Err(ApiError::validation(
                "product_image or product_image_url is required",
            ))
        }
    };

    let person = normalize_image(&person)?;
    let garment = normalize_image(&garment)?;
    let result = try_on::try_on(ai.as_ref(), person, garment).await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": { "image": result.to_data_url() }
        }),
    ))
}
