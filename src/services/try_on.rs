//! Virtual try-on: person photo plus garment image in, composited image out.

use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{GenerativeModel, InlineImage, Part, TRY_ON_MODEL};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const JPEG_QUALITY: u8 = 90;
/// Longest slice of model text echoed back when no image came out.
const DIAGNOSTIC_CHARS: usize = 200;

pub const TRY_ON_PROMPT: &str = "Dress the person in the first image in the garment shown in the \
second image. Keep the person's face, body shape, pose, skin tone, hair and the background \
exactly as they are, and replace only the clothing. Match the garment's colour, pattern, fabric \
and fit, with natural folds and lighting. Return a single photorealistic image.";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to fetch product image: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Failed to fetch product image: HTTP {0}")]
    FetchStatus(u16),
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Invalid image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Downloads product images by URL with fixed connect and read timeouts.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new() -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::FetchStatus(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Prepares image bytes for the model. JPEG, and PNG without transparency,
/// pass through untouched; anything else is flattened to RGB and re-encoded
/// as JPEG.
pub fn normalize_image(bytes: &[u8]) -> Result<InlineImage, ImageError> {
    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|err| ImageError::Decode(err.to_string()))?;

    match format {
        ImageFormat::Jpeg if !decoded.color().has_alpha() => {
            Ok(InlineImage::new("image/jpeg", bytes.to_vec()))
        }
        ImageFormat::Png if !decoded.color().has_alpha() => {
            Ok(InlineImage::new("image/png", bytes.to_vec()))
        }
        _ => encode_jpeg(&decoded),
    }
}

fn encode_jpeg(image: &DynamicImage) -> Result<InlineImage, ImageError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|err| ImageError::Encode(err.to_string()))?;
    Ok(InlineImage::new("image/jpeg", buffer))
}

#[derive(Debug, Error)]
pub enum TryOnError {
    #[error(transparent)]
    Ai(#[from] crate::ai::AiError),
    /// The model answered without an image; carries its (truncated) text.
    #[error("Model returned no image: {0}")]
    NoImage(String),
}

/// Sends person, garment and instructions, in that order, and returns the
/// first generated image.
pub async fn try_on(
    ai: &dyn GenerativeModel,
    person: InlineImage,
    garment: InlineImage,
) -> Result<InlineImage, TryOnError> {
    let parts = vec![
        Part::Image(person),
        Part::Image(garment),
        Part::Text(TRY_ON_PROMPT.to_string()),
    ];

    let generation = ai.generate(TRY_ON_MODEL, parts).await?;
    match generation.images.into_iter().next() {
        Some(image) => {
            info!(mime_type = %image.mime_type, bytes = image.data.len(), "Try-on image generated");
            Ok(image)
        }
        None => {
            let text: String = generation
                .text
                .unwrap_or_default()
                .chars()
                .take(DIAGNOSTIC_CHARS)
                .collect();
            warn!(text = %text, "Try-on model returned no image");
            Err(TryOnError::NoImage(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn opaque_png_passes_through() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]))),
            ImageFormat::Png,
        );
        let normalized = normalize_image(&png).unwrap();
        assert_eq!(normalized.mime_type, "image/png");
        assert_eq!(normalized.data, png);
    }

    #[test]
    fn transparent_png_becomes_jpeg() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 128]))),
            ImageFormat::Png,
        );
        let normalized = normalize_image(&png).unwrap();
        assert_eq!(normalized.mime_type, "image/jpeg");
        assert_eq!(image::guess_format(&normalized.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn gif_becomes_jpeg() {
        let gif = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 255]))),
            ImageFormat::Gif,
        );
        let normalized = normalize_image(&gif).unwrap();
        assert_eq!(normalized.mime_type, "image/jpeg");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            normalize_image(b"definitely not an image"),
            Err(ImageError::UnsupportedFormat)
        ));
    }
}
