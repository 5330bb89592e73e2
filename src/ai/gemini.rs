//! Client for the Gemini `generateContent` REST endpoint.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::error::{AiError, ApiErrorResponse};
use super::types::{GenerateContentRequest, GenerateContentResponse, Generation, Part};
use super::GenerativeModel;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Without an API key every call fails with [`AiError::MissingApiKey`].
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key,
            }),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.inner.base_url, model)
    }

    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> AiError {
        match response.text().await {
            Ok(body) => {
                let message = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map(|api_error| api_error.error.message)
                    .unwrap_or(body);
                AiError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
            Err(e) => AiError::Http(e),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, parts), fields(parts = parts.len()))]
    async fn generate(&self, model: &str, parts: Vec<Part>) -> Result<Generation, AiError> {
        let api_key = self
            .inner
            .api_key
            .as_deref()
            .ok_or(AiError::MissingApiKey)?;

        let response = self
            .inner
            .client
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .json(&GenerateContentRequest::from_parts(parts))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;

        Ok(parsed.into_generation())
    }
}
