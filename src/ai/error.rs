//! Error types for the generative-AI client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    /// No API key was configured.
    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    /// The model answered but produced nothing usable.
    #[error("empty response from model {0}")]
    EmptyResponse(String),

    /// Every model in a fallback list failed; carries the last failure.
    #[error("All models failed. Last error: {0}")]
    AllModelsFailed(String),
}

/// Error body returned by the generative-language API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
