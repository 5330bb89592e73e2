//! Generative-AI access behind a small trait so handlers can be driven by a
//! fake in tests.

pub mod error;
pub mod gemini;
pub mod types;

use async_trait::async_trait;
use tracing::warn;

pub use error::AiError;
pub use gemini::GeminiClient;
pub use types::{Generation, InlineImage, Part};

/// Models tried, in order, for text recommendations.
pub const RECOMMENDATION_MODELS: [&str; 3] =
    ["gemini-2.0-flash-exp", "gemini-2.5-flash", "gemini-1.5-flash"];

/// Image-output model used for virtual try-on.
pub const TRY_ON_MODEL: &str = "gemini-2.5-flash-image-preview";

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, model: &str, parts: Vec<Part>) -> Result<Generation, AiError>;
}

/// Tries each model in turn and returns the first successful generation.
pub async fn generate_with_fallback(
    ai: &dyn GenerativeModel,
    models: &[&str],
    parts: Vec<Part>,
) -> Result<Generation, AiError> {
    let mut last_error = String::from("no models configured");

    for model in models {
        match ai.generate(model, parts.clone()).await {
            Ok(generation) => return Ok(generation),
            Err(err) => {
                warn!(model = %model, error = %err, "Model call failed, trying next");
                last_error = err.to_string();
            }
        }
    }

    Err(AiError::AllModelsFailed(last_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        calls: Mutex<Vec<String>>,
        succeed_on: &'static str,
    }

    #[async_trait]
    impl GenerativeModel for Scripted {
        async fn generate(&self, model: &str, _parts: Vec<Part>) -> Result<Generation, AiError> {
            self.calls.lock().unwrap().push(model.to_string());
            if model == self.succeed_on {
                Ok(Generation {
                    text: Some(model.to_string()),
                    images: vec![],
                })
            } else {
                Err(AiError::EmptyResponse(model.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_model() {
        let ai = Scripted {
            calls: Mutex::new(vec![]),
            succeed_on: "gemini-2.5-flash",
        };
        let generation = generate_with_fallback(&ai, &RECOMMENDATION_MODELS, vec![])
            .await
            .unwrap();
        assert_eq!(generation.text.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(
            *ai.calls.lock().unwrap(),
            vec!["gemini-2.0-flash-exp", "gemini-2.5-flash"]
        );
    }

    #[tokio::test]
    async fn reports_last_error_when_all_fail() {
        let ai = Scripted {
            calls: Mutex::new(vec![]),
            succeed_on: "none",
        };
        let err = generate_with_fallback(&ai, &RECOMMENDATION_MODELS, vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gemini-1.5-flash"));
    }
}
