//! Request parts, model output and the `generateContent` wire format.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Raw image bytes tagged with their MIME type.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// One element of a prompt. Order is preserved on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text(String),
    Image(InlineImage),
}

/// What a model produced: concatenated text and any inline images, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generation {
    pub text: Option<String>,
    pub images: Vec<InlineImage>,
}

// Wire types

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        alias = "inline_data"
    )]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl From<Part> for WirePart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text),
                inline_data: None,
            },
            Part::Image(image) => WirePart {
                text: None,
                inline_data: Some(Blob {
                    mime_type: image.mime_type,
                    data: STANDARD.encode(&image.data),
                }),
            },
        }
    }
}

impl GenerateContentRequest {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: parts.into_iter().map(WirePart::from).collect(),
            }],
        }
    }
}

impl GenerateContentResponse {
    /// Collects the first candidate's parts. Undecodable image payloads are skipped.
    pub fn into_generation(self) -> Generation {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        let mut text = String::new();
        let mut images = Vec::new();
        for part in parts {
            if let Some(chunk) = part.text {
                text.push_str(&chunk);
            }
            if let Some(blob) = part.inline_data {
                if let Ok(data) = STANDARD.decode(blob.data.as_bytes()) {
                    images.push(InlineImage::new(blob.mime_type, data));
                }
            }
        }

        Generation {
            text: (!text.trim().is_empty()).then_some(text),
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_keeps_part_order() {
        let request = GenerateContentRequest::from_parts(vec![
            Part::Image(InlineImage::new("image/jpeg", vec![1, 2, 3])),
            Part::Text("prompt".into()),
        ]);
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "prompt");
    }

    #[test]
    fn response_collects_text_and_images() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let generation = response.into_generation();
        assert_eq!(generation.text.as_deref(), Some("Here you go"));
        assert_eq!(generation.images.len(), 1);
        assert_eq!(
            generation.images[0].to_data_url(),
            "data:image/png;base64,AQID"
        );
    }

    #[test]
    fn empty_candidates_yield_empty_generation() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_generation(), Generation::default());
    }
}
