//! Wire types for the `generateContent` API
//!
//! Field names follow the upstream REST API: `inline_data`/`mime_type` in
//! parts, `generationConfig` with a snake_case `response_mime_type` inside.

use serde::{Deserialize, Serialize};

use crate::models::ImageBlob;

/// Request body shared by the proxy and the direct upstream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(
        rename = "generationConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single-turn request: prompt text followed by any images
    pub fn new(prompt: &str, images: &[ImageBlob]) -> Self {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        parts.extend(images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }));

        Self {
            contents: vec![Content { parts }],
            generation_config: None,
        }
    }

    /// Ask the model to answer with JSON
    pub fn json_response(mut self) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

/// How a name-based recalculation asks for its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecalcStyle {
    /// Bare number, no JSON mode
    Number,
    /// `{nameKo, nameEn, caloriesPer100g}` in JSON mode
    #[default]
    Bilingual,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let images = vec![ImageBlob {
            mime_type: "image/jpeg".into(),
            data: "AAAA".into(),
        }];
        let request = GenerateContentRequest::new("What is this?", &images).json_response();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [{
                    "parts": [
                        {"text": "What is this?"},
                        {"inline_data": {"mime_type": "image/jpeg", "data": "AAAA"}}
                    ]
                }],
                "generationConfig": {"response_mime_type": "application/json"}
            })
        );
    }

    #[test]
    fn test_plain_request_omits_generation_config() {
        let request = GenerateContentRequest::new("kcal?", &[]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
        assert_eq!(value["contents"][0]["parts"][0]["text"], "kcal?");
    }
}
