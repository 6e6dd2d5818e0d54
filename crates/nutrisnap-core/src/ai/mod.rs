//! Generative model backends
//!
//! # Architecture
//!
//! - `AIBackend` trait: photo analysis, name-based recalculation, health
//! - `AIClient` enum: Clone + compile-time dispatch over the backends
//! - Backends: `ProxyBackend` (through the NutriSnap proxy, no credential on
//!   the client), `GeminiBackend` (direct upstream call), `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: proxy (default), gemini, mock
//! - `NUTRISNAP_PROXY_URL`: proxy base URL (default: http://127.0.0.1:8788)
//! - `GEMINI_API_KEY`: upstream credential (required for gemini)
//! - `GEMINI_MODEL`: model name (default: gemini-2.5-flash-lite)
//! - `GEMINI_HOST`: upstream base URL (default: https://generativelanguage.googleapis.com)

mod gemini;
mod mock;
pub mod parsing;
mod proxy;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
#[cfg(any(test, feature = "test-utils"))]
pub(crate) use mock::lookup_calories;
pub use proxy::ProxyBackend;
pub use types::*;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, ImageBlob, Language, Recalculation};
use crate::prompts::{PromptId, PromptLibrary};

use parsing::{candidate_text, upstream_error};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8788";

/// Per-request timeout on outbound model calls
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Interface shared by all model backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Identify foods and branded products in one or more photos
    async fn analyze_images(
        &self,
        images: &[ImageBlob],
        language: Language,
    ) -> Result<AnalysisResult>;

    /// Look up calories per 100 g for a food name
    async fn recalculate(&self, name: &str, language: Language) -> Result<Recalculation>;

    async fn health_check(&self) -> bool;

    fn model(&self) -> &str;

    fn host(&self) -> &str;
}

/// Concrete AI client
#[derive(Clone)]
pub enum AIClient {
    /// Requests go through the NutriSnap proxy
    Proxy(ProxyBackend),
    /// Requests go straight to the upstream API
    Gemini(GeminiBackend),
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client from `AI_BACKEND`
    ///
    /// Returns None when the chosen backend is missing required variables.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "proxy".to_string());

        match backend.to_lowercase().as_str() {
            "proxy" => Some(AIClient::Proxy(ProxyBackend::from_env())),
            "gemini" | "google" => GeminiBackend::from_env().map(AIClient::Gemini),
            "mock" => Some(AIClient::mock()),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to proxy");
                Some(AIClient::Proxy(ProxyBackend::from_env()))
            }
        }
    }

    pub fn proxy(base_url: &str) -> Self {
        AIClient::Proxy(ProxyBackend::new(base_url))
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn analyze_images(
        &self,
        images: &[ImageBlob],
        language: Language,
    ) -> Result<AnalysisResult> {
        match self {
            AIClient::Proxy(b) => b.analyze_images(images, language).await,
            AIClient::Gemini(b) => b.analyze_images(images, language).await,
            AIClient::Mock(b) => b.analyze_images(images, language).await,
        }
    }

    async fn recalculate(&self, name: &str, language: Language) -> Result<Recalculation> {
        match self {
            AIClient::Proxy(b) => b.recalculate(name, language).await,
            AIClient::Gemini(b) => b.recalculate(name, language).await,
            AIClient::Mock(b) => b.recalculate(name, language).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Proxy(b) => b.health_check().await,
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Proxy(b) => b.model(),
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Proxy(b) => b.host(),
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Build the photo-analysis request
pub(crate) fn analyze_request(
    prompts: &RwLock<PromptLibrary>,
    images: &[ImageBlob],
    language: Language,
) -> Result<GenerateContentRequest> {
    let prompt = {
        let mut prompts = prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(PromptId::AnalyzeFoods)?;
        let mut vars = HashMap::new();
        vars.insert("language", language.prompt_name());
        template.render_user(&vars)
    };

    Ok(GenerateContentRequest::new(&prompt, images).json_response())
}

/// Build the name-lookup request in the given style
pub(crate) fn recalculate_request(
    prompts: &RwLock<PromptLibrary>,
    name: &str,
    language: Language,
    style: RecalcStyle,
) -> Result<GenerateContentRequest> {
    let id = match style {
        RecalcStyle::Number => PromptId::CaloriesPer100,
        RecalcStyle::Bilingual => PromptId::CaloriesPer100Bilingual,
    };

    let prompt = {
        let mut prompts = prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        let mut vars = HashMap::new();
        vars.insert("name", name);
        vars.insert("language", language.prompt_name());
        template.render_user(&vars)
    };

    let request = GenerateContentRequest::new(&prompt, &[]);
    Ok(match style {
        RecalcStyle::Number => request,
        RecalcStyle::Bilingual => request.json_response(),
    })
}

/// Read the candidate text out of a `generateContent`-shaped response
pub(crate) async fn read_candidate_text(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(upstream_error(status.as_u16(), &body));
    }

    let body: Value = response.json().await?;
    let text = candidate_text(&body)?;
    debug!("Model response: {}", text);
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        assert!(AIClient::mock().health_check().await);
    }

    #[test]
    fn test_analyze_request_carries_language_and_images() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());
        let images = vec![ImageBlob {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        }];

        let request = analyze_request(&prompts, &images, Language::En).unwrap();
        assert_eq!(request.contents[0].parts.len(), 2);
        assert!(request.generation_config.is_some());
        match &request.contents[0].parts[0] {
            Part::Text { text } => assert!(text.contains("Language: English")),
            other => panic!("expected text part, got {:?}", other),
        }
    }

    #[test]
    fn test_recalculate_request_styles() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let plain =
            recalculate_request(&prompts, "고구마", Language::Ko, RecalcStyle::Number).unwrap();
        assert!(plain.generation_config.is_none());

        let json =
            recalculate_request(&prompts, "고구마", Language::Ko, RecalcStyle::Bilingual).unwrap();
        assert!(json.generation_config.is_some());
        match &json.contents[0].parts[0] {
            Part::Text { text } => {
                assert!(text.contains("\"고구마\""));
                assert!(text.contains("caloriesPer100g"));
            }
            other => panic!("expected text part, got {:?}", other),
        }
    }
}
