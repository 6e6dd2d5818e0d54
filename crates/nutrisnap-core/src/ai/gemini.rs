//! Direct upstream backend
//!
//! Calls `{host}/v1beta/models/{model}:generateContent?key=...`. The proxy
//! server also uses [`GeminiBackend::forward`] to relay client bodies as-is.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::models::{AnalysisResult, ImageBlob, Language, Recalculation};
use crate::prompts::PromptLibrary;

use super::parsing::{parse_analysis_text, parse_recalculation_text};
use super::types::RecalcStyle;
use super::{
    analyze_request, read_candidate_text, recalculate_request, AIBackend, DEFAULT_GEMINI_HOST,
    DEFAULT_MODEL, UPSTREAM_TIMEOUT,
};

/// Backend holding the upstream credential
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    host: String,
    model: String,
    api_key: String,
    prompts: Arc<RwLock<PromptLibrary>>,
    recalc_style: RecalcStyle,
}

impl GeminiBackend {
    pub fn new(host: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
            recalc_style: RecalcStyle::default(),
        }
    }

    /// Create from `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_HOST`
    ///
    /// Returns None when no (non-empty) key is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let host =
            std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_GEMINI_HOST.to_string());
        Some(Self::new(&host, &model, &api_key))
    }

    pub fn with_recalc_style(mut self, style: RecalcStyle) -> Self {
        self.recalc_style = style;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// `generateContent` URL without the key
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.host, self.model
        )
    }

    /// Relay a request body upstream and hand back status and JSON unchanged
    ///
    /// Transport failures and non-JSON bodies are errors.
    pub async fn forward(&self, body: &Value) -> Result<(u16, Value)> {
        debug!(model = %self.model, "Forwarding generateContent request");
        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .timeout(UPSTREAM_TIMEOUT)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        Ok((status, body))
    }

    async fn generate_text(&self, request: &super::GenerateContentRequest) -> Result<String> {
        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .timeout(UPSTREAM_TIMEOUT)
            .json(request)
            .send()
            .await?;

        read_candidate_text(response).await
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn analyze_images(
        &self,
        images: &[ImageBlob],
        language: Language,
    ) -> Result<AnalysisResult> {
        let request = analyze_request(&self.prompts, images, language)?;
        let text = self.generate_text(&request).await?;
        parse_analysis_text(&text)
    }

    async fn recalculate(&self, name: &str, language: Language) -> Result<Recalculation> {
        let request = recalculate_request(&self.prompts, name, language, self.recalc_style)?;
        let text = self.generate_text(&request).await?;
        Ok(parse_recalculation_text(&text))
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/v1beta/models/{}", self.host, self.model))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .is_ok_and(|resp| resp.status().is_success())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::MockGeminiServer;
    use serde_json::json;

    #[test]
    fn test_endpoint() {
        let backend = GeminiBackend::new("https://example.test/", "gemini-x", "k");
        assert_eq!(
            backend.endpoint(),
            "https://example.test/v1beta/models/gemini-x:generateContent"
        );
    }

    #[tokio::test]
    async fn test_analyze_images_against_mock_server() {
        let server = MockGeminiServer::start().await;
        let backend = GeminiBackend::new(&server.url(), DEFAULT_MODEL, "test-key")
            .with_prompts(PromptLibrary::embedded_only());

        let images = vec![ImageBlob::from_bytes("image/jpeg", b"fake")];
        let result = backend.analyze_images(&images, Language::Ko).await.unwrap();
        assert_eq!(result.foods.len(), 1);
        assert_eq!(result.brands.len(), 1);
        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn test_recalculate_against_mock_server() {
        let server = MockGeminiServer::start().await;
        let backend = GeminiBackend::new(&server.url(), DEFAULT_MODEL, "test-key")
            .with_prompts(PromptLibrary::embedded_only());

        let bilingual = backend.recalculate("현미밥", Language::Ko).await.unwrap();
        assert_eq!(bilingual.calories_per_100, 110.0);
        assert_eq!(bilingual.name_en.as_deref(), Some("Brown Rice"));

        let plain = backend
            .with_recalc_style(RecalcStyle::Number)
            .recalculate("현미밥", Language::Ko)
            .await
            .unwrap();
        assert_eq!(plain.calories_per_100, 110.0);
        assert!(plain.name_en.is_none());
    }

    #[tokio::test]
    async fn test_rejected_key_is_upstream_error() {
        let server = MockGeminiServer::start_failing().await;
        let backend = GeminiBackend::new(&server.url(), DEFAULT_MODEL, "bad-key")
            .with_prompts(PromptLibrary::embedded_only());

        let err = backend
            .analyze_images(&[ImageBlob::from_bytes("image/png", b"x")], Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 400, .. }));

        let (status, body) = backend.forward(&json!({"contents": []})).await.unwrap();
        assert_eq!(status, 400);
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let backend = GeminiBackend::new("http://127.0.0.1:9", DEFAULT_MODEL, "k");
        assert!(!backend.health_check().await);
        assert!(matches!(
            backend.forward(&json!({})).await,
            Err(Error::Http(_))
        ));
    }
}
