//! Backend that talks to the NutriSnap proxy
//!
//! The proxy holds the upstream credential; this client only knows the
//! proxy's base URL and posts `generateContent` bodies to `/api/analyze` and
//! `/api/recalculate`.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::Result;
use crate::models::{AnalysisResult, ImageBlob, Language, Recalculation};
use crate::prompts::PromptLibrary;

use super::parsing::{parse_analysis_text, parse_recalculation_text};
use super::types::{GenerateContentRequest, RecalcStyle};
use super::{
    analyze_request, read_candidate_text, recalculate_request, AIBackend, DEFAULT_PROXY_URL,
    UPSTREAM_TIMEOUT,
};

#[derive(Clone)]
pub struct ProxyBackend {
    http_client: Client,
    base_url: String,
    /// The upstream model is chosen by the proxy; this is only a label
    model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
    recalc_style: RecalcStyle,
}

impl ProxyBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "proxy".to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
            recalc_style: RecalcStyle::default(),
        }
    }

    /// Create from `NUTRISNAP_PROXY_URL` (default http://127.0.0.1:8788)
    pub fn from_env() -> Self {
        let url =
            std::env::var("NUTRISNAP_PROXY_URL").unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string());
        Self::new(&url)
    }

    pub fn with_recalc_style(mut self, style: RecalcStyle) -> Self {
        self.recalc_style = style;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    async fn post(&self, path: &str, request: &GenerateContentRequest) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .timeout(UPSTREAM_TIMEOUT)
            .json(request)
            .send()
            .await?;

        read_candidate_text(response).await
    }

    /// Fetch the proxy's health document
    pub async fn health(&self) -> Result<Value> {
        let response = self
            .http_client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AIBackend for ProxyBackend {
    async fn analyze_images(
        &self,
        images: &[ImageBlob],
        language: Language,
    ) -> Result<AnalysisResult> {
        let request = analyze_request(&self.prompts, images, language)?;
        let text = self.post("/api/analyze", &request).await?;
        parse_analysis_text(&text)
    }

    async fn recalculate(&self, name: &str, language: Language) -> Result<Recalculation> {
        let request = recalculate_request(&self.prompts, name, language, self.recalc_style)?;
        let text = self.post("/api/recalculate", &request).await?;
        Ok(parse_recalculation_text(&text))
    }

    async fn health_check(&self) -> bool {
        self.health()
            .await
            .is_ok_and(|doc| doc.get("upstream_configured") == Some(&Value::Bool(true)))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::MockGeminiServer;

    #[tokio::test]
    async fn test_proxy_round_trip() {
        let server = MockGeminiServer::start().await;
        let backend = ProxyBackend::new(&server.url()).with_prompts(PromptLibrary::embedded_only());

        let result = backend
            .analyze_images(&[ImageBlob::from_bytes("image/jpeg", b"x")], Language::Ko)
            .await
            .unwrap();
        assert_eq!(result.foods[0].display_name(Language::En), "Rice");

        let recalculation = backend.recalculate("고구마", Language::Ko).await.unwrap();
        assert_eq!(recalculation.calories_per_100, 86.0);

        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn test_proxy_without_key_surfaces_error() {
        let server = MockGeminiServer::start_failing().await;
        let backend = ProxyBackend::new(&server.url()).with_prompts(PromptLibrary::embedded_only());

        let err = backend
            .analyze_images(&[ImageBlob::from_bytes("image/jpeg", b"x")], Language::Ko)
            .await
            .unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "API Key not configured in environment");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!backend.health_check().await);
    }
}
