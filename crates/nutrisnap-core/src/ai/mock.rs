//! Mock backend for testing
//!
//! Returns canned, deterministic results without any network access.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, BrandItem, FoodItem, ImageBlob, Language, Recalculation};

use super::AIBackend;

/// Mock AI backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Every call fails with an upstream error
    pub failing: bool,
    /// Artificial latency before answering
    pub delay: Duration,
    /// Analysis to return instead of the canned one
    pub analysis: Option<AnalysisResult>,
    /// Recalculation to return instead of the lookup table
    pub recalculation: Option<Recalculation>,
}

impl MockBackend {
    /// Create a healthy mock backend
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Default::default()
        }
    }

    /// Backend whose requests are all rejected
    pub fn failing() -> Self {
        Self {
            healthy: false,
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn with_recalculation(mut self, recalculation: Recalculation) -> Self {
        self.recalculation = Some(recalculation);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn respond(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err(Error::Upstream {
                status: 500,
                message: "API Key not configured in environment".into(),
            });
        }
        Ok(())
    }
}

/// Canned analysis: one plate of rice and one branded snack
fn canned_analysis() -> AnalysisResult {
    AnalysisResult {
        foods: vec![FoodItem {
            name: Some("쌀밥".into()),
            name_ko: Some("쌀밥".into()),
            name_en: Some("Rice".into()),
            weight: Some("150g".into()),
            calories: 200,
            carbs: 45,
            protein: 4,
            fat: 1,
        }],
        brands: vec![BrandItem {
            brand_name: Some("A".into()),
            product_name: Some("B".into()),
            calories: 150,
            weight: Some("100g".into()),
            ..Default::default()
        }],
    }
}

pub(crate) fn lookup_calories(name: &str) -> Recalculation {
    let lower = name.to_lowercase();
    let (ko, en, kcal) = if lower.contains("현미") || lower.contains("brown rice") {
        ("현미밥", "Brown Rice", 110.0)
    } else if lower.contains("고구마") || lower.contains("sweet potato") {
        ("고구마", "Sweet Potato", 86.0)
    } else if lower.contains("닭") || lower.contains("chicken") {
        ("닭가슴살", "Chicken Breast", 165.0)
    } else if lower.contains("밥") || lower.contains("rice") {
        ("쌀밥", "Rice", 130.0)
    } else {
        return Recalculation {
            calories_per_100: 100.0,
            ..Default::default()
        };
    };

    Recalculation {
        calories_per_100: kcal,
        name_ko: Some(ko.into()),
        name_en: Some(en.into()),
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn analyze_images(
        &self,
        _images: &[ImageBlob],
        _language: Language,
    ) -> Result<AnalysisResult> {
        self.respond().await?;
        Ok(self.analysis.clone().unwrap_or_else(canned_analysis))
    }

    async fn recalculate(&self, name: &str, _language: Language) -> Result<Recalculation> {
        self.respond().await?;
        Ok(self.recalculation.clone().unwrap_or_else(|| lookup_calories(name)))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
