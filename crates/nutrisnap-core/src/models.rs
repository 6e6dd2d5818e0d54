//! Data models for NutriSnap
//!
//! Food and brand records as reported by the generation model, plus the
//! small value types (language, metric, weight, nutrition snapshot) shared
//! by the table and session layers.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::{lenient_int, lenient_nutrition_info, lenient_string, parse_weight};

/// Display and request language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    /// Language name as written into model prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Self::Ko => "Korean",
            Self::En => "English",
        }
    }

    /// Placeholder shown when a brand carries no nutrition text
    pub fn no_info_text(&self) -> &'static str {
        match self {
            Self::Ko => "정보 없음",
            Self::En => "No info",
        }
    }

    /// Notice shown when the analysis fell back to the simulated dataset
    pub fn simulated_notice(&self) -> &'static str {
        match self {
            Self::Ko => "💡 안내: 현재 API 키 또는 네트워크 설정 문제로 인해 시뮬레이션(데모) 모드로 분석 결과를 표시합니다.",
            Self::En => "💡 Notice: Showing simulated (demo) results because of an API key or network problem.",
        }
    }

    /// Toggle between the two supported languages
    pub fn toggled(&self) -> Self {
        match self {
            Self::Ko => Self::En,
            Self::En => Self::Ko,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ko" | "kr" | "korean" | "한국어" => Ok(Self::Ko),
            "en" | "english" => Ok(Self::En),
            other => Err(format!("Unknown language: {} (expected ko or en)", other)),
        }
    }
}

/// Nutrition field shown in the value column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Calories,
    Carbs,
    Protein,
    Fat,
}

impl Metric {
    /// Display order; the metric cursor indexes into this
    pub const ALL: [Metric; 4] = [Self::Calories, Self::Carbs, Self::Protein, Self::Fat];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Calories => "calories",
            Self::Carbs => "carbs",
            Self::Protein => "protein",
            Self::Fat => "fat",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Calories => "kcal",
            _ => "g",
        }
    }

    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Calories, Language::Ko) => "칼로리",
            (Self::Carbs, Language::Ko) => "탄수화물",
            (Self::Protein, Language::Ko) => "단백질",
            (Self::Fat, Language::Ko) => "지방",
            (Self::Calories, Language::En) => "Calories",
            (Self::Carbs, Language::En) => "Carbs",
            (Self::Protein, Language::En) => "Protein",
            (Self::Fat, Language::En) => "Fat",
        }
    }

    /// Label for the total line ("총 칼로리", "Total Calories")
    pub fn total_label(&self, language: Language) -> String {
        match language {
            Language::Ko => format!("총 {}", self.label(language)),
            Language::En => format!("Total {}", self.label(language)),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Calories => 0,
            Self::Carbs => 1,
            Self::Protein => 2,
            Self::Fat => 3,
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calories" | "kcal" | "cal" => Ok(Self::Calories),
            "carbs" | "carbohydrates" => Ok(Self::Carbs),
            "protein" => Ok(Self::Protein),
            "fat" | "fats" => Ok(Self::Fat),
            other => Err(format!(
                "Unknown metric: {} (expected calories, carbs, protein or fat)",
                other
            )),
        }
    }
}

/// Nutrition snapshot of a single item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: u32,
    pub carbs: u32,
    pub protein: u32,
    pub fat: u32,
}

impl Nutrition {
    pub fn get(&self, metric: Metric) -> u32 {
        match metric {
            Metric::Calories => self.calories,
            Metric::Carbs => self.carbs,
            Metric::Protein => self.protein,
            Metric::Fat => self.fat,
        }
    }
}

/// A weight string split into magnitude and display unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weight {
    pub magnitude: f64,
    pub unit: String,
}

impl Weight {
    /// Parse "200g", "1.5 cups", "350" (unit defaults to "g")
    pub fn parse(raw: &str) -> Self {
        parse_weight(raw)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit)
    }
}

/// A recognized or manually added food entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name_ko: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name_en: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub calories: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub carbs: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub protein: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub fat: u32,
}

impl FoodItem {
    /// Create an item with a single (language-neutral) name
    pub fn new(name: &str, weight: &str, nutrition: Nutrition) -> Self {
        Self {
            name: Some(name.to_string()),
            weight: Some(weight.to_string()),
            calories: nutrition.calories,
            carbs: nutrition.carbs,
            protein: nutrition.protein,
            fat: nutrition.fat,
            ..Default::default()
        }
    }

    /// Name to show for the given language
    ///
    /// Prefers the localized field, then the plain name, then the other language.
    pub fn display_name(&self, language: Language) -> &str {
        let (localized, other) = match language {
            Language::Ko => (&self.name_ko, &self.name_en),
            Language::En => (&self.name_en, &self.name_ko),
        };
        [localized, &self.name, other]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// Whether any of the name fields equals `candidate` exactly
    pub fn has_name(&self, candidate: &str) -> bool {
        [&self.name, &self.name_ko, &self.name_en]
            .into_iter()
            .flatten()
            .any(|n| n == candidate)
    }

    /// Weight string, defaulting to "0g" when absent or empty
    pub fn weight_or_default(&self) -> &str {
        match self.weight.as_deref() {
            Some(w) if !w.is_empty() => w,
            _ => "0g",
        }
    }

    pub fn nutrition(&self) -> Nutrition {
        Nutrition {
            calories: self.calories,
            carbs: self.carbs,
            protein: self.protein,
            fat: self.fat,
        }
    }
}

/// Free-form nutrition details reported for a branded product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutritionInfo {
    Text(String),
    Fields(serde_json::Map<String, serde_json::Value>),
}

impl NutritionInfo {
    /// Render as display text (`key: value, key: value` for mappings)
    pub fn to_display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Fields(fields) => fields
                .iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("{}: {}", key, s),
                    other => format!("{}: {}", key, other),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// A branded product recognized in a photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandItem {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand_name_ko: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand_name_en: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name_ko: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name_en: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_nutrition_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub nutrition_info: Option<NutritionInfo>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub calories: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub carbs: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub protein: u32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub fat: u32,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
}

impl BrandItem {
    pub fn brand(&self, language: Language) -> &str {
        localized(&self.brand_name, &self.brand_name_ko, &self.brand_name_en, language)
    }

    pub fn product(&self, language: Language) -> &str {
        localized(
            &self.product_name,
            &self.product_name_ko,
            &self.product_name_en,
            language,
        )
    }

    /// Composite display name: `[brand] product`
    pub fn composite_name(&self, language: Language) -> String {
        format!("[{}] {}", self.brand(language), self.product(language))
    }

    /// Whether both languages have their own brand and product fields
    pub fn is_bilingual(&self) -> bool {
        self.brand_name_ko.is_some()
            && self.brand_name_en.is_some()
            && self.product_name_ko.is_some()
            && self.product_name_en.is_some()
    }
}

fn localized<'a>(
    plain: &'a Option<String>,
    ko: &'a Option<String>,
    en: &'a Option<String>,
    language: Language,
) -> &'a str {
    let (first, last) = match language {
        Language::Ko => (ko, en),
        Language::En => (en, ko),
    };
    [first, plain, last]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Decoded analysis payload: `{foods: [...], brands: [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub foods: Vec<FoodItem>,
    pub brands: Vec<BrandItem>,
}

/// Result of a name-based calorie lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recalculation {
    /// Calories per 100 units of weight
    pub calories_per_100: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_ko: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
}

impl Recalculation {
    pub fn rate_per_unit(&self) -> f64 {
        self.calories_per_100 / 100.0
    }
}

/// An uploaded photo, base64-encoded without a data-URL prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlob {
    pub mime_type: String,
    pub data: String,
}

impl ImageBlob {
    /// Encode raw image bytes
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Split a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidData("Not a data URL".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidData("Data URL has no payload".into()))?;
        let mime_type = header.strip_suffix(";base64").unwrap_or(header);
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_localized() {
        let item = FoodItem {
            name: Some("밥".into()),
            name_ko: Some("쌀밥".into()),
            name_en: Some("Rice".into()),
            ..Default::default()
        };
        assert_eq!(item.display_name(Language::Ko), "쌀밥");
        assert_eq!(item.display_name(Language::En), "Rice");

        let plain = FoodItem {
            name: Some("Rice".into()),
            ..Default::default()
        };
        assert_eq!(plain.display_name(Language::Ko), "Rice");
        assert_eq!(FoodItem::default().display_name(Language::En), "");
    }

    #[test]
    fn test_brand_composite_name() {
        let brand = BrandItem {
            brand_name_ko: Some("농심".into()),
            brand_name_en: Some("Nongshim".into()),
            product_name_ko: Some("신라면".into()),
            product_name_en: Some("Shin Ramyun".into()),
            ..Default::default()
        };
        assert_eq!(brand.composite_name(Language::Ko), "[농심] 신라면");
        assert_eq!(brand.composite_name(Language::En), "[Nongshim] Shin Ramyun");
        assert!(brand.is_bilingual());
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(Metric::Calories.unit(), "kcal");
        assert_eq!(Metric::Fat.unit(), "g");
        assert_eq!(Metric::Carbs.total_label(Language::Ko), "총 탄수화물");
        assert_eq!(Metric::Protein.total_label(Language::En), "Total Protein");
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
    }

    #[test]
    fn test_nutrition_info_display() {
        let info: NutritionInfo =
            serde_json::from_str(r#"{"sugar": 4, "calories": "120kcal", "fat": "3g"}"#).unwrap();
        assert_eq!(info.to_display(), "sugar: 4, calories: 120kcal, fat: 3g");

        let text = NutritionInfo::Text("500kcal per pack".into());
        assert_eq!(text.to_display(), "500kcal per pack");
    }

    #[test]
    fn test_image_blob_from_data_url() {
        let blob = ImageBlob::from_data_url("data:image/png;base64,AAAA").unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(blob.data, "AAAA");
        assert!(blob.is_image());

        assert!(ImageBlob::from_data_url("image/png;base64,AAAA").is_err());
        assert!(ImageBlob::from_data_url("data:text/plain").is_err());
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("korean".parse::<Language>().unwrap(), Language::Ko);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::Ko.toggled(), Language::En);
    }
}
