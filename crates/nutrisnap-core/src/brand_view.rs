//! Brand info cards
//!
//! One card per branded product from the last analysis, with its nutrition
//! text and a web search link for the product's nutrition facts.

use serde::Serialize;

use crate::models::{BrandItem, Language};

const SEARCH_URL: &str = "https://www.google.com/search?q=";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandCard {
    pub name: String,
    pub nutrition_text: String,
    pub search_link: String,
}

impl BrandCard {
    pub fn from_brand(brand: &BrandItem, language: Language) -> Self {
        let nutrition_text = brand
            .nutrition_info
            .as_ref()
            .map(|info| info.to_display())
            .unwrap_or_else(|| language.no_info_text().to_string());

        Self {
            name: brand.composite_name(language),
            nutrition_text,
            search_link: search_link(brand.brand(language), brand.product(language)),
        }
    }
}

/// Search URL for "<brand> <product> nutrition facts 영양성분"
pub fn search_link(brand: &str, product: &str) -> String {
    let query = format!("{} {} nutrition facts 영양성분", brand, product);
    format!("{}{}", SEARCH_URL, urlencoding::encode(&query))
}

pub fn brand_cards(brands: &[BrandItem], language: Language) -> Vec<BrandCard> {
    brands
        .iter()
        .map(|brand| BrandCard::from_brand(brand, language))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutritionInfo;

    #[test]
    fn test_search_link_encoding() {
        assert_eq!(
            search_link("A&B", "C"),
            "https://www.google.com/search?q=A%26B%20C%20nutrition%20facts%20%EC%98%81%EC%96%91%EC%84%B1%EB%B6%84"
        );
    }

    #[test]
    fn test_card_nutrition_text() {
        let mut brand = BrandItem {
            brand_name: Some("A".into()),
            product_name: Some("B".into()),
            ..Default::default()
        };
        assert_eq!(BrandCard::from_brand(&brand, Language::Ko).nutrition_text, "정보 없음");
        assert_eq!(BrandCard::from_brand(&brand, Language::En).nutrition_text, "No info");

        brand.nutrition_info = serde_json::from_str(r#"{"sugar": "2g", "sodium": "10mg"}"#).ok();
        let card = BrandCard::from_brand(&brand, Language::Ko);
        assert_eq!(card.name, "[A] B");
        assert_eq!(card.nutrition_text, "sugar: 2g, sodium: 10mg");

        // Text is shown as the model sent it
        brand.nutrition_info = Some(NutritionInfo::Text("  ".into()));
        assert_eq!(BrandCard::from_brand(&brand, Language::Ko).nutrition_text, "  ");
    }
}
