//! Simulated results shown when photo analysis fails

use std::time::Duration;

use crate::models::{FoodItem, Nutrition};

/// Pause before the simulated dataset is shown
pub const FALLBACK_DELAY: Duration = Duration::from_millis(1500);

fn simulated_item(ko: &str, en: &str, weight: &str, nutrition: Nutrition) -> FoodItem {
    FoodItem {
        name_ko: Some(ko.to_string()),
        name_en: Some(en.to_string()),
        ..FoodItem::new(ko, weight, nutrition)
    }
}

/// The fixed two-item demo dataset
pub fn simulated_foods() -> Vec<FoodItem> {
    vec![
        simulated_item(
            "닭가슴살 샐러드",
            "Chicken Breast Salad",
            "200g",
            Nutrition {
                calories: 250,
                carbs: 10,
                protein: 35,
                fat: 8,
            },
        ),
        simulated_item(
            "고구마",
            "Sweet Potato",
            "150g",
            Nutrition {
                calories: 130,
                carbs: 32,
                protein: 2,
                fat: 0,
            },
        ),
    ]
}
