//! Brand reconciliation
//!
//! Folds branded products into the food list as synthetic items named
//! `[brand] product`, unless an item with that exact name is already there.

use crate::models::{BrandItem, FoodItem, Language};

/// Weight used for brand items that report none
pub const DEFAULT_BRAND_WEIGHT: &str = "100g";

/// Merge brands into the food list
///
/// Foods keep their order; brand-derived items are appended in brand order.
/// A brand is skipped when any existing item (including one appended earlier
/// in this merge) has a name field exactly equal to its composite name.
pub fn merge_brands(
    foods: Vec<FoodItem>,
    brands: &[BrandItem],
    language: Language,
) -> Vec<FoodItem> {
    let mut merged = foods;

    for brand in brands {
        let composite = brand.composite_name(language);
        if merged.iter().any(|food| food.has_name(&composite)) {
            continue;
        }
        merged.push(food_from_brand(brand, composite));
    }

    merged
}

fn food_from_brand(brand: &BrandItem, composite: String) -> FoodItem {
    let (name_ko, name_en) = if brand.is_bilingual() {
        let ko = brand.composite_name(Language::Ko);
        let en = brand.composite_name(Language::En);
        (Some(ko), Some(en))
    } else {
        (None, None)
    };

    let weight = match brand.weight.as_deref() {
        Some(w) if !w.is_empty() => w.to_string(),
        _ => DEFAULT_BRAND_WEIGHT.to_string(),
    };

    FoodItem {
        name: Some(composite),
        name_ko,
        name_en,
        weight: Some(weight),
        calories: brand.calories,
        carbs: brand.carbs,
        protein: brand.protein,
        fat: brand.fat,
    }
}
