//! Integration tests for nutrisnap-core
//!
//! These tests exercise the photo → table → edit workflow through the public
//! session API with the mock backend.

use std::time::Duration;

use nutrisnap_core::{
    normalize::normalize_analysis, AnalysisResult, AnalyzeOutcome, BrandItem, FoodItem,
    ImageBlob, Language, Metric, MockBackend, Nutrition, Session,
};
use serde_json::json;

fn photo() -> ImageBlob {
    ImageBlob::from_bytes("image/png", b"\x89PNG\r\n")
}

fn session_with_photo() -> Session {
    let mut session = Session::new(Language::En).with_fallback_delay(Duration::ZERO);
    session.add_image(photo()).expect("png is an image");
    session
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_single_item_toggle_workflow() {
    let backend = MockBackend::new().with_analysis(AnalysisResult {
        foods: vec![FoodItem::new(
            "Rice",
            "150g",
            Nutrition {
                calories: 200,
                carbs: 45,
                protein: 4,
                fat: 1,
            },
        )],
        brands: vec![],
    });

    let mut session = session_with_photo();
    let outcome = session.analyze(&backend).await;
    assert_eq!(outcome, AnalyzeOutcome::Analyzed { rows: 1, brands: 0 });

    let view = session.view();
    assert_eq!(view.total, 200);
    assert_eq!(view.unit, "kcal");

    assert_eq!(session.toggle_metric(), Metric::Carbs);
    let view = session.view();
    assert_eq!(view.total, 45);
    assert_eq!(view.unit, "g");
    assert_eq!(view.total_label, "Total Carbs");
}

#[tokio::test]
async fn test_brand_only_analysis() {
    let backend = MockBackend::new().with_analysis(AnalysisResult {
        foods: vec![],
        brands: vec![BrandItem {
            brand_name: Some("A".into()),
            product_name: Some("B".into()),
            calories: 150,
            weight: Some("100g".into()),
            ..Default::default()
        }],
    });

    let mut session = session_with_photo();
    session.analyze(&backend).await;

    let view = session.view();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].name, "[A] B");
    assert_eq!(view.rows[0].value, 150);

    let cards = session.brand_cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].nutrition_text, "No info");
    assert!(cards[0].search_link.starts_with("https://www.google.com/search?q=A%20B%20"));
}

#[tokio::test]
async fn test_untrusted_payload_workflow() {
    let payload = json!({
        "foods": [
            {"name": "김밥", "weight": "250", "calories": "420kcal", "carbs": "60g"},
            {"name": "Water"},
            42
        ],
        "brands": "none"
    });

    let mut session = Session::default();
    session.load_analysis(normalize_analysis(&payload));

    let rows = session.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].unit, "g");
    assert_eq!(rows[0].snapshot.calories, 420);
    assert_eq!(rows[1].live_weight, 0.0);
    assert_eq!(session.view().total, 420);
}

#[tokio::test]
async fn test_rejected_analysis_falls_back_after_delay() {
    let mut session = Session::new(Language::Ko).with_fallback_delay(Duration::from_millis(50));
    session.add_image(photo()).unwrap();

    let started = std::time::Instant::now();
    let outcome = session.analyze(&MockBackend::failing()).await;
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(matches!(outcome, AnalyzeOutcome::Simulated { .. }));

    let names: Vec<_> = session.view().rows.into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["닭가슴살 샐러드", "고구마"]);
    assert_eq!(session.view().total, 380);
    assert!(session.notice().is_some_and(|n| n.contains("시뮬레이션")));
}

// =============================================================================
// Editing
// =============================================================================

#[tokio::test]
async fn test_weight_edit_then_rename() {
    let backend = MockBackend::new().with_analysis(AnalysisResult {
        foods: vec![FoodItem::new(
            "Salad",
            "200g",
            Nutrition {
                calories: 250,
                carbs: 10,
                protein: 35,
                fat: 8,
            },
        )],
        brands: vec![],
    });

    let mut session = session_with_photo();
    session.analyze(&backend).await;
    let id = session.rows()[0].id;

    session.set_weight(id, 100.0).unwrap();
    assert_eq!(session.view().rows[0].value, 125);

    assert!(session.recalculate(&backend, id, "Chicken salad").await);
    let row = &session.rows()[0];
    assert_eq!(row.rate_per_unit, 1.65);
    assert_eq!(session.view().rows[0].value, 165);
    assert_eq!(session.view().rows[0].name, "Chicken Breast");
}

#[tokio::test]
async fn test_manual_rows_and_reset() {
    let mut session = Session::default();
    let first = session.add_manual_row();
    let second = session.add_manual_row();
    assert_ne!(first, second);

    assert!(session.remove_row(first));
    assert!(!session.remove_row(first));
    assert_eq!(session.rows().len(), 1);

    session.reset();
    assert!(session.rows().is_empty());
}
