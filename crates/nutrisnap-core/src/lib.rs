//! NutriSnap Core Library
//!
//! Shared functionality for the NutriSnap food photo nutrition tool:
//! - Lenient decoding of model payloads into food and brand records
//! - Brand reconciliation into the food list
//! - Editable nutrition table (per-unit calorie rate, metric toggle, totals)
//! - Session state with simulated fallback and per-row recalculation
//! - Generation backends (proxy, direct upstream, mock)
//! - Prompt library for customizable prompts

pub mod ai;
pub mod brand_view;
pub mod error;
pub mod fallback;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod reconcile;
pub mod session;
pub mod table;

/// Test utilities including a mock generation API server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, GeminiBackend, GenerateContentRequest, MockBackend, ProxyBackend,
    RecalcStyle,
};
pub use brand_view::BrandCard;
pub use error::{Error, Result};
pub use models::{
    AnalysisResult, BrandItem, FoodItem, ImageBlob, Language, Metric, Nutrition, NutritionInfo,
    Recalculation, Weight,
};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use session::{
    spawn_analysis, spawn_recalculation, AnalysisTicket, AnalyzeOutcome, RecalcTicket, Session,
};
pub use table::{DisplayRow, MetricCursor, NutritionTable, RowId, RowView, TableView};
