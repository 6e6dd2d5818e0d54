//! Editable nutrition table
//!
//! Each food item becomes a [`DisplayRow`] holding a nutrition snapshot, a
//! weight baseline, the live weight and a calories-per-unit rate.
//!
//! # Rate model
//!
//! - The rate is `calories / weight` at creation (0 when the weight is 0) and
//!   is only replaced by a successful name-based recalculation.
//! - A weight edit recomputes `calories = round(weight × rate)`, writes it into
//!   the snapshot and moves the baseline to the new weight.
//!
//! # Metric scaling
//!
//! Every metric, calories included, is displayed as
//! `round(snapshot[metric] / baseline × live_weight)`. Macros are not
//! rate-modeled; they are scaled from the snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{FoodItem, Language, Metric, Nutrition, Recalculation, Weight};

/// Stable row identity within a session (never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round half away from zero and saturate into `u32`
fn round_u32(value: f64) -> u32 {
    value.round() as u32
}

/// One row of the nutrition table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub id: RowId,
    pub name: String,
    pub name_ko: Option<String>,
    pub name_en: Option<String>,
    pub unit: String,
    /// Nutrition snapshot; calories track weight edits, macros do not
    pub snapshot: Nutrition,
    /// Weight the snapshot refers to
    pub baseline_weight: f64,
    /// Weight currently entered for the row
    pub live_weight: f64,
    /// Calories per unit of weight
    pub rate_per_unit: f64,
    /// A name-based recalculation is in flight
    pub pending: bool,
    /// Bumped by every lookup started for this row; older results are stale
    #[serde(skip)]
    pub lookup_generation: u64,
}

impl DisplayRow {
    pub fn from_item(id: RowId, item: &FoodItem) -> Self {
        let weight = Weight::parse(item.weight_or_default());
        let snapshot = item.nutrition();
        let rate_per_unit = if weight.magnitude > 0.0 {
            snapshot.calories as f64 / weight.magnitude
        } else {
            0.0
        };

        Self {
            id,
            name: item.name.clone().unwrap_or_default(),
            name_ko: item.name_ko.clone(),
            name_en: item.name_en.clone(),
            unit: weight.unit,
            snapshot,
            baseline_weight: weight.magnitude,
            live_weight: weight.magnitude,
            rate_per_unit,
            pending: false,
            lookup_generation: 0,
        }
    }

    pub fn display_name(&self, language: Language) -> &str {
        let (localized, other) = match language {
            Language::Ko => (&self.name_ko, &self.name_en),
            Language::En => (&self.name_en, &self.name_ko),
        };
        localized
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.name.as_str()).filter(|s| !s.is_empty()))
            .or_else(|| other.as_deref())
            .unwrap_or("")
    }

    /// Apply a weight edit: recompute calories from the rate
    ///
    /// The rate is left untouched. Negative weights are treated as 0.
    pub fn set_weight(&mut self, weight: f64) {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self.snapshot.calories = round_u32(weight * self.rate_per_unit);
        self.baseline_weight = weight;
        self.live_weight = weight;
    }

    /// Store a user-typed name; localized names are dropped until a lookup
    /// supplies canonical ones
    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        self.name_ko = None;
        self.name_en = None;
    }

    /// Apply a successful name-based lookup
    ///
    /// Replaces the rate, adopts canonical names when present and re-applies
    /// the current weight.
    pub fn apply_recalculation(&mut self, recalculation: &Recalculation) {
        self.rate_per_unit = recalculation.rate_per_unit().max(0.0);
        if let Some(ko) = recalculation.name_ko.as_ref().filter(|s| !s.is_empty()) {
            self.name_ko = Some(ko.clone());
        }
        if let Some(en) = recalculation.name_en.as_ref().filter(|s| !s.is_empty()) {
            self.name_en = Some(en.clone());
        }
        self.pending = false;
        self.set_weight(self.live_weight);
    }

    /// Value shown for `metric`, scaled from the snapshot by weight
    pub fn displayed_value(&self, metric: Metric) -> u32 {
        let value = self.snapshot.get(metric) as f64;
        let baseline = if self.baseline_weight > 0.0 {
            self.baseline_weight
        } else {
            1.0
        };
        round_u32(value / baseline * self.live_weight)
    }
}

/// Cursor over [`Metric::ALL`], wrapping modulo 4
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricCursor {
    index: usize,
}

impl MetricCursor {
    pub fn current(&self) -> Metric {
        Metric::ALL[self.index % Metric::ALL.len()]
    }

    /// Move to the next metric and return it
    pub fn advance(&mut self) -> Metric {
        self.index = (self.index + 1) % Metric::ALL.len();
        self.current()
    }

    pub fn set(&mut self, metric: Metric) {
        self.index = metric.index();
    }
}

/// Row as rendered for the active metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: RowId,
    pub name: String,
    pub weight: f64,
    pub weight_unit: String,
    pub value: u32,
    pub pending: bool,
}

/// Whole table rendered for the active metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub metric: Metric,
    pub label: String,
    pub unit: String,
    pub rows: Vec<RowView>,
    pub total: u64,
    pub total_label: String,
}

/// Render rows for a metric and sum the displayed values
pub fn render(rows: &[DisplayRow], metric: Metric, language: Language) -> TableView {
    let rows: Vec<RowView> = rows
        .iter()
        .map(|row| RowView {
            id: row.id,
            name: row.display_name(language).to_string(),
            weight: row.live_weight,
            weight_unit: row.unit.clone(),
            value: row.displayed_value(metric),
            pending: row.pending,
        })
        .collect();
    let total = rows.iter().map(|r| r.value as u64).sum();

    TableView {
        metric,
        label: metric.label(language).to_string(),
        unit: metric.unit().to_string(),
        rows,
        total,
        total_label: metric.total_label(language),
    }
}

/// Ordered collection of rows with id allocation
#[derive(Debug, Clone, Default)]
pub struct NutritionTable {
    rows: Vec<DisplayRow>,
    next_id: u64,
}

impl NutritionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row for `item`
    pub fn push(&mut self, item: &FoodItem) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(DisplayRow::from_item(id, item));
        id
    }

    /// Drop every row and load `items` in order
    ///
    /// Ids keep counting up so results for old rows can never land on new ones.
    pub fn replace(&mut self, items: &[FoodItem]) -> Vec<RowId> {
        self.rows.clear();
        items.iter().map(|item| self.push(item)).collect()
    }

    pub fn remove(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    pub fn get(&self, id: RowId) -> Option<&DisplayRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut DisplayRow> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    /// Row at a 1-based display position
    pub fn id_at(&self, position: usize) -> Option<RowId> {
        position
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(|row| row.id)
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn render(&self, metric: Metric, language: Language) -> TableView {
        render(&self.rows, metric, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, weight: &str, nutrition: [u32; 4]) -> FoodItem {
        FoodItem::new(
            name,
            weight,
            Nutrition {
                calories: nutrition[0],
                carbs: nutrition[1],
                protein: nutrition[2],
                fat: nutrition[3],
            },
        )
    }

    #[test]
    fn test_row_rate_from_creation() {
        let row = DisplayRow::from_item(RowId(0), &item("Salad", "200g", [250, 10, 35, 8]));
        assert_eq!(row.rate_per_unit, 1.25);
        assert_eq!(row.baseline_weight, 200.0);
        assert_eq!(row.unit, "g");
    }

    #[test]
    fn test_weight_change_uses_rate() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Salad", "200g", [250, 10, 35, 8]));
        row.set_weight(100.0);
        assert_eq!(row.snapshot.calories, 125);
        assert_eq!(row.displayed_value(Metric::Calories), 125);
        assert_eq!(row.rate_per_unit, 1.25);
    }

    #[test]
    fn test_weight_change_rounding_property() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Salad", "200g", [250, 0, 0, 0]));
        for (weight, expected) in [(0.0, 0), (1.0, 1), (99.5, 124), (1000.0, 1250)] {
            row.set_weight(weight);
            assert_eq!(row.snapshot.calories, expected, "weight {}", weight);
            assert_eq!(row.rate_per_unit, 1.25);
        }
    }

    #[test]
    fn test_zero_weight_gives_zero_rate() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Mystery", "0g", [300, 1, 1, 1]));
        assert_eq!(row.rate_per_unit, 0.0);
        row.set_weight(250.0);
        assert_eq!(row.snapshot.calories, 0);

        row.apply_recalculation(&Recalculation {
            calories_per_100: 200.0,
            ..Default::default()
        });
        assert_eq!(row.rate_per_unit, 2.0);
        assert_eq!(row.snapshot.calories, 500);
    }

    #[test]
    fn test_missing_weight_defaults() {
        let row = DisplayRow::from_item(
            RowId(0),
            &FoodItem {
                name: Some("Water".into()),
                ..Default::default()
            },
        );
        assert_eq!(row.live_weight, 0.0);
        assert_eq!(row.unit, "g");
        assert_eq!(row.displayed_value(Metric::Calories), 0);
    }

    #[test]
    fn test_scaling_identity_at_baseline() {
        let row = DisplayRow::from_item(RowId(0), &item("Rice", "150g", [200, 45, 4, 1]));
        for metric in Metric::ALL {
            assert_eq!(row.displayed_value(metric), row.snapshot.get(metric));
        }
    }

    #[test]
    fn test_scaling_when_live_weight_diverges() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Rice", "150g", [200, 45, 4, 1]));
        row.live_weight = 300.0;
        assert_eq!(row.displayed_value(Metric::Carbs), 90);
        assert_eq!(row.displayed_value(Metric::Calories), 400);
    }

    #[test]
    fn test_macros_keep_snapshot_after_weight_edit() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Rice", "150g", [200, 45, 4, 1]));
        row.set_weight(300.0);
        assert_eq!(row.displayed_value(Metric::Calories), 400);
        assert_eq!(row.displayed_value(Metric::Carbs), 45);
    }

    #[test]
    fn test_rename_and_recalculation_names() {
        let mut row = DisplayRow::from_item(RowId(0), &item("Rice", "100g", [130, 28, 3, 0]));
        row.rename("Brown rice");
        assert_eq!(row.display_name(Language::Ko), "Brown rice");

        row.apply_recalculation(&Recalculation {
            calories_per_100: 110.0,
            name_ko: Some("현미밥".into()),
            name_en: Some("Brown Rice".into()),
        });
        assert_eq!(row.display_name(Language::Ko), "현미밥");
        assert_eq!(row.display_name(Language::En), "Brown Rice");
        assert_eq!(row.snapshot.calories, 110);
    }

    #[test]
    fn test_metric_cursor_cycle() {
        let mut cursor = MetricCursor::default();
        assert_eq!(cursor.current(), Metric::Calories);
        assert_eq!(cursor.advance(), Metric::Carbs);
        assert_eq!(cursor.advance(), Metric::Protein);
        assert_eq!(cursor.advance(), Metric::Fat);
        assert_eq!(cursor.advance(), Metric::Calories);
    }

    #[test]
    fn test_render_total_and_labels() {
        let mut table = NutritionTable::new();
        table.push(&item("Rice", "150g", [200, 45, 4, 1]));
        table.push(&item("Egg", "50g", [70, 1, 6, 5]));

        let view = table.render(Metric::Calories, Language::Ko);
        assert_eq!(view.total, 270);
        assert_eq!(view.unit, "kcal");
        assert_eq!(view.total_label, "총 칼로리");

        let view = table.render(Metric::Protein, Language::En);
        assert_eq!(view.total, 10);
        assert_eq!(view.label, "Protein");
    }

    #[test]
    fn test_cycle_of_four_restores_view() {
        let mut table = NutritionTable::new();
        table.push(&item("Rice", "150g", [200, 45, 4, 1]));
        let mut cursor = MetricCursor::default();
        let before = table.render(cursor.current(), Language::Ko);
        for _ in 0..4 {
            cursor.advance();
        }
        assert_eq!(table.render(cursor.current(), Language::Ko), before);
    }

    #[test]
    fn test_table_ids_are_not_reused() {
        let mut table = NutritionTable::new();
        let first = table.replace(&[item("A", "1g", [1, 0, 0, 0])]);
        let second = table.replace(&[item("B", "1g", [1, 0, 0, 0])]);
        assert_ne!(first[0], second[0]);
        assert!(table.get(first[0]).is_none());
        assert_eq!(table.id_at(1), Some(second[0]));
        assert_eq!(table.id_at(0), None);
        assert!(table.remove(second[0]));
        assert!(table.is_empty());
    }
}
