//! Photo analysis command implementation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;

use nutrisnap_core::{
    AIBackend, AnalyzeOutcome, BrandCard, ImageBlob, Language, Metric, RowId, Session, TableView,
};

use super::{open_backend, truncate};

/// Edits applied to the table after analysis
#[derive(Debug, Default)]
pub struct TableEdits {
    pub metric: Option<Metric>,
    pub add_rows: usize,
    /// (1-based row, weight)
    pub weights: Vec<(usize, f64)>,
    /// (1-based row, typed name)
    pub renames: Vec<(usize, String)>,
}

pub async fn cmd_analyze(
    images: &[PathBuf],
    language: Language,
    edits: &TableEdits,
    json: bool,
) -> Result<()> {
    let backend = open_backend()?;
    let mut session = Session::new(language);

    for path in images {
        session.add_image(load_image(path)?)?;
    }

    if !json && !images.is_empty() {
        println!(
            "📷 Analyzing {} photo(s) with {} ({})...",
            images.len(),
            backend.model(),
            backend.host()
        );
    }

    let outcome = session.analyze(&backend).await;
    apply_edits(&mut session, &backend, edits).await?;

    let view = session.view();
    let cards = session.brand_cards();

    if json {
        let output = serde_json::json!({
            "outcome": outcome,
            "language": session.language(),
            "notice": session.notice(),
            "table": view,
            "brands": cards,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &outcome {
        AnalyzeOutcome::Skipped if session.rows().is_empty() => {
            println!("No photos given. Use --image PATH (repeatable) or --add-row.");
            return Ok(());
        }
        AnalyzeOutcome::Skipped => {}
        AnalyzeOutcome::Analyzed { rows, brands } => {
            println!("✅ Found {} item(s), {} branded product(s)", rows, brands);
        }
        AnalyzeOutcome::Simulated { reason } => {
            println!("⚠️  Analysis failed: {}", reason);
        }
    }

    if let Some(notice) = session.notice() {
        println!();
        println!("{}", notice);
    }

    print_table(&view);
    print_brand_cards(&cards);

    Ok(())
}

/// Read a photo from disk, tagging it with the MIME type of its extension
pub fn load_image(path: &Path) -> Result<ImageBlob> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        bail!(
            "{} does not look like an image ({})",
            path.display(),
            mime.essence_str()
        );
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImageBlob::from_bytes(mime.essence_str(), &bytes))
}

/// Apply metric choice, added rows, weight edits and renames in that order
///
/// A rename whose lookup fails leaves the row's rate as it was.
pub async fn apply_edits<B>(session: &mut Session, backend: &B, edits: &TableEdits) -> Result<()>
where
    B: AIBackend + ?Sized,
{
    if let Some(metric) = edits.metric {
        session.set_metric(metric);
    }

    for _ in 0..edits.add_rows {
        session.add_manual_row();
    }

    for &(row, weight) in &edits.weights {
        let id = row_id(session, row)?;
        session.set_weight(id, weight)?;
    }

    for (row, name) in &edits.renames {
        let id = row_id(session, *row)?;
        if !session.recalculate(backend, id, name).await {
            warn!(row, name = %name, "Could not re-estimate calories, keeping previous rate");
        }
    }

    Ok(())
}

fn row_id(session: &Session, row: usize) -> Result<RowId> {
    session
        .table()
        .id_at(row)
        .with_context(|| format!("No row {} (table has {} rows)", row, session.rows().len()))
}

fn print_table(view: &TableView) {
    println!();
    println!("{} ({})", view.label, view.unit);
    println!("{:>3}  {:<30} {:>10} {:>10}", "#", "NAME", "WEIGHT", view.unit);
    println!("{}", "-".repeat(58));

    for (i, row) in view.rows.iter().enumerate() {
        let name = if row.name.trim().is_empty() {
            "(unnamed)".to_string()
        } else {
            truncate(&row.name, 30)
        };
        let weight = format!("{}{}", row.weight, row.weight_unit);
        println!("{:>3}  {:<30} {:>10} {:>10}", i + 1, name, weight, row.value);
    }

    println!("{}", "-".repeat(58));
    println!("{}: {} {}", view.total_label, view.total, view.unit);
}

fn print_brand_cards(cards: &[BrandCard]) {
    if cards.is_empty() {
        return;
    }

    println!();
    println!("🏷️  Branded products:");
    for card in cards {
        println!("  {}", card.name);
        println!("     {}", card.nutrition_text);
        println!("     🔎 {}", card.search_link);
    }
}
