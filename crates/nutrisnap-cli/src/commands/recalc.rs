//! Name-based calorie lookup command

use anyhow::{Context, Result};

use nutrisnap_core::session::lookup;
use nutrisnap_core::{AIBackend, Language, Metric, Session};

use super::open_backend;

pub async fn cmd_recalc(name: &str, weight: f64, language: Language) -> Result<()> {
    let backend = open_backend()?;
    println!("🔎 Looking up \"{}\" with {}...", name.trim(), backend.model());

    let (calories, display_name) = estimate(&backend, name, weight, language).await?;

    println!(
        "{}: {} kcal for {}g",
        display_name,
        calories,
        weight.max(0.0)
    );
    Ok(())
}

/// Estimate calories for `weight` grams of `name` through a one-row table
///
/// Returns the displayed calories and the row name after the lookup, which
/// is the canonical name in `language` when the model supplied one.
pub async fn estimate<B>(
    backend: &B,
    name: &str,
    weight: f64,
    language: Language,
) -> Result<(u32, String)>
where
    B: AIBackend + ?Sized,
{
    let mut session = Session::new(language);
    session.set_metric(Metric::Calories);
    let id = session.add_manual_row();
    session.set_weight(id, weight)?;

    let ticket = session
        .begin_recalculation(id, name)
        .context("Food name must not be empty")?;
    let recalculation = lookup(backend, &ticket, session.recalc_timeout())
        .await
        .with_context(|| format!("Calorie lookup for \"{}\" failed", ticket.name))?;
    session.finish_recalculation(ticket, Ok(recalculation));

    let view = session.view();
    let row = view
        .rows
        .into_iter()
        .next()
        .context("Lookup row disappeared")?;
    Ok((row.value, row.name))
}
