//! Per-user session state
//!
//! A [`Session`] owns everything one user works with: language, metric
//! cursor, uploaded photos, table rows and the brands from the last analysis.
//!
//! Photo analysis and name-based recalculation are both split in two so a
//! shared session is never locked across a network call:
//!
//! ```rust,ignore
//! let ticket = session.lock().await.begin_recalculation(id, "현미밥");
//! // ... call the backend without the lock ...
//! session.lock().await.finish_recalculation(ticket, result);
//! ```
//!
//! [`spawn_analysis`] and [`spawn_recalculation`] do exactly that on a tokio
//! task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::AIBackend;
use crate::brand_view::{brand_cards, BrandCard};
use crate::error::{Error, Result};
use crate::fallback::{simulated_foods, FALLBACK_DELAY};
use crate::models::{
    AnalysisResult, BrandItem, FoodItem, ImageBlob, Language, Metric, Recalculation,
};
use crate::reconcile::merge_brands;
use crate::table::{DisplayRow, MetricCursor, NutritionTable, RowId, TableView};

/// Upper bound on one photo analysis before falling back
pub const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on one name lookup
pub const RECALC_TIMEOUT: Duration = Duration::from_secs(30);

/// How an analyze request ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalyzeOutcome {
    /// No photos were uploaded; nothing was sent
    Skipped,
    Analyzed { rows: usize, brands: usize },
    /// The request failed and the demo dataset is shown instead
    Simulated { reason: String },
}

/// An in-flight photo analysis
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub images: Vec<ImageBlob>,
    pub language: Language,
    timeout: Duration,
    fallback_delay: Duration,
}

/// Run the analysis for a ticket, bounded by the session's analyze timeout
///
/// On failure the fallback delay is waited out here, before the error is
/// returned, so callers never sleep while holding the session.
pub async fn run_analysis<B>(backend: &B, ticket: &AnalysisTicket) -> Result<AnalysisResult>
where
    B: AIBackend + ?Sized,
{
    info!(images = ticket.images.len(), model = %backend.model(), "Analyzing photos");
    let result = tokio::time::timeout(
        ticket.timeout,
        backend.analyze_images(&ticket.images, ticket.language),
    )
    .await
    .map_err(|_| Error::Timeout(ticket.timeout.as_secs()))
    .and_then(|r| r);

    if result.is_err() && !ticket.fallback_delay.is_zero() {
        tokio::time::sleep(ticket.fallback_delay).await;
    }
    result
}

/// An in-flight name lookup for one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcTicket {
    pub row: RowId,
    pub name: String,
    pub language: Language,
    /// Row lookup generation when this ticket was issued
    pub generation: u64,
}

/// Run the lookup for a ticket, bounded by `timeout`
pub async fn lookup<B>(
    backend: &B,
    ticket: &RecalcTicket,
    timeout: Duration,
) -> Result<Recalculation>
where
    B: AIBackend + ?Sized,
{
    tokio::time::timeout(timeout, backend.recalculate(&ticket.name, ticket.language))
        .await
        .map_err(|_| Error::Timeout(timeout.as_secs()))?
}

#[derive(Debug, Clone)]
pub struct Session {
    language: Language,
    cursor: MetricCursor,
    images: Vec<ImageBlob>,
    table: NutritionTable,
    brands: Vec<BrandItem>,
    simulated: bool,
    fallback_delay: Duration,
    analyze_timeout: Duration,
    recalc_timeout: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            language: Language::default(),
            cursor: MetricCursor::default(),
            images: Vec::new(),
            table: NutritionTable::new(),
            brands: Vec::new(),
            simulated: false,
            fallback_delay: FALLBACK_DELAY,
            analyze_timeout: ANALYZE_TIMEOUT,
            recalc_timeout: RECALC_TIMEOUT,
        }
    }
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    pub fn with_timeouts(mut self, analyze: Duration, recalc: Duration) -> Self {
        self.analyze_timeout = analyze;
        self.recalc_timeout = recalc;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn metric(&self) -> Metric {
        self.cursor.current()
    }

    /// Advance to the next metric
    pub fn toggle_metric(&mut self) -> Metric {
        self.cursor.advance()
    }

    pub fn set_metric(&mut self, metric: Metric) {
        self.cursor.set(metric);
    }

    /// Queue a photo for the next analysis; only `image/*` is accepted
    pub fn add_image(&mut self, image: ImageBlob) -> Result<()> {
        if !image.is_image() {
            return Err(Error::InvalidData(format!(
                "Not an image: {}",
                image.mime_type
            )));
        }
        self.images.push(image);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageBlob> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn images(&self) -> &[ImageBlob] {
        &self.images
    }

    /// Analyze the queued photos and load the results into the table
    ///
    /// Any failure (transport, upstream status, undecodable payload, timeout)
    /// loads the demo dataset after the fallback delay instead.
    pub async fn analyze<B>(&mut self, backend: &B) -> AnalyzeOutcome
    where
        B: AIBackend + ?Sized,
    {
        let Some(ticket) = self.begin_analysis() else {
            return AnalyzeOutcome::Skipped;
        };
        let result = run_analysis(backend, &ticket).await;
        self.finish_analysis(result)
    }

    /// Snapshot the queued photos for an analysis run
    ///
    /// Returns None when no photos are queued, in which case nothing should
    /// be sent.
    pub fn begin_analysis(&self) -> Option<AnalysisTicket> {
        if self.images.is_empty() {
            debug!("No images queued, skipping analysis");
            return None;
        }

        Some(AnalysisTicket {
            images: self.images.clone(),
            language: self.language,
            timeout: self.analyze_timeout,
            fallback_delay: self.fallback_delay,
        })
    }

    /// Load a finished analysis, or the demo dataset if it failed
    pub fn finish_analysis(&mut self, result: Result<AnalysisResult>) -> AnalyzeOutcome {
        match result {
            Ok(analysis) => self.load_analysis(analysis),
            Err(e) => {
                warn!(error = %e, "Analysis failed, showing simulated results");
                self.load_simulation();
                AnalyzeOutcome::Simulated {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Replace the table with an analysis result (brands merged in)
    pub fn load_analysis(&mut self, analysis: AnalysisResult) -> AnalyzeOutcome {
        let foods = merge_brands(analysis.foods, &analysis.brands, self.language);
        self.table.replace(&foods);
        self.brands = analysis.brands;
        self.simulated = false;

        info!(rows = self.table.len(), brands = self.brands.len(), "Analysis loaded");
        AnalyzeOutcome::Analyzed {
            rows: self.table.len(),
            brands: self.brands.len(),
        }
    }

    fn load_simulation(&mut self) {
        self.table.replace(&simulated_foods());
        self.brands.clear();
        self.simulated = true;
    }

    /// Notice shown while the demo dataset is loaded
    pub fn notice(&self) -> Option<&'static str> {
        self.simulated.then(|| self.language.simulated_notice())
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Append an empty row for manual entry
    pub fn add_manual_row(&mut self) -> RowId {
        self.table.push(&FoodItem::new("", "100g", Default::default()))
    }

    pub fn remove_row(&mut self, id: RowId) -> bool {
        self.table.remove(id)
    }

    pub fn set_weight(&mut self, id: RowId, weight: f64) -> Result<()> {
        let row = self
            .table
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
        row.set_weight(weight);
        Ok(())
    }

    pub fn rows(&self) -> &[DisplayRow] {
        self.table.rows()
    }

    pub fn table(&self) -> &NutritionTable {
        &self.table
    }

    /// Render the table for the active metric and language
    pub fn view(&self) -> TableView {
        self.table.render(self.metric(), self.language)
    }

    pub fn brands(&self) -> &[BrandItem] {
        &self.brands
    }

    pub fn brand_cards(&self) -> Vec<BrandCard> {
        brand_cards(&self.brands, self.language)
    }

    /// Start a name lookup for a row
    ///
    /// Stores the typed name and marks the row pending. Returns None for a
    /// blank name or an unknown row, in which case nothing should be sent.
    /// A newer lookup for the same row supersedes this one.
    pub fn begin_recalculation(&mut self, id: RowId, name: &str) -> Option<RecalcTicket> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        let row = self.table.get_mut(id)?;
        row.rename(name);
        row.pending = true;
        row.lookup_generation += 1;

        Some(RecalcTicket {
            row: id,
            name: trimmed.to_string(),
            language: self.language,
            generation: row.lookup_generation,
        })
    }

    /// Apply a finished lookup
    ///
    /// Returns true if the row was updated. Results for removed rows and
    /// superseded lookups are dropped; failures only clear the pending state.
    pub fn finish_recalculation(
        &mut self,
        ticket: RecalcTicket,
        result: Result<Recalculation>,
    ) -> bool {
        let Some(row) = self.table.get_mut(ticket.row) else {
            debug!(row = %ticket.row, "Row removed before lookup finished, discarding");
            return false;
        };
        if row.lookup_generation != ticket.generation {
            debug!(
                row = %ticket.row,
                name = %ticket.name,
                "Superseded lookup finished, discarding"
            );
            return false;
        }

        match result {
            Ok(recalculation) => {
                row.apply_recalculation(&recalculation);
                debug!(row = %ticket.row, rate = row.rate_per_unit, "Row recalculated");
                true
            }
            Err(e) => {
                warn!(
                    row = %ticket.row,
                    name = %ticket.name,
                    error = %e,
                    "Name-based re-estimation failed"
                );
                row.pending = false;
                false
            }
        }
    }

    /// Begin, look up and finish in one call on an owned session
    pub async fn recalculate<B>(&mut self, backend: &B, id: RowId, name: &str) -> bool
    where
        B: AIBackend + ?Sized,
    {
        let Some(ticket) = self.begin_recalculation(id, name) else {
            return false;
        };
        let result = lookup(backend, &ticket, self.recalc_timeout).await;
        self.finish_recalculation(ticket, result)
    }

    pub fn recalc_timeout(&self) -> Duration {
        self.recalc_timeout
    }

    /// Clear photos, rows, brands and the notice; language and metric stay
    pub fn reset(&mut self) {
        self.images.clear();
        self.table.clear();
        self.brands.clear();
        self.simulated = false;
    }
}

/// Run a photo analysis for a shared session on a tokio task
///
/// The session lock is taken to begin and to finish, never across the call
/// or the fallback delay. Returns None (and sends nothing) without photos.
pub async fn spawn_analysis<B>(
    session: Arc<Mutex<Session>>,
    backend: B,
) -> Option<JoinHandle<AnalyzeOutcome>>
where
    B: AIBackend + 'static,
{
    let ticket = session.lock().await.begin_analysis()?;

    Some(tokio::spawn(async move {
        let result = run_analysis(&backend, &ticket).await;
        session.lock().await.finish_analysis(result)
    }))
}

/// Run a name lookup for a row of a shared session on a tokio task
///
/// The session lock is taken to begin and to finish, never across the call.
/// Returns None (and sends nothing) for blank names or unknown rows.
pub async fn spawn_recalculation<B>(
    session: Arc<Mutex<Session>>,
    backend: B,
    id: RowId,
    name: &str,
) -> Option<JoinHandle<bool>>
where
    B: AIBackend + 'static,
{
    let (ticket, timeout) = {
        let mut guard = session.lock().await;
        let ticket = guard.begin_recalculation(id, name)?;
        (ticket, guard.recalc_timeout())
    };

    Some(tokio::spawn(async move {
        let result = lookup(&backend, &ticket, timeout).await;
        session.lock().await.finish_recalculation(ticket, result)
    }))
}
