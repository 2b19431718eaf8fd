// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Comparison orchestrator: walks both documents by page index, dispatches to
// the raster or text differencer, and aggregates the summary.
//
// Pages are processed strictly in order. Only a document that cannot report a
// page count aborts the run; a page that fails to render or extract is flagged
// as changed and the run continues.

use std::sync::Arc;

use chrono::Utc;
use image::RgbaImage;
use pagediff_core::config::{DEFAULT_RENDER_SCALE, validate_render_scale};
use pagediff_core::error::{PageDiffError, Result};
use pagediff_core::{
    CompareConfig, ComparisonId, ComparisonMode, ComparisonResult, ComparisonSettings,
    ComparisonSummary, OverlapPolicy, OverlayHandle, PageDifference, PagedDocument,
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::cancel::CancelToken;
use crate::overlay::{DirectoryOverlayStore, MemoryOverlayStore, OverlayStore};
use crate::raster::compare_raster_with_policy;
use crate::text::compare_text;

/// Compares two paginated documents page by page.
///
/// ```ignore
/// let comparator = Comparator::new(ComparisonSettings::default())?;
/// let result = comparator.compare(&first, &second, |pct| println!("{pct:.0}%")).await?;
/// println!("{} pages changed", result.summary.pages_with_changes);
/// ```
pub struct Comparator {
    settings: ComparisonSettings,
    render_scale: f32,
    overlap: OverlapPolicy,
    overlays: Arc<dyn OverlayStore>,
    cancel: CancelToken,
}

/// Page counts and totals of a finished run, before differences are attached.
struct RunOutcome {
    id: ComparisonId,
    started_at: chrono::DateTime<Utc>,
    page_count_a: usize,
    page_count_b: usize,
    summary: ComparisonSummary,
}

impl Comparator {
    // -- Construction ---------------------------------------------------------

    /// Create a comparator with in-memory overlay storage and the default
    /// render scale.
    pub fn new(settings: ComparisonSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            render_scale: DEFAULT_RENDER_SCALE,
            overlap: OverlapPolicy::default(),
            overlays: Arc::new(MemoryOverlayStore::new()),
            cancel: CancelToken::new(),
        })
    }

    /// Create a comparator from a loaded configuration. An `overlay_dir`
    /// selects on-disk overlay storage.
    pub fn from_config(config: &CompareConfig) -> Result<Self> {
        config.validate()?;
        let mut comparator = Self::new(config.settings.clone())?
            .with_render_scale(config.render_scale)?
            .with_overlap_policy(config.overlap);
        if let Some(dir) = &config.overlay_dir {
            comparator = comparator.with_overlay_store(Arc::new(DirectoryOverlayStore::new(dir)?));
        }
        Ok(comparator)
    }

    /// Render scale passed to the page renderer in visual/overlay mode.
    pub fn with_render_scale(mut self, scale: f32) -> Result<Self> {
        validate_render_scale(scale)?;
        self.render_scale = scale;
        Ok(self)
    }

    pub fn with_overlap_policy(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_overlay_store(mut self, store: Arc<dyn OverlayStore>) -> Self {
        self.overlays = store;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn settings(&self) -> &ComparisonSettings {
        &self.settings
    }

    /// A handle that cancels this comparator's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // -- Comparison -----------------------------------------------------------

    /// Compare every page index of `first` and `second`.
    ///
    /// `on_progress` receives a non-decreasing percentage after each page. The
    /// last value is not guaranteed to be exactly 100; the returned future's
    /// completion is the authoritative end of the run.
    pub async fn compare(
        &self,
        first: &dyn PagedDocument,
        second: &dyn PagedDocument,
        on_progress: impl FnMut(f64),
    ) -> Result<ComparisonResult> {
        let mut differences = Vec::new();
        let outcome = self
            .run(first, second, |difference| differences.push(difference), on_progress)
            .await?;

        Ok(ComparisonResult {
            id: outcome.id,
            mode: self.settings.mode,
            started_at: outcome.started_at,
            page_count_a: outcome.page_count_a,
            page_count_b: outcome.page_count_b,
            differences,
            summary: outcome.summary,
        })
    }

    /// Compare page by page, handing each result to `on_page` in ascending
    /// page order instead of collecting them. Returns only the summary.
    pub async fn compare_streaming(
        &self,
        first: &dyn PagedDocument,
        second: &dyn PagedDocument,
        on_page: impl FnMut(PageDifference),
        on_progress: impl FnMut(f64),
    ) -> Result<ComparisonSummary> {
        let outcome = self.run(first, second, on_page, on_progress).await?;
        Ok(outcome.summary)
    }

    async fn run(
        &self,
        first: &dyn PagedDocument,
        second: &dyn PagedDocument,
        mut on_page: impl FnMut(PageDifference),
        mut on_progress: impl FnMut(f64),
    ) -> Result<RunOutcome> {
        let id = ComparisonId::new();
        let span = info_span!(
            "compare",
            %id,
            first = first.name(),
            second = second.name(),
            mode = %self.settings.mode
        );

        async move {
            let started_at = Utc::now();

            if self.settings.mode.is_raster() {
                for document in [first, second] {
                    if !document.can_render() {
                        return Err(PageDiffError::Unsupported(format!(
                            "{} cannot be rendered for {} comparison; compare it in text mode",
                            document.name(),
                            self.settings.mode
                        )));
                    }
                }
            }

            let page_count_a = resolve_page_count(first).await?;
            let page_count_b = resolve_page_count(second).await?;
            let total = page_count_a.max(page_count_b);

            info!(page_count_a, page_count_b, "Starting comparison");

            let mut summary = ComparisonSummary::new(total);

            for page_number in 1..=total {
                if self.cancel.is_cancelled() {
                    info!(completed = page_number - 1, total, "Comparison cancelled");
                    return Err(PageDiffError::Cancelled {
                        completed: page_number - 1,
                        total,
                    });
                }

                let difference = if page_number > page_count_a {
                    debug!(page_number, "Page only in second document");
                    PageDifference::only_in_second(page_number)
                } else if page_number > page_count_b {
                    debug!(page_number, "Page only in first document");
                    PageDifference::only_in_first(page_number)
                } else {
                    match self.compare_page(first, second, page_number).await {
                        Ok(difference) => difference,
                        Err(err) => {
                            warn!(
                                page_number,
                                scope = ?err.scope(),
                                %err,
                                "Page comparison failed, flagging as changed"
                            );
                            PageDifference::unreadable(page_number, err.to_string())
                        }
                    }
                };

                summary.record(&difference);
                on_page(difference);
                on_progress(page_number as f64 / total as f64 * 100.0);
            }

            info!(
                pages_with_changes = summary.pages_with_changes,
                total_additions = summary.total_additions,
                total_deletions = summary.total_deletions,
                "Comparison complete"
            );

            Ok::<_, PageDiffError>(RunOutcome {
                id,
                started_at,
                page_count_a,
                page_count_b,
                summary,
            })
        }
        .instrument(span)
        .await
    }

    /// Compare one page present in both documents.
    async fn compare_page(
        &self,
        first: &dyn PagedDocument,
        second: &dyn PagedDocument,
        page_number: usize,
    ) -> Result<PageDifference> {
        match self.settings.mode {
            ComparisonMode::Visual | ComparisonMode::Overlay => {
                let bitmap_a = first.render_page(page_number, self.render_scale).await?;
                let bitmap_b = second.render_page(page_number, self.render_scale).await?;

                let sensitivity = self.settings.sensitivity;
                let overlap = self.overlap;
                let keep_base = self.settings.mode == ComparisonMode::Overlay;
                let store = Arc::clone(&self.overlays);

                // Pixel work and PNG encoding stay off the async worker.
                let (change_percentage, handle) = tokio::task::spawn_blocking(move || {
                    let diff = compare_raster_with_policy(&bitmap_a, &bitmap_b, sensitivity, overlap);
                    let base = keep_base.then_some(&bitmap_a);
                    let handle = store_overlay(store.as_ref(), page_number, &diff.overlay, base);
                    (diff.change_percentage, handle)
                })
                .await
                .map_err(|err| PageDiffError::ImageError(format!("raster task failed: {}", err)))?;

                debug!(page_number, change_percentage, "Visual page compared");
                Ok(PageDifference::visual(page_number, change_percentage, handle))
            }
            ComparisonMode::Text => {
                let text_a = first.extract_page_text(page_number).await?;
                let text_b = second.extract_page_text(page_number).await?;
                let delta = compare_text(&text_a, &text_b);

                debug!(
                    page_number,
                    additions = delta.additions,
                    deletions = delta.deletions,
                    modifications = delta.modifications,
                    "Text page compared"
                );
                Ok(PageDifference::text(page_number, delta))
            }
        }
    }
}

/// Store the overlay (and the base layer in overlay mode). A storage failure
/// drops the handle but never the page's metrics.
fn store_overlay(
    store: &dyn OverlayStore,
    page_number: usize,
    overlay: &RgbaImage,
    base: Option<&RgbaImage>,
) -> Option<OverlayHandle> {
    let stored = store.put(overlay).and_then(|mut handle| {
        if let Some(base) = base {
            handle.base_key = Some(store.put(base)?.key);
        }
        Ok(handle)
    });

    match stored {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(page_number, %err, "Overlay not stored");
            None
        }
    }
}

/// Any failure to count pages is a document load failure.
async fn resolve_page_count(document: &dyn PagedDocument) -> Result<usize> {
    document.page_count().await.map_err(|err| match err {
        PageDiffError::DocumentLoad { .. } => err,
        other => PageDiffError::DocumentLoad {
            name: document.name().to_string(),
            reason: other.to_string(),
        },
    })
}

/// Compare two documents with the given settings and default options.
pub async fn compare(
    first: &dyn PagedDocument,
    second: &dyn PagedDocument,
    settings: ComparisonSettings,
    on_progress: impl FnMut(f64),
) -> Result<ComparisonResult> {
    Comparator::new(settings)?
        .compare(first, second, on_progress)
        .await
}
