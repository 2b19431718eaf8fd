// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the pagediff comparison engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::{MAX_SENSITIVITY, hex_to_rgb};
use crate::error::{PageDiffError, Result};

/// A visual page counts as changed only above this percentage of differing
/// pixels.
pub const CHANGE_THRESHOLD_PERCENT: f64 = 0.1;

/// Unique identifier for a comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonId(pub Uuid);

impl ComparisonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComparisonId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComparisonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How two pages are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Pixel differencing of rendered pages.
    Visual,
    /// Token-set differencing of extracted page text.
    Text,
    /// Visual comparison that also keeps the unmodified base layer.
    Overlay,
}

impl ComparisonMode {
    /// Whether this mode renders pages and runs the raster differencer.
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Visual | Self::Overlay)
    }
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Visual => "visual",
            Self::Text => "text",
            Self::Overlay => "overlay",
        };
        f.write_str(label)
    }
}

/// How the raster differencer treats pages whose bitmaps differ in size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Compare only the shared top-left rectangle; margins outside it are
    /// ignored.
    #[default]
    Intersection,
    /// Compare the whole canvas; a pixel present in only one bitmap counts as
    /// differing.
    PadAsDifferent,
}

/// Caller-supplied comparison settings. Read-only for the duration of a run.
///
/// The highlight flags and colours only affect report rendering, never what
/// is detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    pub mode: ComparisonMode,
    pub highlight_additions: bool,
    pub highlight_deletions: bool,
    pub highlight_modifications: bool,
    /// Hex colour (`#rrggbb`) for pages that only exist in the second document.
    pub color_additions: String,
    /// Hex colour for pages that only exist in the first document.
    pub color_deletions: String,
    /// Hex colour for pages present in both documents that differ.
    pub color_modifications: String,
    /// 0–100; higher means smaller pixel differences are detected.
    pub sensitivity: u8,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Visual,
            highlight_additions: true,
            highlight_deletions: true,
            highlight_modifications: true,
            color_additions: "#22c55e".into(),
            color_deletions: "#ef4444".into(),
            color_modifications: "#f59e0b".into(),
            sensitivity: 80,
        }
    }
}

impl ComparisonSettings {
    /// Settings for the given mode with every other field at its default.
    pub fn with_mode(mode: ComparisonMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reject out-of-range sensitivity and malformed colours.
    pub fn validate(&self) -> Result<()> {
        if self.sensitivity > MAX_SENSITIVITY {
            return Err(PageDiffError::InvalidSettings(format!(
                "sensitivity must be 0-{}, got {}",
                MAX_SENSITIVITY, self.sensitivity
            )));
        }
        for colour in [
            &self.color_additions,
            &self.color_deletions,
            &self.color_modifications,
        ] {
            hex_to_rgb(colour)?;
        }
        Ok(())
    }
}

/// Standard paper sizes for the summary report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// Word-level counts produced by the text differencer.
///
/// `modifications` is only a balancing of add/delete tallies, not a pairing of
/// changed words; treat it as a display approximation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDelta {
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
}

impl TextDelta {
    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.deletions == 0 && self.modifications == 0
    }
}

/// Reference to a stored diff overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayHandle {
    /// SHA-256 hex digest of the PNG-encoded overlay.
    pub key: String,
    pub width: u32,
    pub height: u32,
    /// File location, when the store persists to disk.
    pub location: Option<PathBuf>,
    /// Key of the untouched first-document render (overlay mode only).
    pub base_key: Option<String>,
}

/// How a page's result was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageStatus {
    /// Both documents have the page and it was compared.
    Compared,
    /// Only the second document has this page.
    OnlyInSecond,
    /// Only the first document has this page.
    OnlyInFirst,
    /// Rendering or extraction failed; flagged as changed.
    Unreadable { reason: String },
}

/// Result for one page index. Built once through one of the constructors and
/// never mutated; `has_changes` is always derived from the other fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDifference {
    page_number: usize,
    status: PageStatus,
    has_changes: bool,
    change_percentage: f64,
    additions: usize,
    deletions: usize,
    modifications: usize,
    diff_image: Option<OverlayHandle>,
}

impl PageDifference {
    /// A page compared in visual or overlay mode.
    pub fn visual(
        page_number: usize,
        change_percentage: f64,
        diff_image: Option<OverlayHandle>,
    ) -> Self {
        Self {
            page_number,
            status: PageStatus::Compared,
            has_changes: change_percentage > CHANGE_THRESHOLD_PERCENT,
            change_percentage,
            additions: 0,
            deletions: 0,
            modifications: 0,
            diff_image,
        }
    }

    /// A page compared in text mode.
    pub fn text(page_number: usize, delta: TextDelta) -> Self {
        Self {
            page_number,
            status: PageStatus::Compared,
            has_changes: !delta.is_empty(),
            change_percentage: 0.0,
            additions: delta.additions,
            deletions: delta.deletions,
            modifications: delta.modifications,
            diff_image: None,
        }
    }

    /// A page that exists only in the second document.
    pub fn only_in_second(page_number: usize) -> Self {
        Self {
            page_number,
            status: PageStatus::OnlyInSecond,
            has_changes: true,
            change_percentage: 100.0,
            additions: 1,
            deletions: 0,
            modifications: 0,
            diff_image: None,
        }
    }

    /// A page that exists only in the first document.
    pub fn only_in_first(page_number: usize) -> Self {
        Self {
            page_number,
            status: PageStatus::OnlyInFirst,
            has_changes: true,
            change_percentage: 100.0,
            additions: 0,
            deletions: 1,
            modifications: 0,
            diff_image: None,
        }
    }

    /// A page whose render or text extraction failed.
    pub fn unreadable(page_number: usize, reason: impl Into<String>) -> Self {
        Self {
            page_number,
            status: PageStatus::Unreadable {
                reason: reason.into(),
            },
            has_changes: true,
            change_percentage: 0.0,
            additions: 0,
            deletions: 0,
            modifications: 0,
            diff_image: None,
        }
    }

    /// 1-based page index.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn status(&self) -> &PageStatus {
        &self.status
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn change_percentage(&self) -> f64 {
        self.change_percentage
    }

    pub fn additions(&self) -> usize {
        self.additions
    }

    pub fn deletions(&self) -> usize {
        self.deletions
    }

    pub fn modifications(&self) -> usize {
        self.modifications
    }

    pub fn diff_image(&self) -> Option<&OverlayHandle> {
        self.diff_image.as_ref()
    }
}

/// Aggregate counts over a run's page differences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// `max(page_count_a, page_count_b)`.
    pub total_pages: usize,
    pub pages_with_changes: usize,
    pub total_additions: usize,
    pub total_deletions: usize,
}

impl ComparisonSummary {
    /// An empty summary for a run over `total_pages` page indices.
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            ..Self::default()
        }
    }

    /// Fold one page result into the running totals.
    pub fn record(&mut self, difference: &PageDifference) {
        if difference.has_changes() {
            self.pages_with_changes += 1;
        }
        self.total_additions += difference.additions();
        self.total_deletions += difference.deletions();
    }

    /// Build a summary from a complete difference list.
    pub fn from_differences(
        page_count_a: usize,
        page_count_b: usize,
        differences: &[PageDifference],
    ) -> Self {
        let mut summary = Self::new(page_count_a.max(page_count_b));
        for difference in differences {
            summary.record(difference);
        }
        summary
    }
}

/// Everything produced by one comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub id: ComparisonId,
    pub mode: ComparisonMode,
    pub started_at: DateTime<Utc>,
    pub page_count_a: usize,
    pub page_count_b: usize,
    /// One entry per page index, in ascending page order.
    pub differences: Vec<PageDifference>,
    pub summary: ComparisonSummary,
}
