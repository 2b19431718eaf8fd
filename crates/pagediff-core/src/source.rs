// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator traits consumed by the comparison orchestrator.
//
// Rendering and text extraction live outside the engine. Implementations
// address pages by 1-based index and must return an error (never panic) for
// out-of-range pages.

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::Result;

/// Renders a page to an RGBA bitmap.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render page `page_number` (1-based) at `scale` times its native size.
    async fn render_page(&self, page_number: usize, scale: f32) -> Result<RgbaImage>;
}

/// Extracts the plain text of a page.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Text content of page `page_number` (1-based).
    async fn extract_page_text(&self, page_number: usize) -> Result<String>;
}

/// A paginated document that can be rendered and read page by page.
#[async_trait]
pub trait PagedDocument: PageRenderer + TextExtractor {
    /// Display name used in logs and reports.
    fn name(&self) -> &str;

    /// Number of pages. Failure here is fatal for a comparison.
    async fn page_count(&self) -> Result<usize>;

    /// Whether `render_page` is available for this document at all. A
    /// document that cannot be rasterised is refused for visual and overlay
    /// comparison instead of having every page flagged.
    fn can_render(&self) -> bool {
        true
    }
}
