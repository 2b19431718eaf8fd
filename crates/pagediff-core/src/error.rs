// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pagediff.

use thiserror::Error;

/// Top-level error type for all pagediff operations.
#[derive(Debug, Error)]
pub enum PageDiffError {
    // -- Document-level (fatal) --
    #[error("failed to load document {name}: {reason}")]
    DocumentLoad { name: String, reason: String },

    // -- Page-level (absorbed by the orchestrator) --
    #[error("failed to render page {page}: {reason}")]
    PageRender { page: usize, reason: String },

    #[error("failed to extract text from page {page}: {reason}")]
    PageExtraction { page: usize, reason: String },

    // -- Report synthesis --
    #[error("report generation failed: {0}")]
    ReportGeneration(String),

    // -- Run control --
    #[error("invalid comparison settings: {0}")]
    InvalidSettings(String),

    #[error("comparison cancelled after {completed} of {total} pages")]
    Cancelled { completed: usize, total: usize },

    #[error("overlay storage failed: {0}")]
    OverlayStore(String),

    // -- Collaborators --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where an error stops the work it occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// A whole input document is unusable; no comparison is possible.
    Document,
    /// A single page could not be rendered or read; the run continues.
    Page,
    /// Only the report call fails; computed differences remain valid.
    Report,
    /// The run itself was stopped or misconfigured.
    Run,
}

impl PageDiffError {
    /// Classify this error for propagation decisions.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::DocumentLoad { .. } => ErrorScope::Document,
            Self::PageRender { .. }
            | Self::PageExtraction { .. }
            | Self::ImageError(_)
            | Self::OverlayStore(_) => ErrorScope::Page,
            Self::ReportGeneration(_) => ErrorScope::Report,
            Self::InvalidSettings(_)
            | Self::Unsupported(_)
            | Self::Cancelled { .. }
            | Self::Io(_)
            | Self::Serialization(_) => ErrorScope::Run,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PageDiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_failures_are_page_scoped() {
        let render = PageDiffError::PageRender {
            page: 2,
            reason: "boom".into(),
        };
        let extract = PageDiffError::PageExtraction {
            page: 2,
            reason: "boom".into(),
        };
        assert_eq!(render.scope(), ErrorScope::Page);
        assert_eq!(extract.scope(), ErrorScope::Page);
    }

    #[test]
    fn load_and_report_failures_keep_their_scope() {
        let load = PageDiffError::DocumentLoad {
            name: "a.pdf".into(),
            reason: "truncated".into(),
        };
        assert_eq!(load.scope(), ErrorScope::Document);
        assert_eq!(
            PageDiffError::ReportGeneration("bad colour".into()).scope(),
            ErrorScope::Report
        );
    }

    #[test]
    fn unsupported_mode_stops_the_run() {
        let err = PageDiffError::Unsupported("visual comparison of a.pdf".into());
        assert_eq!(err.scope(), ErrorScope::Run);
    }

    #[test]
    fn cancelled_message_names_progress() {
        let err = PageDiffError::Cancelled {
            completed: 3,
            total: 10,
        };
        assert_eq!(err.to_string(), "comparison cancelled after 3 of 10 pages");
    }
}
