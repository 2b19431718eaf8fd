// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagediff-document: document collaborators and report output.
//
// Provides a PDF text source (lopdf), a page-image document that renders
// bitmaps at a requested scale, a path-based opener that picks between them,
// and the PDF summary report written with printpdf.

pub mod image;
pub mod open;
pub mod pdf;
pub mod report;

// Re-export the primary structs so callers can use `pagediff_document::PdfDocument` etc.
pub use image::pages::ImageDocument;
pub use open::open_document;
pub use pdf::reader::PdfDocument;
pub use report::writer::{ReportDocument, ReportSynthesizer, describe_page, synthesize_report};
