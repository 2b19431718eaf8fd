// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page counting, per-page text extraction, and (with the
// `render` feature) rasterisation.

pub mod reader;
#[cfg(feature = "render")]
mod render;

pub use reader::PdfDocument;
