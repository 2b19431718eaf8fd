// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagediff-compare: the comparison engine.
//
// Provides pixel-level raster differencing with a tunable sensitivity, a
// token-set text differencing heuristic, diff overlay storage, and the
// orchestrator that walks both documents page by page.

pub mod cancel;
pub mod orchestrator;
pub mod overlay;
pub mod raster;
pub mod text;

pub use cancel::CancelToken;
pub use orchestrator::{Comparator, compare};
pub use overlay::{DirectoryOverlayStore, MemoryOverlayStore, OverlayStore};
pub use raster::{RasterDiff, compare_raster, compare_raster_with_policy};
pub use text::compare_text;
