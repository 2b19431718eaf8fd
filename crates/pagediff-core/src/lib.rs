// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagediff: core types, error definitions, and collaborator traits shared
// across all crates.

pub mod color;
pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::CompareConfig;
pub use error::{ErrorScope, PageDiffError, Result};
pub use source::{PageRenderer, PagedDocument, TextExtractor};
pub use types::*;
