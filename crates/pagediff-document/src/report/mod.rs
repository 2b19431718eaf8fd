// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report module: human-readable comparison summaries as PDF.

pub mod writer;

pub use writer::{ReportDocument, ReportSynthesizer, describe_page, synthesize_report};
