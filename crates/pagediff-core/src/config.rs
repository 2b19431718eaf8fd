// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Comparison configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PageDiffError, Result};
use crate::types::{ComparisonSettings, OverlapPolicy, PaperSize};

/// Scale at which pages are rendered for raster comparison.
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;

/// Full configuration for a comparison run, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Detection and report settings.
    pub settings: ComparisonSettings,
    /// Render scale passed to the page renderer in visual/overlay mode.
    pub render_scale: f32,
    /// Treatment of pages whose bitmaps differ in size.
    pub overlap: OverlapPolicy,
    /// Persist diff overlays here instead of keeping them in memory.
    pub overlay_dir: Option<PathBuf>,
    /// Paper size of the summary report.
    pub report_paper_size: PaperSize,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            settings: ComparisonSettings::default(),
            render_scale: DEFAULT_RENDER_SCALE,
            overlap: OverlapPolicy::default(),
            overlay_dir: None,
            report_paper_size: PaperSize::A4,
            log_filter: None,
        }
    }
}

impl CompareConfig {
    /// Parse a configuration from a JSON string. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Validate settings and render scale.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        validate_render_scale(self.render_scale)
    }
}

/// A render scale must be finite and strictly positive.
pub fn validate_render_scale(scale: f32) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PageDiffError::InvalidSettings(format!(
            "render scale must be a positive number, got {}",
            scale
        )));
    }
    Ok(())
}
