// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colour and sensitivity helpers: pure numeric conversions with no I/O.

use crate::error::{PageDiffError, Result};

/// Highlight painted over differing pixels in a diff overlay: opaque red at
/// roughly 70% alpha.
pub const HIGHLIGHT_RGBA: [u8; 4] = [255, 0, 0, 179];

/// Largest accepted sensitivity value.
pub const MAX_SENSITIVITY: u8 = 100;

/// Map a 0–100 sensitivity to the per-pixel threshold used by the raster
/// differencer.
///
/// The threshold is compared against the sum of absolute RGB channel
/// differences. Higher sensitivity yields a lower threshold, so smaller colour
/// changes count as differences. Values above 100 are clamped.
pub fn sensitivity_to_threshold(sensitivity: u8) -> f64 {
    let sensitivity = sensitivity.min(MAX_SENSITIVITY);
    f64::from(MAX_SENSITIVITY - sensitivity) * 2.55
}

/// Parse a `#rrggbb` or `#rgb` hex colour into normalised `[r, g, b]`
/// components in `0.0..=1.0`. The leading `#` is optional.
pub fn hex_to_rgb(hex: &str) -> Result<[f32; 3]> {
    let digits = hex.trim().trim_start_matches('#');

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => {
            return Err(PageDiffError::InvalidSettings(format!(
                "colour {:?} is not a 3- or 6-digit hex value",
                hex
            )));
        }
    };

    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PageDiffError::InvalidSettings(format!(
            "colour {:?} has a non-hex digit",
            hex
        )));
    }

    let mut rgb = [0.0f32; 3];
    for (index, channel) in rgb.iter_mut().enumerate() {
        let pair = &expanded[index * 2..index * 2 + 2];
        let value = u8::from_str_radix(pair, 16).map_err(|_| {
            PageDiffError::InvalidSettings(format!("colour {:?} has a non-hex digit", hex))
        })?;
        *channel = f32::from(value) / 255.0;
    }

    Ok(rgb)
}
