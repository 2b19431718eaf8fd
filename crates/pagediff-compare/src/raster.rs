// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster differencer: per-pixel comparison of two rendered pages producing a
// change percentage and a highlighted overlay bitmap.

use image::{Rgba, RgbaImage};
use pagediff_core::OverlapPolicy;
use pagediff_core::color::{HIGHLIGHT_RGBA, sensitivity_to_threshold};
use tracing::debug;

/// Outcome of comparing two page bitmaps.
#[derive(Debug, Clone)]
pub struct RasterDiff {
    /// Differing pixels as a percentage (0–100) of compared pixels.
    pub change_percentage: f64,
    pub differing_pixels: u64,
    pub compared_pixels: u64,
    /// The first bitmap on a canvas large enough for both, with differing
    /// pixels painted in the highlight colour.
    pub overlay: RgbaImage,
}

/// Compare two bitmaps over their shared top-left region.
///
/// Pixels outside `min(width) x min(height)` are not compared, so pages of
/// different physical size under-report changes in the margin.
pub fn compare_raster(first: &RgbaImage, second: &RgbaImage, sensitivity: u8) -> RasterDiff {
    compare_raster_with_policy(first, second, sensitivity, OverlapPolicy::Intersection)
}

/// Compare two bitmaps using an explicit overlap policy.
///
/// A pixel differs when the summed absolute RGB channel difference exceeds the
/// threshold derived from `sensitivity`. Alpha is ignored. If either bitmap
/// has zero area nothing is comparable and the change percentage is 0.
pub fn compare_raster_with_policy(
    first: &RgbaImage,
    second: &RgbaImage,
    sensitivity: u8,
    policy: OverlapPolicy,
) -> RasterDiff {
    let (width_a, height_a) = first.dimensions();
    let (width_b, height_b) = second.dimensions();

    let mut overlay = RgbaImage::new(width_a.max(width_b), height_a.max(height_b));
    image::imageops::replace(&mut overlay, first, 0, 0);

    if width_a == 0 || height_a == 0 || width_b == 0 || height_b == 0 {
        debug!(width_a, height_a, width_b, height_b, "zero-area bitmap, nothing to compare");
        return RasterDiff {
            change_percentage: 0.0,
            differing_pixels: 0,
            compared_pixels: 0,
            overlay,
        };
    }

    let threshold = sensitivity_to_threshold(sensitivity);
    let highlight = Rgba(HIGHLIGHT_RGBA);

    let (region_width, region_height) = match policy {
        OverlapPolicy::Intersection => (width_a.min(width_b), height_a.min(height_b)),
        OverlapPolicy::PadAsDifferent => overlay.dimensions(),
    };

    let mut differing_pixels: u64 = 0;
    for y in 0..region_height {
        for x in 0..region_width {
            let pixel_a = (x < width_a && y < height_a).then(|| first.get_pixel(x, y));
            let pixel_b = (x < width_b && y < height_b).then(|| second.get_pixel(x, y));

            let differs = match (pixel_a, pixel_b) {
                (Some(a), Some(b)) => f64::from(channel_distance(a, b)) > threshold,
                // Present in exactly one bitmap (padded region).
                (Some(_), None) | (None, Some(_)) => true,
                (None, None) => false,
            };

            if differs {
                differing_pixels += 1;
                overlay.put_pixel(x, y, highlight);
            }
        }
    }

    let compared_pixels = u64::from(region_width) * u64::from(region_height);
    let change_percentage = differing_pixels as f64 / compared_pixels as f64 * 100.0;

    debug!(
        ?policy,
        threshold,
        differing_pixels,
        compared_pixels,
        change_percentage,
        "raster comparison complete"
    );

    RasterDiff {
        change_percentage,
        differing_pixels,
        compared_pixels,
        overlay,
    }
}

/// `|rA-rB| + |gA-gB| + |bA-bB|`.
fn channel_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> u32 {
    a.0[..3]
        .iter()
        .zip(&b.0[..3])
        .map(|(&ca, &cb)| u32::from(ca.abs_diff(cb)))
        .sum()
}
