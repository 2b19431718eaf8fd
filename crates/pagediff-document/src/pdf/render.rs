// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterisation through MuPDF. Compiled only with the `render` feature.

use image::RgbaImage;
use mupdf::{Colorspace, Document, Matrix};

/// Rasterise one 1-indexed page of an in-memory PDF at `scale` (1.0 = 72 dpi).
///
/// MuPDF handles are not `Send`, so the document is reopened from bytes on
/// the calling thread every time.
pub(crate) fn rasterise(data: &[u8], page_number: usize, scale: f32) -> Result<RgbaImage, String> {
    let index = page_number
        .checked_sub(1)
        .ok_or_else(|| "page numbers start at 1".to_string())?;

    let document = Document::from_bytes(data, "application/pdf").map_err(|e| e.to_string())?;
    let page = document.load_page(index as i32).map_err(|e| e.to_string())?;

    let matrix = Matrix::new_scale(scale, scale);
    let pixmap = page
        .to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)
        .map_err(|e| e.to_string())?;

    pixmap_to_rgba(&pixmap)
}

fn pixmap_to_rgba(pixmap: &mupdf::Pixmap) -> Result<RgbaImage, String> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| format!("pixmap of {}x{} did not fill an image buffer", width, height))
}
