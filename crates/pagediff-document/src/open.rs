// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Open a comparison input by path, choosing the document type from what the
// path points at.

use std::path::Path;

use pagediff_core::PagedDocument;
use pagediff_core::error::{PageDiffError, Result};
use tracing::debug;

use crate::image::pages::{ImageDocument, is_page_image};
use crate::pdf::reader::PdfDocument;

/// Open `path` as a paged document.
///
/// - a directory is a sequence of page images (see [`ImageDocument::from_dir`])
/// - a `.pdf` file is read with lopdf
/// - a single image file is a one-page document
pub fn open_document(path: impl AsRef<Path>) -> Result<Box<dyn PagedDocument>> {
    let path = path.as_ref();

    if path.is_dir() {
        debug!(path = %path.display(), "Opening page-image directory");
        return Ok(Box::new(ImageDocument::from_dir(path)?));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !path.is_file() {
        return Err(PageDiffError::DocumentLoad {
            name,
            reason: "no such file or directory".into(),
        });
    }

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Ok(Box::new(PdfDocument::open(path)?))
    } else if is_page_image(path) {
        Ok(Box::new(ImageDocument::from_files(name, vec![path.to_path_buf()])))
    } else {
        Err(PageDiffError::DocumentLoad {
            name,
            reason: "unsupported input type (expected a PDF, an image, or a directory of images)"
                .into(),
        })
    }
}
