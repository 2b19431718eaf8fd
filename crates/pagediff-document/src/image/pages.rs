// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-backed documents: each page is a raster image (a scan, or a page
// exported by another renderer). Pages are decoded on demand and resampled to
// the requested render scale.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use pagediff_core::error::{PageDiffError, Result};
use pagediff_core::{PageRenderer, PagedDocument, TextExtractor};
use tracing::{debug, info, instrument};

/// File extensions recognised as page images.
pub const PAGE_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "gif"];

/// Where a page's pixels come from.
#[derive(Debug, Clone)]
enum PageImage {
    /// Encoded bytes (PNG, JPEG, ...).
    Encoded(Vec<u8>),
    /// A file decoded on each render.
    File(PathBuf),
    /// An already-decoded bitmap.
    Bitmap(RgbaImage),
}

#[derive(Debug, Clone)]
struct Page {
    image: PageImage,
    /// Sidecar text for text-mode comparison.
    text: Option<String>,
}

/// A document made of page images.
#[derive(Debug, Clone)]
pub struct ImageDocument {
    name: String,
    pages: Vec<Page>,
}

impl ImageDocument {
    // -- Construction ---------------------------------------------------------

    /// Pages from encoded image bytes, in order.
    pub fn from_encoded(name: impl Into<String>, pages: Vec<Vec<u8>>) -> Self {
        Self::from_images(name, pages.into_iter().map(PageImage::Encoded))
    }

    /// Pages from already-decoded bitmaps, in order.
    pub fn from_bitmaps(name: impl Into<String>, pages: Vec<RgbaImage>) -> Self {
        Self::from_images(name, pages.into_iter().map(PageImage::Bitmap))
    }

    /// Pages from image files, in the order given. Files are read on render.
    pub fn from_files(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self::from_images(name, paths.into_iter().map(PageImage::File))
    }

    /// Every page image in `dir`, ordered by file name with digit runs
    /// compared as numbers (`page-2.png` before `page-10.png`).
    ///
    /// A `.txt` file with the same stem as a page image (`page-01.png` and
    /// `page-01.txt`) is read as that page's text.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let load_error = |reason: String| PageDiffError::DocumentLoad {
            name: name.clone(),
            reason,
        };

        let entries = std::fs::read_dir(dir).map_err(|err| load_error(err.to_string()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| load_error(err.to_string()))?.path();
            if path.is_file() && is_page_image(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

        if paths.is_empty() {
            return Err(load_error("directory contains no page images".into()));
        }

        let mut pages = Vec::with_capacity(paths.len());
        for path in paths {
            let sidecar = path.with_extension("txt");
            let text = if sidecar.is_file() {
                Some(std::fs::read_to_string(&sidecar).map_err(|err| load_error(err.to_string()))?)
            } else {
                None
            };
            pages.push(Page {
                image: PageImage::File(path),
                text,
            });
        }

        info!(pages = pages.len(), "Image document loaded");
        Ok(Self { name, pages })
    }

    fn from_images(name: impl Into<String>, images: impl Iterator<Item = PageImage>) -> Self {
        Self {
            name: name.into(),
            pages: images.map(|image| Page { image, text: None }).collect(),
        }
    }

    /// Attach text to pages in order, for text-mode comparison. Extra entries
    /// are ignored.
    pub fn with_texts(mut self, texts: Vec<String>) -> Self {
        for (page, text) in self.pages.iter_mut().zip(texts) {
            page.text = Some(text);
        }
        self
    }

    // -- Inspection -----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn page(&self, page_number: usize) -> Option<&Page> {
        page_number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
    }
}

/// Whether `path` has a recognised page-image extension.
pub fn is_page_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| PAGE_IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare names so that runs of ASCII digits order by value. Equal values
/// with different zero padding fall back to the shorter run first, and
/// everything else compares character by character.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = take_digits(&mut left);
                let run_b = take_digits(&mut right);
                let ordering = compare_digit_runs(&run_a, &run_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let trimmed_a = a.trim_start_matches('0');
    let trimmed_b = b.trim_start_matches('0');
    trimmed_a
        .len()
        .cmp(&trimmed_b.len())
        .then_with(|| trimmed_a.cmp(trimmed_b))
        .then_with(|| a.len().cmp(&b.len()))
}

#[async_trait]
impl PageRenderer for ImageDocument {
    #[instrument(skip(self), fields(document = %self.name))]
    async fn render_page(&self, page_number: usize, scale: f32) -> Result<RgbaImage> {
        let page = self.page(page_number).ok_or_else(|| PageDiffError::PageRender {
            page: page_number,
            reason: format!("page out of range (document has {} pages)", self.pages.len()),
        })?;

        let source = page.image.clone();
        // Decoding and resampling are CPU-bound.
        tokio::task::spawn_blocking(move || rasterise(source, scale))
            .await
            .map_err(|err| PageDiffError::PageRender {
                page: page_number,
                reason: format!("render task failed: {}", err),
            })?
            .map_err(|reason| PageDiffError::PageRender {
                page: page_number,
                reason,
            })
    }
}

#[async_trait]
impl TextExtractor for ImageDocument {
    async fn extract_page_text(&self, page_number: usize) -> Result<String> {
        let page = self.page(page_number).ok_or_else(|| PageDiffError::PageExtraction {
            page: page_number,
            reason: format!("page out of range (document has {} pages)", self.pages.len()),
        })?;

        page.text.clone().ok_or_else(|| PageDiffError::PageExtraction {
            page: page_number,
            reason: "page image has no text layer".into(),
        })
    }
}

#[async_trait]
impl PagedDocument for ImageDocument {
    fn name(&self) -> &str {
        &self.name
    }

    async fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }
}

/// Decode a page and scale it. Scale 1.0 returns the native bitmap.
fn rasterise(source: PageImage, scale: f32) -> std::result::Result<RgbaImage, String> {
    let bitmap = match source {
        PageImage::Bitmap(bitmap) => bitmap,
        PageImage::Encoded(bytes) => decode(image::load_from_memory(&bytes))?,
        PageImage::File(path) => decode(image::open(&path)).map_err(|err| {
            format!("{}: {}", path.display(), err)
        })?,
    };

    if (scale - 1.0).abs() < f32::EPSILON {
        return Ok(bitmap);
    }

    let width = scaled(bitmap.width(), scale);
    let height = scaled(bitmap.height(), scale);
    debug!(
        from_w = bitmap.width(),
        from_h = bitmap.height(),
        width,
        height,
        "Resampling page"
    );
    Ok(image::imageops::resize(&bitmap, width, height, FilterType::Triangle))
}

fn decode(result: image::ImageResult<DynamicImage>) -> std::result::Result<RgbaImage, String> {
    result
        .map(|image| image.to_rgba8())
        .map_err(|err| format!("failed to decode page image: {}", err))
}

/// Scaled dimension, never below one pixel for a non-empty side.
fn scaled(length: u32, scale: f32) -> u32 {
    if length == 0 {
        return 0;
    }
    ((length as f32 * scale).round() as u32).max(1)
}
