// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a PDF with `lopdf` and serve its page count and per-page
// text to the comparison engine. Page rendering goes through MuPDF when the
// `render` feature is enabled.

use std::path::Path;
#[cfg(feature = "render")]
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use lopdf::Document;
use pagediff_core::error::{PageDiffError, Result};
use pagediff_core::{PageRenderer, PagedDocument, TextExtractor};
use tracing::{debug, info, instrument, warn};

/// A PDF opened for comparison.
///
/// Page text is extracted once when the document is loaded, so the handle is
/// plain data and can be shared across tasks. A page whose text could not be
/// extracted keeps its error, which surfaces when that page is requested.
///
/// Without the `render` feature the document is text-only: `can_render`
/// reports `false` and visual or overlay comparisons refuse it up front.
pub struct PdfDocument {
    /// Display name (file name, or the caller's label for in-memory input).
    name: String,
    /// Extraction outcome per page, indexed from page 1.
    pages: Vec<std::result::Result<String, String>>,
    /// Raw file bytes, reopened by MuPDF for each rendered page.
    #[cfg(feature = "render")]
    data: Arc<Vec<u8>>,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let name = path_ref
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_ref.display().to_string());

        let data = std::fs::read(path_ref).map_err(|err| PageDiffError::DocumentLoad {
            name: name.clone(),
            reason: err.to_string(),
        })?;

        Self::from_vec(name, data)
    }

    /// Load a PDF from raw bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        Self::from_vec(name.into(), data.to_vec())
    }

    fn from_vec(name: String, data: Vec<u8>) -> Result<Self> {
        let document = Document::load_mem(&data).map_err(|err| PageDiffError::DocumentLoad {
            name: name.clone(),
            reason: err.to_string(),
        })?;

        let pages = Self::extract_pages(&document);

        Ok(Self {
            name,
            pages,
            #[cfg(feature = "render")]
            data: Arc::new(data),
        })
    }

    fn extract_pages(document: &Document) -> Vec<std::result::Result<String, String>> {
        // lopdf pages are keyed by 1-indexed page number, in order.
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

        let pages: Vec<_> = page_numbers
            .iter()
            .map(|&page_number| {
                document.extract_text(&[page_number]).map_err(|err| {
                    warn!(page_number, %err, "Text extraction failed");
                    err.to_string()
                })
            })
            .collect();

        debug!(pages = pages.len(), "PDF loaded");
        pages
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl TextExtractor for PdfDocument {
    async fn extract_page_text(&self, page_number: usize) -> Result<String> {
        let entry = page_number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .ok_or_else(|| PageDiffError::PageExtraction {
                page: page_number,
                reason: format!("page out of range (document has {} pages)", self.pages.len()),
            })?;

        entry.clone().map_err(|reason| PageDiffError::PageExtraction {
            page: page_number,
            reason,
        })
    }
}

#[cfg(feature = "render")]
#[async_trait]
impl PageRenderer for PdfDocument {
    #[instrument(skip(self), fields(name = %self.name))]
    async fn render_page(&self, page_number: usize, scale: f32) -> Result<RgbaImage> {
        if page_number == 0 || page_number > self.pages.len() {
            return Err(PageDiffError::PageRender {
                page: page_number,
                reason: format!("page out of range (document has {} pages)", self.pages.len()),
            });
        }

        let data = Arc::clone(&self.data);
        let rendered = tokio::task::spawn_blocking(move || {
            crate::pdf::render::rasterise(&data, page_number, scale)
        })
        .await
        .map_err(|err| PageDiffError::PageRender {
            page: page_number,
            reason: err.to_string(),
        })?;

        rendered.map_err(|reason| PageDiffError::PageRender {
            page: page_number,
            reason,
        })
    }
}

#[cfg(not(feature = "render"))]
#[async_trait]
impl PageRenderer for PdfDocument {
    async fn render_page(&self, page_number: usize, _scale: f32) -> Result<RgbaImage> {
        Err(PageDiffError::PageRender {
            page: page_number,
            reason: format!(
                "{} cannot be rasterised: pagediff was built without the `render` feature",
                self.name
            ),
        })
    }
}

#[async_trait]
impl PagedDocument for PdfDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_render(&self) -> bool {
        cfg!(feature = "render")
    }

    async fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a PDF with one Courier text line per page.
    pub(crate) fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    #[tokio::test]
    async fn counts_pages_and_extracts_text() {
        let bytes = sample_pdf(&["Hello World", "Second page"]);
        let doc = PdfDocument::from_bytes("sample.pdf", &bytes).unwrap();

        assert_eq!(doc.page_count().await.unwrap(), 2);
        assert_eq!(doc.name(), "sample.pdf");

        let first = doc.extract_page_text(1).await.unwrap();
        let words: Vec<&str> = first.split_whitespace().collect();
        assert_eq!(words, vec!["Hello", "World"]);
        assert!(doc.extract_page_text(2).await.unwrap().contains("Second"));
    }

    #[tokio::test]
    async fn out_of_range_pages_are_errors() {
        let doc = PdfDocument::from_bytes("one.pdf", &sample_pdf(&["only"])).unwrap();
        assert!(matches!(
            doc.extract_page_text(0).await,
            Err(PageDiffError::PageExtraction { page: 0, .. })
        ));
        assert!(matches!(
            doc.extract_page_text(2).await,
            Err(PageDiffError::PageExtraction { page: 2, .. })
        ));
    }

    #[cfg(not(feature = "render"))]
    #[tokio::test]
    async fn text_only_build_reports_it_cannot_render() {
        let doc = PdfDocument::from_bytes("one.pdf", &sample_pdf(&["only"])).unwrap();
        assert!(!doc.can_render());
        assert!(matches!(
            doc.render_page(1, 1.5).await,
            Err(PageDiffError::PageRender { page: 1, .. })
        ));
    }

    #[cfg(feature = "render")]
    #[tokio::test]
    async fn renders_pages_at_the_requested_scale() {
        let doc = PdfDocument::from_bytes("two.pdf", &sample_pdf(&["first", "second"])).unwrap();
        assert!(doc.can_render());

        let page = doc.render_page(1, 1.0).await.unwrap();
        assert_eq!((page.width(), page.height()), (595, 842));
        let doubled = doc.render_page(2, 2.0).await.unwrap();
        assert_eq!((doubled.width(), doubled.height()), (1190, 1684));

        // Ink from the text line lands somewhere on an otherwise white page.
        assert!(page.pixels().any(|p| p.0[0] < 128));
        assert!(matches!(
            doc.render_page(3, 1.0).await,
            Err(PageDiffError::PageRender { page: 3, .. })
        ));
    }

    #[cfg(feature = "render")]
    #[tokio::test]
    async fn identical_pages_render_identically() {
        let bytes = sample_pdf(&["same text"]);
        let a = PdfDocument::from_bytes("a.pdf", &bytes).unwrap();
        let b = PdfDocument::from_bytes("b.pdf", &bytes).unwrap();
        assert_eq!(
            a.render_page(1, 1.0).await.unwrap(),
            b.render_page(1, 1.0).await.unwrap()
        );
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let err = PdfDocument::from_bytes("junk.pdf", b"not a pdf at all").err().unwrap();
        assert!(matches!(err, PageDiffError::DocumentLoad { ref name, .. } if name == "junk.pdf"));
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.pdf");
        std::fs::write(&path, sample_pdf(&["a", "b", "c"])).unwrap();

        let doc = PdfDocument::open(&path).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.name(), "disk.pdf");
    }
}
