// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report writer: lay out a comparison summary as a paginated PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::Path;

use chrono::Utc;
use pagediff_core::color::hex_to_rgb;
use pagediff_core::error::{PageDiffError, Result};
use pagediff_core::{
    ComparisonMode, ComparisonSettings, ComparisonSummary, PageDifference, PageStatus, PaperSize,
};
use printpdf::{
    BuiltinFont, Color, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, Rgb,
    TextItem,
};
use tracing::{debug, info, instrument};

const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_PT: f32 = 14.0;
const BODY_SIZE_PT: f32 = 11.0;
const HEADING_SIZE_PT: f32 = 13.0;
const TITLE_SIZE_PT: f32 = 18.0;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_CHAR_WIDTH_EM: f32 = 0.50;

/// A finished report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    /// Serialised PDF bytes.
    pub bytes: Vec<u8>,
    /// Number of pages in the report.
    pub page_count: usize,
}

impl ReportDocument {
    /// Write the report to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        info!("Wrote comparison report to {}", path.as_ref().display());
        Ok(())
    }
}

/// One laid-out line of report text.
#[derive(Debug, Clone)]
struct Line {
    text: String,
    font: BuiltinFont,
    size_pt: f32,
    /// Vertical space this line consumes.
    advance_pt: f32,
    color: Option<[f32; 3]>,
}

impl Line {
    fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: BuiltinFont::Helvetica,
            size_pt: BODY_SIZE_PT,
            advance_pt: LINE_HEIGHT_PT,
            color: None,
        }
    }

    fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: BuiltinFont::HelveticaBold,
            size_pt: HEADING_SIZE_PT,
            advance_pt: LINE_HEIGHT_PT * 1.5,
            color: None,
        }
    }

    fn title(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: BuiltinFont::HelveticaBold,
            size_pt: TITLE_SIZE_PT,
            advance_pt: LINE_HEIGHT_PT * 2.0,
            color: None,
        }
    }

    fn blank() -> Self {
        Self::body(String::new())
    }

    fn colored(mut self, color: Option<[f32; 3]>) -> Self {
        self.color = color;
        self
    }
}

/// Renders the per-page difference list as a human-readable PDF.
pub struct ReportSynthesizer {
    /// Paper size for report pages.
    paper_size: PaperSize,
    /// Title printed at the top and embedded in the PDF metadata.
    title: String,
}

impl ReportSynthesizer {
    /// Create a synthesizer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: "Document Comparison Report".to_string(),
        }
    }

    /// Create a synthesizer defaulting to A4.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    /// Set the report title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Build the report for a finished comparison.
    ///
    /// Has no side effects; a failure here leaves the comparison result intact.
    #[instrument(skip_all, fields(pages = differences.len(), mode = %settings.mode))]
    pub fn synthesize(
        &self,
        name_a: &str,
        name_b: &str,
        differences: &[PageDifference],
        settings: &ComparisonSettings,
    ) -> Result<ReportDocument> {
        let palette = Palette::from_settings(settings)?;

        let (page_w, page_h) = self.page_dimensions();
        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let page_h_pt = page_h.into_pt().0;
        let top_pt = page_h_pt - margin_pt;
        let usable_width_pt = page_w.into_pt().0 - 2.0 * margin_pt;

        if top_pt - LINE_HEIGHT_PT < margin_pt || usable_width_pt < TITLE_SIZE_PT {
            return Err(PageDiffError::ReportGeneration(format!(
                "paper size {:?} is too small for the report margins",
                self.paper_size
            )));
        }

        let lines = wrap_lines(
            self.layout(name_a, name_b, differences, settings, &palette),
            usable_width_pt,
        );

        info!(paper = ?self.paper_size, lines = lines.len(), "Creating comparison report");

        let mut pages: Vec<PdfPage> = Vec::new();
        let mut ops: Vec<Op> = Vec::new();
        let mut cursor_pt = top_pt;

        for line in &lines {
            // Overflow check: start a new page once the cursor has run past
            // the bottom margin.
            if cursor_pt < margin_pt {
                pages.push(PdfPage::new(page_w, page_h, std::mem::take(&mut ops)));
                cursor_pt = top_pt;
            }

            if !line.text.is_empty() {
                push_text(&mut ops, line, margin_pt, cursor_pt);
            }
            cursor_pt -= line.advance_pt;
        }
        pages.push(PdfPage::new(page_w, page_h, ops));

        let page_count = pages.len();
        let mut doc = PdfDocument::new(&self.title);
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if bytes.is_empty() {
            return Err(PageDiffError::ReportGeneration(
                "PDF serialisation produced no output".into(),
            ));
        }

        debug!(page_count, bytes = bytes.len(), warnings = warnings.len(), "Report complete");
        Ok(ReportDocument { bytes, page_count })
    }

    /// Header, summary, and one line per page.
    fn layout(
        &self,
        name_a: &str,
        name_b: &str,
        differences: &[PageDifference],
        settings: &ComparisonSettings,
        palette: &Palette,
    ) -> Vec<Line> {
        let mut summary = ComparisonSummary::new(differences.len());
        for difference in differences {
            summary.record(difference);
        }

        let mut lines = vec![
            Line::title(self.title.clone()),
            Line::body(format!(
                "Generated: {}",
                Utc::now().format("%Y-%m-%d %H:%M UTC")
            )),
            Line::blank(),
            Line::body(format!("First document: {}", name_a)),
            Line::body(format!("Second document: {}", name_b)),
            Line::body(format!(
                "Mode: {}    Sensitivity: {}",
                settings.mode, settings.sensitivity
            )),
            Line::blank(),
            Line::heading("Summary"),
            Line::body(format!("Total pages: {}", summary.total_pages)),
            Line::body(format!("Pages with changes: {}", summary.pages_with_changes)),
            Line::body(format!(
                "Unchanged pages: {}",
                summary.total_pages - summary.pages_with_changes
            )),
            Line::body(format!("Additions: {}", summary.total_additions)),
            Line::body(format!("Deletions: {}", summary.total_deletions)),
            Line::blank(),
            Line::heading("Page details"),
        ];

        lines.extend(differences.iter().map(|difference| {
            Line::body(describe_page(difference, settings.mode))
                .colored(palette.color_for(difference))
        }));

        lines
    }
}

/// Line colours resolved from the settings' highlight flags and hex colours.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Palette {
    additions: Option<[f32; 3]>,
    deletions: Option<[f32; 3]>,
    modifications: Option<[f32; 3]>,
}

impl Palette {
    fn from_settings(settings: &ComparisonSettings) -> Result<Self> {
        let resolve = |enabled: bool, hex: &str| -> Result<Option<[f32; 3]>> {
            if !enabled {
                return Ok(None);
            }
            hex_to_rgb(hex)
                .map(Some)
                .map_err(|err| PageDiffError::ReportGeneration(err.to_string()))
        };

        Ok(Self {
            additions: resolve(settings.highlight_additions, &settings.color_additions)?,
            deletions: resolve(settings.highlight_deletions, &settings.color_deletions)?,
            modifications: resolve(
                settings.highlight_modifications,
                &settings.color_modifications,
            )?,
        })
    }

    fn color_for(&self, difference: &PageDifference) -> Option<[f32; 3]> {
        if !difference.has_changes() {
            return None;
        }
        match difference.status() {
            PageStatus::OnlyInSecond => self.additions,
            PageStatus::OnlyInFirst => self.deletions,
            PageStatus::Compared | PageStatus::Unreadable { .. } => self.modifications,
        }
    }
}

/// One-line status of a page, as printed in the report's page details.
pub fn describe_page(difference: &PageDifference, mode: ComparisonMode) -> String {
    let page = difference.page_number();
    match difference.status() {
        PageStatus::OnlyInSecond => format!("Page {}: changed (only in second document)", page),
        PageStatus::OnlyInFirst => format!("Page {}: changed (only in first document)", page),
        PageStatus::Unreadable { reason } => {
            format!("Page {}: changed (could not be read: {})", page, reason)
        }
        PageStatus::Compared if !difference.has_changes() => format!("Page {}: unchanged", page),
        PageStatus::Compared => match mode {
            ComparisonMode::Text => format!(
                "Page {}: changed (+{} / -{} / ~{})",
                page,
                difference.additions(),
                difference.deletions(),
                difference.modifications()
            ),
            ComparisonMode::Visual | ComparisonMode::Overlay => format!(
                "Page {}: changed ({:.2}%)",
                page,
                difference.change_percentage()
            ),
        },
    }
}

/// Split lines wider than `width_pt` into continuation lines that keep the
/// original font, size, and colour.
fn wrap_lines(lines: Vec<Line>, width_pt: f32) -> Vec<Line> {
    let mut wrapped = Vec::with_capacity(lines.len());
    for line in lines {
        let max_chars = ((width_pt / (AVG_CHAR_WIDTH_EM * line.size_pt)) as usize).max(1);
        if line.text.chars().count() <= max_chars && !line.text.contains('\n') {
            wrapped.push(line);
            continue;
        }
        for text in wrap_text(&line.text, max_chars) {
            wrapped.push(Line {
                text,
                ..line.clone()
            });
        }
    }
    wrapped
}

/// Wrap text so that no line exceeds `max_chars` characters.
///
/// Splits on existing newlines first, then word-wraps each paragraph. Words
/// longer than `max_chars` are broken on character boundaries.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();

            if word_len > max_chars {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_chars).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
                current_len = word_len;
            }
        }

        // Empty paragraphs survive as blank lines.
        result.push(current);
    }

    result
}

/// Append the ops that draw `line` with its baseline at `y_pt`.
fn push_text(ops: &mut Vec<Op>, line: &Line, x_pt: f32, y_pt: f32) {
    let [r, g, b] = line.color.unwrap_or([0.0, 0.0, 0.0]);

    ops.push(Op::StartTextSection);
    ops.push(Op::SetFillColor {
        col: Color::Rgb(Rgb::new(r, g, b, None)),
    });
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x_pt),
            y: Pt(y_pt),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(line.size_pt),
        font: line.font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(line.text.clone())],
        font: line.font,
    });
    ops.push(Op::EndTextSection);
}

/// Build an A4 report with default options.
pub fn synthesize_report(
    name_a: &str,
    name_b: &str,
    differences: &[PageDifference],
    settings: &ComparisonSettings,
) -> Result<ReportDocument> {
    ReportSynthesizer::a4().synthesize(name_a, name_b, differences, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagediff_core::TextDelta;

    fn mixed_differences() -> Vec<PageDifference> {
        vec![
            PageDifference::visual(1, 0.0, None),
            PageDifference::visual(2, 12.345, None),
            PageDifference::unreadable(3, "renderer crashed"),
            PageDifference::only_in_first(4),
        ]
    }

    #[test]
    fn describes_each_page_status() {
        let diffs = mixed_differences();
        let visual = ComparisonMode::Visual;
        assert_eq!(describe_page(&diffs[0], visual), "Page 1: unchanged");
        assert_eq!(describe_page(&diffs[1], visual), "Page 2: changed (12.35%)");
        assert_eq!(
            describe_page(&diffs[2], visual),
            "Page 3: changed (could not be read: renderer crashed)"
        );
        assert_eq!(
            describe_page(&diffs[3], visual),
            "Page 4: changed (only in first document)"
        );
        assert_eq!(
            describe_page(&PageDifference::only_in_second(5), visual),
            "Page 5: changed (only in second document)"
        );

        let text = PageDifference::text(
            6,
            TextDelta {
                additions: 2,
                deletions: 1,
                modifications: 3,
            },
        );
        assert_eq!(
            describe_page(&text, ComparisonMode::Text),
            "Page 6: changed (+2 / -1 / ~3)"
        );
    }

    #[test]
    fn palette_follows_highlight_flags() {
        let settings = ComparisonSettings {
            color_additions: "#00ff00".into(),
            color_deletions: "#ff0000".into(),
            color_modifications: "#0000ff".into(),
            highlight_modifications: false,
            ..ComparisonSettings::default()
        };
        let palette = Palette::from_settings(&settings).unwrap();

        assert_eq!(
            palette.color_for(&PageDifference::only_in_second(1)),
            Some([0.0, 1.0, 0.0])
        );
        assert_eq!(
            palette.color_for(&PageDifference::only_in_first(1)),
            Some([1.0, 0.0, 0.0])
        );
        assert_eq!(palette.color_for(&PageDifference::visual(1, 50.0, None)), None);
        assert_eq!(palette.color_for(&PageDifference::visual(1, 0.0, None)), None);
    }

    #[test]
    fn layout_has_header_then_one_line_per_page() {
        let diffs = mixed_differences();
        let settings = ComparisonSettings::default();
        let palette = Palette::from_settings(&settings).unwrap();
        let mut synthesizer = ReportSynthesizer::a4();
        synthesizer.set_title("Quarterly filing comparison");
        let lines = synthesizer.layout("old.pdf", "new.pdf", &diffs, &settings, &palette);

        assert_eq!(lines[0].text, "Quarterly filing comparison");
        assert_eq!(lines[0].font, BuiltinFont::HelveticaBold);

        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.contains(&"First document: old.pdf"));
        assert!(texts.contains(&"Second document: new.pdf"));
        assert!(texts.contains(&"Total pages: 4"));
        assert!(texts.contains(&"Pages with changes: 3"));
        assert!(texts.contains(&"Deletions: 1"));

        let details = texts
            .iter()
            .position(|t| *t == "Page details")
            .unwrap();
        let page_lines = &texts[details + 1..];
        assert_eq!(page_lines.len(), 4);
        assert_eq!(page_lines[0], "Page 1: unchanged");
        assert!(page_lines.iter().all(|t| t.starts_with("Page ")));
    }

    #[test]
    fn long_page_lines_wrap_within_the_margins() {
        let reason = "the embedded font program could not be parsed ".repeat(9);
        let diffs = vec![PageDifference::unreadable(1, reason.trim_end())];
        let settings = ComparisonSettings::default();
        let palette = Palette::from_settings(&settings).unwrap();
        let synthesizer = ReportSynthesizer::a4();
        let laid_out = synthesizer.layout("a", "b", &diffs, &settings, &palette);

        // A4 is 595pt wide; less two 20mm margins leaves about 482pt.
        let width_pt = 482.0;
        let max_chars = (width_pt / (AVG_CHAR_WIDTH_EM * BODY_SIZE_PT)) as usize;
        let wrapped = wrap_lines(laid_out.clone(), width_pt);

        let detail: Vec<&Line> = wrapped
            .iter()
            .skip_while(|l| l.text != "Page details")
            .skip(1)
            .collect();
        assert!(detail.len() >= 4, "got {} lines", detail.len());
        assert!(detail[0].text.starts_with("Page 1: changed (could not be read:"));
        for line in &detail {
            assert!(line.text.chars().count() <= max_chars, "{:?}", line.text);
            assert_eq!(line.color, palette.color_for(&diffs[0]));
            assert!(line.color.is_some());
        }

        let rejoined: Vec<&str> = detail.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), describe_page(&diffs[0], settings.mode));

        // Header lines are short enough to pass through untouched.
        assert_eq!(wrapped.len(), laid_out.len() - 1 + detail.len());
        assert_eq!(wrapped[0].text, laid_out[0].text);

        let report = synthesizer
            .synthesize("a", "b", &diffs, &settings)
            .unwrap();
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn wrap_breaks_oversized_words_on_char_boundaries() {
        let word = "ü".repeat(25);
        let lines = wrap_text(&format!("ab {} cd", word), 10);
        assert_eq!(lines[0], "ab");
        assert_eq!(lines[1], "ü".repeat(10));
        assert_eq!(lines[2], "ü".repeat(10));
        assert_eq!(lines[3], format!("{} cd", "ü".repeat(5)));
        assert_eq!(lines.len(), 4);

        assert_eq!(wrap_text("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap_text("fits as is", 10), vec!["fits as is"]);
    }

    #[test]
    fn short_report_fits_on_one_page() {
        let report = synthesize_report(
            "old.pdf",
            "new.pdf",
            &mixed_differences(),
            &ComparisonSettings::default(),
        )
        .unwrap();

        assert_eq!(report.page_count, 1);
        assert!(report.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_report_paginates() {
        let diffs: Vec<PageDifference> = (1..=200)
            .map(|n| PageDifference::visual(n, (n % 3) as f64, None))
            .collect();

        let report = synthesize_report("a.pdf", "b.pdf", &diffs, &ComparisonSettings::default())
            .unwrap();

        // 215 lines at roughly 52 lines per A4 page.
        assert!(report.page_count >= 4, "got {} pages", report.page_count);

        let parsed = lopdf::Document::load_mem(&report.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), report.page_count);
    }

    #[test]
    fn empty_comparison_still_produces_a_page() {
        let report =
            synthesize_report("a.pdf", "b.pdf", &[], &ComparisonSettings::default()).unwrap();
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn malformed_colour_fails_report_only() {
        let settings = ComparisonSettings {
            color_modifications: "orange".into(),
            ..ComparisonSettings::default()
        };
        let err = synthesize_report("a", "b", &mixed_differences(), &settings).unwrap_err();
        assert!(matches!(err, PageDiffError::ReportGeneration(_)));
    }

    #[test]
    fn tiny_paper_is_rejected() {
        let synthesizer = ReportSynthesizer::new(PaperSize::Custom {
            width_mm: 50,
            height_mm: 40,
        });
        let result = synthesizer.synthesize("a", "b", &[], &ComparisonSettings::default());
        assert!(matches!(result, Err(PageDiffError::ReportGeneration(_))));
    }

    #[test]
    fn writes_report_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let report = synthesize_report("a", "b", &[], &ComparisonSettings::default()).unwrap();
        report.write_to_file(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), report.bytes);
    }
}
