// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagediff: compare two documents page by page.
//
// Entry point. Loads configuration, initialises logging, runs the comparison,
// and writes the optional JSON result and PDF report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pagediff_compare::Comparator;
use pagediff_core::{
    CompareConfig, ComparisonMode, ComparisonResult, OverlapPolicy, PagedDocument, Result,
};
use pagediff_document::{ReportSynthesizer, describe_page, open_document};

/// Page-by-page document comparison
///
/// Compares two PDFs, page images, or directories of page images and reports
/// which pages changed.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// First (original) document
    #[arg(value_name = "FIRST")]
    first: PathBuf,

    /// Second (revised) document
    #[arg(value_name = "SECOND")]
    second: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Detection sensitivity, 0-100 (higher flags smaller differences)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    sensitivity: Option<u8>,

    /// Render scale for visual and overlay comparison
    #[arg(long)]
    scale: Option<f32>,

    /// JSON configuration file; flags given here override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Count pixels outside the smaller of two mismatched pages as different
    #[arg(long)]
    pad_mismatched: bool,

    /// Write diff overlays as PNG files into this directory
    #[arg(long, value_name = "DIR")]
    overlays: Option<PathBuf>,

    /// Write a PDF summary report
    #[arg(short, long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Write the full result as JSON ("-" for stdout)
    #[arg(long, value_name = "FILE")]
    json: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Visual,
    Text,
    Overlay,
}

impl From<ModeArg> for ComparisonMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Visual => ComparisonMode::Visual,
            ModeArg::Text => ComparisonMode::Text,
            ModeArg::Overlay => ComparisonMode::Overlay,
        }
    }
}

impl Cli {
    /// Merge command-line overrides into the loaded configuration.
    fn apply_to(&self, config: &mut CompareConfig) {
        if let Some(mode) = self.mode {
            config.settings.mode = mode.into();
        }
        if let Some(sensitivity) = self.sensitivity {
            config.settings.sensitivity = sensitivity;
        }
        if let Some(scale) = self.scale {
            config.render_scale = scale;
        }
        if self.pad_mismatched {
            config.overlap = OverlapPolicy::PadAsDifferent;
        }
        if let Some(dir) = &self.overlays {
            config.overlay_dir = Some(dir.clone());
        }
    }

    fn load_config(&self) -> Result<CompareConfig> {
        let mut config = match &self.config {
            Some(path) => CompareConfig::from_json_file(path)?,
            None => CompareConfig::default(),
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pagediff: {}", err);
            return ExitCode::from(2);
        }
    };

    let default_filter = config.log_filter.clone().unwrap_or_else(|| "info".into());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, scope = ?err.scope(), "Comparison failed");
            eprintln!("pagediff: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Settle the comparison mode once both documents are open.
///
/// A mode taken from the defaults or a config file falls back to text when
/// either document cannot be rasterised. A mode given with `--mode` is kept,
/// and the comparator refuses it.
fn resolve_mode(
    requested: Option<ModeArg>,
    configured: ComparisonMode,
    renderable: bool,
) -> ComparisonMode {
    if requested.is_none() && configured.is_raster() && !renderable {
        tracing::warn!(
            mode = %configured,
            "Documents cannot be rasterised in this build, comparing text instead"
        );
        return ComparisonMode::Text;
    }
    configured
}

/// Open both documents and return them with the configuration they will be
/// compared under.
fn open_pair(
    cli: &Cli,
    config: &CompareConfig,
) -> Result<(Box<dyn PagedDocument>, Box<dyn PagedDocument>, CompareConfig)> {
    let first = open_document(&cli.first)?;
    let second = open_document(&cli.second)?;

    let mut config = config.clone();
    let renderable = first.can_render() && second.can_render();
    config.settings.mode = resolve_mode(cli.mode, config.settings.mode, renderable);

    Ok((first, second, config))
}

async fn run(cli: &Cli, config: &CompareConfig) -> Result<()> {
    let (first, second, config) = open_pair(cli, config)?;
    let config = &config;

    let comparator = Comparator::from_config(config)?;

    let cancel = comparator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    tracing::info!(
        first = first.name(),
        second = second.name(),
        mode = %config.settings.mode,
        "Comparing documents"
    );

    let result = comparator
        .compare(first.as_ref(), second.as_ref(), |pct| {
            tracing::debug!(progress = pct, "Page compared");
        })
        .await?;

    print_summary(&result)?;

    if let Some(target) = &cli.json {
        write_json(&result, target)?;
    }

    if let Some(path) = &cli.report {
        let synthesizer = ReportSynthesizer::new(config.report_paper_size);
        let report = synthesizer.synthesize(
            first.name(),
            second.name(),
            &result.differences,
            &config.settings,
        )?;
        report.write_to_file(path)?;
    }

    Ok(())
}

/// One line per page, then the totals.
fn print_summary(result: &ComparisonResult) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for difference in &result.differences {
        writeln!(out, "{}", describe_page(difference, result.mode))?;
    }
    let summary = &result.summary;
    writeln!(
        out,
        "{} of {} pages changed (+{} / -{})",
        summary.pages_with_changes, summary.total_pages, summary.total_additions, summary.total_deletions
    )?;
    Ok(())
}

fn write_json(result: &ComparisonResult, target: &str) -> Result<()> {
    if target == "-" {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, result)?;
        writeln!(out)?;
    } else {
        let file = std::fs::File::create(Path::new(target))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), result)?;
        tracing::info!("Wrote JSON result to {}", target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "pagediff",
            "a.pdf",
            "b.pdf",
            "--mode",
            "text",
            "--sensitivity",
            "55",
            "--scale",
            "2.0",
            "--pad-mismatched",
            "--overlays",
            "out",
        ])
        .unwrap();

        let mut config = CompareConfig::default();
        cli.apply_to(&mut config);

        assert_eq!(config.settings.mode, ComparisonMode::Text);
        assert_eq!(config.settings.sensitivity, 55);
        assert_eq!(config.render_scale, 2.0);
        assert_eq!(config.overlap, OverlapPolicy::PadAsDifferent);
        assert_eq!(config.overlay_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["pagediff", "a", "b"]).unwrap();
        let mut config = CompareConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config, CompareConfig::default());
    }

    #[test]
    fn rejects_out_of_range_sensitivity() {
        assert!(Cli::try_parse_from(["pagediff", "a", "b", "--sensitivity", "101"]).is_err());
    }

    #[test]
    fn requires_both_documents() {
        assert!(Cli::try_parse_from(["pagediff", "a"]).is_err());
    }

    #[test]
    fn config_file_is_loaded_before_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "settings": { "sensitivity": 10 }, "render_scale": 3.0 }"#)
            .unwrap();
        let path = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "pagediff",
            "a",
            "b",
            "--config",
            path.as_str(),
            "--sensitivity",
            "90",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.settings.sensitivity, 90);
        assert_eq!(config.render_scale, 3.0);
    }

    /// A PDF with one Courier text line per page.
    fn write_pdf(path: &Path, page_texts: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

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
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn pdf_compared_with_itself_reports_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.pdf");
        write_pdf(&path, &["Cover", "Terms and conditions", "Signatures"]);
        let path = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["pagediff", path.as_str(), path.as_str()]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.settings.mode, ComparisonMode::Visual);

        let (first, second, config) = open_pair(&cli, &config).unwrap();
        if !cfg!(feature = "render") {
            assert_eq!(config.settings.mode, ComparisonMode::Text);
        }

        let result = Comparator::from_config(&config)
            .unwrap()
            .compare(first.as_ref(), second.as_ref(), |_| {})
            .await
            .unwrap();
        assert_eq!(result.summary.total_pages, 3);
        assert_eq!(result.summary.pages_with_changes, 0);
    }

    #[test]
    fn explicit_mode_is_never_overridden() {
        assert_eq!(
            resolve_mode(Some(ModeArg::Visual), ComparisonMode::Visual, false),
            ComparisonMode::Visual
        );
        assert_eq!(
            resolve_mode(None, ComparisonMode::Overlay, false),
            ComparisonMode::Text
        );
        assert_eq!(
            resolve_mode(None, ComparisonMode::Visual, true),
            ComparisonMode::Visual
        );
        assert_eq!(
            resolve_mode(None, ComparisonMode::Text, false),
            ComparisonMode::Text
        );
    }

    #[test]
    fn invalid_scale_is_rejected_after_merge() {
        let cli = Cli::try_parse_from(["pagediff", "a", "b", "--scale", "0"]).unwrap();
        assert!(cli.load_config().is_err());
    }
}
