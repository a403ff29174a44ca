use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

use docxmerge::discovery::discover_sources;
use docxmerge::document::{body_stats, BodyStats};
use docxmerge::extract::{extract_media, ZipMediaExtractor};
use docxmerge::merge::{MergedSource, SkippedItem};
use docxmerge::render::{detect_converter, RenderChain};
use docxmerge::{
    load_document, ConverterKind, Document, MergeConfig, Merger, ReportFormat,
};

#[derive(Parser)]
#[command(name = "docxmerge")]
#[command(about = "Merge a directory of .docx files into one document and render it to PDF")]
#[command(version)]
struct Cli {
    /// Directory holding the .docx files to merge
    #[arg(value_name = "DIR", default_value = "./to_merge")]
    dir: PathBuf,

    /// Directory for the merged document, PDF and extracted media
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Skip PDF rendering
    #[arg(long)]
    no_pdf: bool,

    /// Skip extraction of embedded media
    #[arg(long)]
    no_extract: bool,

    /// Prepend a contents page linking to each source
    #[arg(long)]
    contents: bool,

    /// Bookmark the start of each source
    #[arg(long)]
    bookmarks: bool,

    /// PDF converter to use
    #[arg(long, value_enum, default_value = "auto")]
    converter: ConverterKind,

    /// Summary format
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,

    /// Log more detail (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Serialize)]
struct Summary {
    converter: String,
    merged: usize,
    failed: Vec<String>,
    sources: Vec<MergedSource>,
    skipped: Vec<SkippedItem>,
    stats: BodyStats,
    output: PathBuf,
    pdf: Option<PathBuf>,
    pdf_bytes: Option<u64>,
    extracted_media: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.init_config {
        match MergeConfig::init_default()? {
            Some(path) => println!("Wrote default config to {}", path.display()),
            None => eprintln!("No config directory available on this system"),
        }
        return Ok(());
    }

    let mut config = MergeConfig::load()?;
    config.contents_page |= cli.contents;
    config.source_bookmarks |= cli.bookmarks;
    config.extract_images &= !cli.no_extract;
    config.render &= !cli.no_pdf;

    match run(&cli, &config).await {
        Ok(ok) => {
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Returns `Ok(false)` when the merge succeeded but rendering did not.
async fn run(cli: &Cli, config: &MergeConfig) -> Result<bool> {
    let text = cli.report == ReportFormat::Text;
    let converter = detect_converter();
    if text {
        println!("PDF converter: {converter}");
    }

    let sources = discover_sources(&cli.dir)?;
    if sources.is_empty() {
        bail!("No .docx files found in {}", cli.dir.display());
    }
    if text {
        println!("Found {} file(s):", sources.len());
        for source in &sources {
            println!("  {}", file_name(source));
        }
    }

    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let load_options = config.load_options();
    let mut merger = Merger::new(config.merge_options())?;
    let mut failed = Vec::new();
    let mut extracted_media = 0;
    for (index, path) in sources.iter().enumerate() {
        if text {
            println!("[{}/{}] {}", index + 1, sources.len(), file_name(path));
        }
        match load_document(path, &load_options).await {
            Ok(source) => merger.append(&source),
            Err(e) => {
                eprintln!("  skipped: {e:#}");
                failed.push(file_name(path));
                continue;
            }
        }
        if config.extract_images {
            extracted_media += extract_media(&ZipMediaExtractor, path, &output_dir);
        }
    }

    if merger.merged_count() == 0 {
        bail!("Nothing could be merged ({} source(s) failed)", failed.len());
    }

    let outcome = merger.finish();
    let output = save_with_fallback(&outcome.document, &output_dir, &config.output_stem)?;
    if text {
        println!("Saved {}", output.display());
    }

    let mut rendered = true;
    let mut pdf = None;
    if config.render {
        let pdf_path = output.with_extension("pdf");
        let chain = RenderChain::for_kind(cli.converter, &config.render_timeouts());
        match chain.render(&output, &pdf_path).await {
            Ok(used) => {
                log::info!("rendered with {used}");
                pdf = Some(pdf_path);
            }
            Err(e) => {
                eprintln!("PDF rendering failed: {e:#}");
                rendered = false;
            }
        }
    }

    let pdf_bytes = pdf
        .as_ref()
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len());
    let summary = Summary {
        converter: converter.to_string(),
        merged: outcome.sources.len(),
        failed,
        stats: body_stats(&outcome.document),
        sources: outcome.sources,
        skipped: outcome.report.skipped().to_vec(),
        output,
        pdf,
        pdf_bytes,
        extracted_media,
    };

    match cli.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Text => print_summary(&summary),
    }
    Ok(rendered)
}

/// Save to `<stem>.docx`, retrying once as `<stem>_autosaved.docx`.
fn save_with_fallback(document: &Document, dir: &Path, stem: &str) -> Result<PathBuf> {
    let primary = dir.join(format!("{stem}.docx"));
    let first = match document.save(&primary) {
        Ok(()) => return Ok(primary),
        Err(e) => e,
    };
    log::warn!("saving {} failed ({first}); retrying", primary.display());

    let fallback = dir.join(format!("{stem}_autosaved.docx"));
    document
        .save(&fallback)
        .with_context(|| format!("Save failed twice (first error: {first})"))?;
    eprintln!("Saved to fallback path {}", fallback.display());
    Ok(fallback)
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Merged:  {} source(s)", summary.merged);
    if !summary.failed.is_empty() {
        println!("Skipped: {} ({})", summary.failed.len(), summary.failed.join(", "));
    }
    println!(
        "Content: {} paragraph(s), {} table(s), {} image(s), {} page break(s)",
        summary.stats.paragraphs, summary.stats.tables, summary.stats.images, summary.stats.page_breaks
    );
    if !summary.skipped.is_empty() {
        println!("Copy skips recorded: {}", summary.skipped.len());
        for item in &summary.skipped {
            println!("  [{}] {} {}: {}", item.source, item.scope, item.item, item.reason);
        }
    }
    if summary.extracted_media > 0 {
        println!("Extracted {} media file(s)", summary.extracted_media);
    }
    match (&summary.pdf, summary.pdf_bytes) {
        (Some(pdf), Some(bytes)) => {
            println!("PDF: {} ({:.1} KB)", pdf.display(), bytes as f64 / 1024.0)
        }
        (Some(pdf), None) => println!("PDF: {}", pdf.display()),
        (None, _) => {}
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
