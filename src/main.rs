// STR EXTRACT - batch extraction of STR application PDFs to CSV or JSON
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use str_extract::batch::{collect_pdf_paths, BatchProcessor, ProgressStatus};
use str_extract::export::{CsvExporter, ExportMode};
use str_extract::extraction::RowProjector;
use str_extract::{ExtractionConfig, StrExtractor};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// PDF files or directories of PDFs
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Row shape of the export
    #[arg(short, long, value_enum, default_value_t = ExportMode::Everything)]
    mode: ExportMode,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the structured records as JSON instead of CSV
    #[arg(long)]
    json: bool,

    /// Force ID, phone and postal-code columns to text in spreadsheets
    #[arg(long)]
    excel_text: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the three template JSON files
    #[arg(long)]
    template_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ExtractionConfig> {
    let mut config = match &args.config {
        Some(path) => ExtractionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractionConfig::from_env().context("Failed to load config from environment")?,
    };
    if let Some(dir) = &args.template_dir {
        config.template_dir = Some(dir.clone());
    }
    Ok(config)
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("str_extract=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let projector = RowProjector::new(config.max_children);

    let extractor = StrExtractor::from_config(config);
    extractor.registry().preload().context("Failed to load templates")?;

    let paths = collect_pdf_paths(&args.inputs).context("Failed to collect input files")?;
    if paths.is_empty() {
        bail!("No PDF files found in the given inputs");
    }
    info!("Processing {} file(s)", paths.len());

    let processor = BatchProcessor::new(Arc::new(extractor));
    let result = processor
        .process(&paths, |event| match event.status {
            ProgressStatus::Error => warn!("[{}/{}] {}", event.current, event.total, event.message),
            _ => info!("[{}/{}] {}", event.current, event.total, event.message),
        })
        .await;

    let mut out = open_output(args.output.as_ref())?;
    if args.json {
        serde_json::to_writer_pretty(&mut out, &result).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        CsvExporter::new(args.mode, args.excel_text)
            .write(&result.records, &projector, &mut out)
            .context("Failed to write CSV")?;
    }
    out.flush()?;

    for failed in &result.failed {
        eprintln!("FAILED {}: {}", failed.filename, failed.error);
    }
    if result.records.is_empty() {
        bail!("All {} file(s) failed to extract", result.failed.len());
    }
    Ok(())
}
