//! Overlay CLI
//!
//! Inspect a PDF or flatten a JSON list of text box annotations into it.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use overlay_core::{annotations_from_json, inspect, BlankRasterizer, DocumentSession};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "overlay-cli")]
#[command(version, about = "Flatten text box annotations into PDF documents")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count and page sizes
    Info {
        /// PDF to inspect
        #[arg(short, long)]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply annotations and write the flattened document
    Export {
        /// Source PDF
        #[arg(short, long)]
        input: PathBuf,

        /// JSON array of annotations
        #[arg(short, long)]
        annotations: PathBuf,

        /// Output path (default: <input>_annotated.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries command output, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Info { input, json } => run_info(&input, json),
        Command::Export {
            input,
            annotations,
            output,
        } => {
            let written = run_export(config, &input, &annotations, output)?;
            println!("{}", written.display());
            Ok(())
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn run_info(input: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let info = inspect(&file_name_of(input), &bytes)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} (PDF {})", info.name, info.version);
    println!("Pages: {}", info.page_count);
    for (index, (width, height)) in info.page_sizes.iter().enumerate() {
        println!("  {:>4}: {} x {} pt", index + 1, width, height);
    }
    Ok(())
}

fn run_export(
    config: Config,
    input: &Path,
    annotations: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    overlay_core::configure_rasterizer(config.rasterizer)?;
    let mut session = DocumentSession::new(config.editor, Arc::new(BlankRasterizer))?;

    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let info = session
        .load(&file_name_of(input), &bytes)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let json = fs::read_to_string(annotations)
        .with_context(|| format!("Failed to read {}", annotations.display()))?;
    let list = annotations_from_json(&json)
        .with_context(|| format!("Invalid annotation file {}", annotations.display()))?;
    let count = list.len();
    session.store_mut().replace_all(list);

    let exported = session.export().context("Export failed")?;
    let path = output_path(input, output, &exported.file_name);
    fs::write(&path, &exported.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        annotations = count,
        pages = info.page_count,
        output = %path.display(),
        "Wrote annotated document"
    );
    Ok(path)
}

/// Explicit output wins; otherwise the suggested name next to the input
fn output_path(input: &Path, output: Option<PathBuf>, suggested: &str) -> PathBuf {
    output.unwrap_or_else(|| input.with_file_name(suggested))
}
