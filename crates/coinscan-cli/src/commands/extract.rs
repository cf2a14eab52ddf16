//! Extract command - read the balance from a single image.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use serde_json::json;
use tracing::debug;

use coinscan_core::money::{format_raw, raw_to_k};
use coinscan_core::{Extraction, ImageInput, load_image};

use super::{describe_source, load_config, native_extractor};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Image path, or an input record when --json is set
    #[arg(required = true)]
    input: String,

    /// Treat INPUT as a JSON document (a path string or an object with a path field)
    #[arg(long)]
    json: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Show every candidate that took part in the selection
    #[arg(long)]
    explain: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Write every preprocessing variant here as PNG
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON report
    Json,
    /// Human readable summary
    Text,
    /// Raw integer only
    Raw,
}

pub fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = args.model_dir.clone() {
        config.models.model_dir = dir;
    }
    if let Some(dir) = args.debug_dir.clone() {
        config.debug_dir = Some(dir);
    }

    let input = if args.json {
        serde_json::from_str::<ImageInput>(&args.input)
            .with_context(|| format!("Invalid input document: {}", args.input))?
    } else {
        ImageInput::from(args.input.as_str())
    };

    let image = load_image(&input)?;
    let extractor = native_extractor(&config)?;
    let report = extractor.extract_image(&image);
    debug!("Extraction finished in {}ms", report.processing_time_ms);

    match args.format {
        OutputFormat::Json => println!("{}", format_json(&report, args.explain)?),
        OutputFormat::Raw => match report.raw {
            Some(raw) => println!("{}", raw),
            None => println!("null"),
        },
        OutputFormat::Text => print_text(&report, args.explain),
    }

    Ok(())
}

fn format_json(report: &Extraction, explain: bool) -> anyhow::Result<String> {
    let mut value = json!({
        "raw": report.raw,
        "k": report.raw.map(raw_to_k),
        "display": format_raw(report.raw),
        "kind": report.kind,
        "source": report.source,
        "processing_time_ms": report.processing_time_ms,
    });

    if explain {
        value["candidates"] = serde_json::to_value(&report.candidates)?;
    }

    Ok(serde_json::to_string_pretty(&value)?)
}

fn print_text(report: &Extraction, explain: bool) {
    match report.raw {
        Some(raw) => println!(
            "{} Balance: {} ({}k, {})",
            style("✓").green(),
            raw,
            raw_to_k(raw),
            format_raw(Some(raw))
        ),
        None => println!("{} Balance: not found", style("✗").red()),
    }

    println!("  Image: {:?}", report.kind);
    if report.source.is_some() {
        println!("  Source: {}", describe_source(report.source.as_ref()));
    }
    println!("  Time: {}ms", report.processing_time_ms);

    if explain && !report.candidates.is_empty() {
        println!();
        println!("{}", style("Candidates:").bold());
        for candidate in &report.candidates {
            let position = candidate
                .normalized_position
                .map(|p| format!("{:.3}", p))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>12}  {:<14} pos {:>6}  {:?}",
                candidate.raw_value,
                format!("{:?}", candidate.rule),
                position,
                candidate.source
            );
        }
    }
}
