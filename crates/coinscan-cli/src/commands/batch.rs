//! Batch command - extract balances from many images.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use coinscan_core::money::{format_raw, raw_to_k};
use coinscan_core::{Extraction, ImageInput, load_image};

use super::{describe_source, load_config, native_extractor};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "webp", "tiff"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input images
    #[arg(required = true)]
    input: String,

    /// Write a CSV summary to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Outcome for a single file.
struct FileResult {
    path: PathBuf,
    report: Option<Extraction>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = args.model_dir.clone() {
        config.models.model_dir = dir;
    }

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching images found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} images to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    // One extractor, so the models load once for the whole batch
    let extractor = native_extractor(&config)?;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let file_start = Instant::now();

        match load_image(&ImageInput::from(path.as_path())) {
            Ok(image) => {
                let report = extractor.extract_image(&image);
                debug!("{}: {:?}", path.display(), report.raw);
                results.push(FileResult {
                    path,
                    report: Some(report),
                    error: None,
                    processing_time_ms: file_start.elapsed().as_millis() as u64,
                });
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to load {}: {}", path.display(), e);
                results.push(FileResult {
                    path,
                    report: None,
                    error: Some(e.to_string()),
                    processing_time_ms: file_start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                pb.abandon();
                error!("Failed to load {}: {}", path.display(), e);
                anyhow::bail!("Processing failed: {}", e);
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("done");

    if let Some(output) = &args.output {
        write_summary(output, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            output.display()
        );
    } else {
        for result in &results {
            println!("{}  {}", result.path.display(), display_value(result));
        }
    }

    let found = results
        .iter()
        .filter(|r| r.report.as_ref().is_some_and(|rep| rep.raw.is_some()))
        .count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();

    println!();
    println!(
        "{} Processed {} images in {:?}: {} read, {} not found, {} failed",
        style("✓").green(),
        results.len(),
        start.elapsed(),
        found,
        results.len() - found - failed,
        failed
    );

    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn display_value(result: &FileResult) -> String {
    match (&result.report, &result.error) {
        (_, Some(error)) => format!("{} {}", style("error:").red(), error),
        (Some(report), None) => format_raw(report.raw),
        (None, None) => "-".to_string(),
    }
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["path", "raw", "k", "display", "source", "time_ms", "error"])?;

    for result in results {
        let path = result.path.display().to_string();
        let time_ms = result.processing_time_ms.to_string();
        let raw = result.report.as_ref().and_then(|r| r.raw);

        wtr.write_record([
            path.as_str(),
            &raw.map(|r| r.to_string()).unwrap_or_default(),
            &raw.map(|r| raw_to_k(r).to_string()).unwrap_or_default(),
            &format_raw(raw),
            &describe_source(result.report.as_ref().and_then(|r| r.source.as_ref())),
            time_ms.as_str(),
            result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
