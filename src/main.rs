//! LottoScanner replay tool
//!
//! Runs recorded OCR frames through the ticket pipeline and prints what the
//! overlay would show for each frame.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lotto_scanner::config::{self, AppConfig};
use lotto_scanner::{BlockResult, FramePipeline, OcrFrame, ReferenceSet, SegmentationStrategy};

/// LottoScanner - replay recorded OCR frames against a set of numbers
#[derive(Parser, Debug)]
#[command(name = "lotto-scanner")]
#[command(about = "Check lottery ticket OCR frames against 15 chosen numbers")]
struct Args {
    /// JSON file with one recorded frame or an array of frames
    frames: PathBuf,

    /// The 15 numbers to check, separated by commas or spaces
    #[arg(short, long)]
    numbers: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the segmentation policy
    #[arg(long, value_parser = ["gap", "midpoint", "half"])]
    strategy: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameFile {
    Many(Vec<OcrFrame>),
    One(OcrFrame),
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame: usize,
    fragments: usize,
    candidates: usize,
    blocks: &'a [BlockResult],
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_or_create_config(args.config.as_deref())?;
    if let Some(strategy) = &args.strategy {
        config.pipeline.segmenter.strategy = match strategy.as_str() {
            "midpoint" => SegmentationStrategy::MidpointRange,
            "half" => SegmentationStrategy::FixedFraction { fraction: 0.5 },
            _ => SegmentationStrategy::GapBased,
        };
    }
    config.validate().context("Invalid configuration")?;

    let reference = resolve_reference(args.numbers.as_deref(), &config)?;
    info!("Checking against: {}", reference);

    let frames = load_frames(&args.frames)?;
    info!("Loaded {} frames from {:?}", frames.len(), args.frames);

    let pipeline = FramePipeline::with_config(config.pipeline.clone())?;
    let mut outputs = Vec::with_capacity(frames.len());

    for (index, frame) in frames.iter().enumerate() {
        let analysis = pipeline.analyze_frame(frame, &reference);
        if analysis.processing_time.as_millis() > config.scan_loop.slow_frame_warn_ms as u128 {
            warn!("Frame {} took {:?}", index + 1, analysis.processing_time);
        }
        outputs.push((index + 1, analysis));
    }

    if args.json {
        let rendered: Vec<FrameOutput> = outputs
            .iter()
            .map(|(frame, analysis)| FrameOutput {
                frame: *frame,
                fragments: analysis.fragment_count,
                candidates: analysis.candidate_count,
                blocks: &analysis.blocks,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    for (frame, analysis) in &outputs {
        println!(
            "Frame {}: {} fragments, {} candidates",
            frame, analysis.fragment_count, analysis.candidate_count
        );
        if analysis.blocks.is_empty() {
            println!("  no ticket blocks detected");
        }
        for block in &analysis.blocks {
            println!("  {}  numbers {:?}", block, block.numbers);
        }
    }

    Ok(())
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_path) = config::default_config_path() {
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return Ok(config);
                }
                Err(e) => warn!("Ignoring unreadable configuration {:?}: {}", config_path, e),
            }
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}

/// Numbers from the command line win over the config file
fn resolve_reference(numbers: Option<&str>, config: &AppConfig) -> Result<ReferenceSet> {
    if let Some(numbers) = numbers {
        return ReferenceSet::parse(numbers).context("Invalid --numbers");
    }
    match config.reference_set()? {
        Some(reference) => Ok(reference),
        None => bail!("No reference numbers: pass --numbers or set reference_numbers in the config"),
    }
}

fn load_frames(path: &Path) -> Result<Vec<OcrFrame>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames from {:?}", path))?;
    let file: FrameFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse frames in {:?}", path))?;
    Ok(match file {
        FrameFile::Many(frames) => frames,
        FrameFile::One(frame) => vec![frame],
    })
}
