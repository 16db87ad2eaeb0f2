//! smearscan - analyze a blood-smear image and show the detections.
//!
//! Runs one upload-then-detect analysis, prints the results view (with a
//! demo-data notice whenever the result is synthetic), and optionally
//! selects a detection, resolves a tap, or writes an annotated copy of the
//! image.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use smearscan::report;
use smearscan::ui::{Ui, UiMode};
use smearscan::{Analyzer, ImageAsset, ResultsSession, ScreeningConfig, ScreenState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Screen a blood-smear image for malaria parasites")]
struct Args {
    /// Image to analyze (JPEG as captured).
    image: PathBuf,

    /// Select a detection by id instead of the first one.
    #[arg(long, value_name = "ID", conflicts_with = "tap")]
    select: Option<String>,

    /// Select the detection under an image-space point, e.g. `120,84`.
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    tap: Option<(f64, f64)>,

    /// Write a copy of the image with detection boxes drawn on it.
    #[arg(long, value_name = "PATH")]
    annotate: Option<PathBuf>,

    /// Print the analysis result as JSON instead of the results view.
    #[arg(long)]
    json: bool,

    /// Report a failure instead of substituting synthetic detections.
    #[arg(long, env = "SMEARSCAN_NO_FALLBACK")]
    no_fallback: bool,

    /// Seed for reproducible synthetic detections.
    #[arg(long, env = "SMEARSCAN_FALLBACK_SEED")]
    seed: Option<u64>,

    /// UI mode for stderr progress.
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::new(
        args.ui,
        std::io::stderr().is_terminal(),
        !std::io::stdout().is_terminal(),
    );

    let mut cfg = ScreeningConfig::load()?;
    if args.no_fallback {
        cfg.fallback.synthetic = false;
    }
    if args.seed.is_some() {
        cfg.fallback.seed = args.seed;
    }
    if !cfg.live_inference_configured() {
        log::warn!("live inference credentials are incomplete; analysis will fall back");
    }

    let image = ImageAsset::from_path(&args.image)?;
    let mut analyzer = Analyzer::from_config(&cfg);
    let mut session = ResultsSession::new();

    let ticket = session.submit(&image);
    let result = {
        let mut progress = ui.analysis();
        analyzer.analyze_observed(&image, &mut progress)
    };
    log::info!(
        "{} detection(s), {}",
        result.detections.len(),
        if result.origin.is_live() {
            "live"
        } else {
            "fallback"
        }
    );
    session.settle(&ticket, result);

    if let ScreenState::Failed(message) = session.state() {
        if args.json {
            println!("{}", report::to_json(&session)?);
        } else {
            print!("{}", report::render(&session));
        }
        return Err(anyhow!("{}", message));
    }

    if let Some(id) = args.select.as_deref() {
        session.select(id)?;
    }
    if let Some((x, y)) = args.tap {
        if session.tap(x, y).is_none() {
            log::warn!("no detection at ({}, {}); selection unchanged", x, y);
        }
    }

    if let Some(path) = args.annotate.as_deref() {
        let stage = ui.stage("Writing annotated image");
        let mut canvas = image.decode_rgb()?;
        session.overlay().draw(&mut canvas);
        canvas
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        stage.finish(path.display().to_string());
    }

    if args.json {
        println!("{}", report::to_json(&session)?);
    } else {
        print!("{}", report::render(&session));
    }
    Ok(())
}

fn parse_point(value: &str) -> Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| format!("invalid x coordinate '{}'", x))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| format!("invalid y coordinate '{}'", y))?;
    Ok((x, y))
}
