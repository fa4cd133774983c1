//! pointwarp - warp an image so chosen source points land on target points
//!
//! Control points come from the configuration file and from `--pair`
//! arguments. The warped image is written to `--output`; `--annotate`
//! additionally writes the input with the control points drawn on it.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pointwarp::config::Config;
use pointwarp::{ControlPair, WarpSession};

/// pointwarp - point-guided RBF image deformation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image
    #[arg(short, long)]
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "pointwarp.toml")]
    config: PathBuf,

    /// Control point pair as "sx,sy:tx,ty" (repeatable)
    #[arg(short, long = "pair")]
    pairs: Vec<ControlPair>,

    /// Kernel scale override
    #[arg(long)]
    kernel_scale: Option<f64>,

    /// Deformation strength override
    #[arg(long)]
    alpha: Option<f64>,

    /// Write the input with control points drawn on it
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Save the effective configuration back to the config file
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("pointwarp v{}", env!("CARGO_PKG_VERSION"));

    // Config file values, with CLI args as overrides
    let mut config = Config::load_or_default(&args.config)?;
    if let Some(scale) = args.kernel_scale {
        config.warp.kernel_scale = scale;
    }
    if let Some(alpha) = args.alpha {
        config.warp.alpha = alpha;
    }
    // Pairs from the config file, then the command line
    let mut points = config.point_store();
    for pair in &args.pairs {
        points.push_pair(*pair);
    }

    if args.write_config {
        config.points = points.pairs();
        config.save(&args.config)?;
    }

    let image = image::open(&args.input)
        .with_context(|| format!("Failed to open image {:?}", args.input))?
        .to_rgb8();
    info!(
        "Input: {:?} ({}x{})",
        args.input,
        image.width(),
        image.height()
    );

    let mut session = WarpSession::new(config.warp);
    session.load_image(image);
    *session.points_mut() = points;
    info!(
        "{} control pairs, kernel scale {}, alpha {}",
        session.points().len(),
        session.params().kernel_scale,
        session.params().alpha
    );

    if let Some(path) = &args.annotate {
        session
            .annotated()?
            .save(path)
            .with_context(|| format!("Failed to write annotated image {:?}", path))?;
        info!("Annotated points written to {:?}", path);
    }

    let start = Instant::now();
    let warped = session.run_warp().context("Warp failed")?;
    info!("Warped in {} ms", start.elapsed().as_millis());

    warped
        .save(&args.output)
        .with_context(|| format!("Failed to write output image {:?}", args.output))?;
    info!("Output written to {:?}", args.output);

    Ok(())
}
