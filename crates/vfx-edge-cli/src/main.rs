//! vfx-edge - Canny-style edge maps from the command line

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "vfx-edge")]
#[command(author, version, about = "GPU edge detection for images")]
#[command(long_about = "
Computes a binary edge map: Gaussian blur, Sobel gradient with
non-maximum suppression, then thresholding.

Examples:
  vfx-edge backends                          # List execution backends
  vfx-edge detect in.png -o edges.png        # Defaults: blur 1.0, threshold 0.5
  vfx-edge detect in.jpg -o edges.png -t 0.2 -b 2.0 --dark
  vfx-edge detect in.png -o edges.png --low-threshold 0.1 --hysteresis-passes 3
  vfx-edge detect in.png -o edges.png --config edges.yaml --backend reference
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect edges in an image
    #[command(visible_alias = "d")]
    Detect(DetectArgs),

    /// Show available execution backends
    Backends,
}

/// Arguments for the `detect` command.
#[derive(Args)]
struct DetectArgs {
    /// Input image
    input: PathBuf,

    /// Output edge map (PNG recommended)
    #[arg(short, long)]
    output: PathBuf,

    /// YAML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend: wgpu or reference
    #[arg(long)]
    backend: Option<String>,

    /// Gaussian sigma in pixels (0 disables blur)
    #[arg(short = 'b', long)]
    blur_size: Option<f32>,

    /// Edge threshold in [0, 1]
    #[arg(short = 't', long)]
    threshold: Option<f32>,

    /// Horizontal sampling factor (default: image width)
    #[arg(long)]
    width_factor: Option<f32>,

    /// Vertical sampling factor (default: image height)
    #[arg(long)]
    height_factor: Option<f32>,

    /// Weak-edge threshold; enables bounded hysteresis
    #[arg(long)]
    low_threshold: Option<f32>,

    /// Hysteresis propagation passes (1-4, default 2)
    #[arg(long, requires = "low_threshold")]
    hysteresis_passes: Option<u32>,

    /// Black edges on white
    #[arg(long)]
    dark: bool,

    /// Write RGBA instead of grayscale
    #[arg(long)]
    rgba: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Detect(args) => commands::detect::run(args, cli.verbose),
        Commands::Backends => commands::backends::run(cli.verbose),
    }
}
