//! Detect command
//!
//! Loads an image, runs the edge pipeline and writes the edge map.

use crate::DetectArgs;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, trace};
use vfx_edge::{Backend, EdgeConfig, EdgeDetector, EdgePolarity, Hysteresis, PixelFormat};

/// Default hysteresis pass count when only `--low-threshold` is given.
const DEFAULT_PASSES: u32 = 2;

pub fn run(args: DetectArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), output = %args.output.display(), "detect::run");

    let config = build_config(&args)?;
    let image = super::load_image(&args.input)?;

    let mut detector = EdgeDetector::from_config(&config)
        .with_context(|| format!("Failed to create {} backend", config.backend.name()))?;

    info!(
        backend = detector.backend_name(),
        w = image.width(),
        h = image.height(),
        blur_size = config.params.blur_size,
        threshold = config.params.threshold,
        "Detecting edges"
    );
    if verbose > 0 {
        println!(
            "Detecting edges in {} ({}x{}, {}) on {}",
            args.input.display(),
            image.width(),
            image.height(),
            super::format_size(image.size_bytes() as u64),
            detector.backend_name()
        );
    }

    let start = Instant::now();
    let edges = detector.detect(&image).context("Edge detection failed")?;
    let elapsed = start.elapsed();

    super::save_image(&args.output, &edges)?;

    if verbose > 0 {
        let count = edges.data().iter().filter(|&&v| v > 0.5).count();
        println!("Done in {:.1} ms, {} texels above 0.5.", elapsed.as_secs_f64() * 1000.0, count);
    }

    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(args: &DetectArgs) -> Result<EdgeConfig> {
    let mut config = match &args.config {
        Some(path) => EdgeConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EdgeConfig::default(),
    };

    if let Some(name) = &args.backend {
        config.backend = name.parse::<Backend>()?;
    }

    let params = &mut config.params;
    if let Some(v) = args.blur_size {
        params.blur_size = v;
    }
    if let Some(v) = args.threshold {
        params.threshold = v;
    }
    if let Some(v) = args.width_factor {
        params.image_width_factor = Some(v);
    }
    if let Some(v) = args.height_factor {
        params.image_height_factor = Some(v);
    }
    if let Some(low) = args.low_threshold {
        let passes = args.hysteresis_passes.unwrap_or(DEFAULT_PASSES);
        params.hysteresis = Some(Hysteresis::new(low, passes));
    }
    if args.dark {
        params.polarity = EdgePolarity::Dark;
    }
    if args.rgba {
        params.output_format = PixelFormat::Rgba;
    }

    params.validate().context("Invalid edge parameters")?;
    Ok(config)
}
