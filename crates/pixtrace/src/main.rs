//! pixtrace: trace a raster image into a filled SVG from the command line.
//!
//! Decodes the input with the `image` crate, runs the tracing pipeline,
//! and writes the SVG document to a file or stdout. Progress and stage
//! counts are logged to stderr; set `RUST_LOG=debug` for per-stage detail.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixtrace -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logger;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use pixtrace_pipeline::{ClusteringMode, Hierarchy, PathMode, RawImage, VectorizeConfig};
use tracing::{debug, error, info};

/// Convert a raster image into filled SVG paths.
///
/// The image is segmented into color regions, each region's boundary is
/// traced, and the boundaries are emitted as polygons or smooth curves.
#[derive(Parser)]
#[command(name = "pixtrace", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Write the SVG to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the run summary as JSON on stderr.
    #[arg(long)]
    summary: bool,

    /// Path geometry.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_MODE)]
    mode: Mode,

    /// Segmentation strategy.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_CLUSTERING)]
    clustering: Clustering,

    /// Layering strategy for color segmentation.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_LAYERING)]
    hierarchical: Layering,

    /// Interior angle in degrees below which a vertex stays sharp.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_CORNER_THRESHOLD)]
    corner_threshold: f64,

    /// Maximum edge length in pixels before subdivision.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_LENGTH_THRESHOLD)]
    length_threshold: f64,

    /// Maximum number of subdivision passes.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// Angle in degrees below which a curve is split.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_SPLICE_THRESHOLD)]
    splice_threshold: f64,

    /// Drop regions smaller than this many pixels squared.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_FILTER_SPECKLE)]
    filter_speckle: u32,

    /// Significant bits kept per color channel (1-8).
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_COLOR_PRECISION)]
    color_precision: u32,

    /// Maximum per-channel difference from a region's seed color.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_LAYER_DIFFERENCE)]
    layer_difference: u32,

    /// Decimal places in path coordinates.
    #[arg(long, default_value_t = VectorizeConfig::DEFAULT_PATH_PRECISION)]
    path_precision: u32,

    /// Full configuration as a JSON string.
    ///
    /// When provided, all other configuration flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Path geometry selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Raw pixel-edge outlines.
    None,
    /// Simplified straight-edged outlines.
    Polygon,
    /// Smoothed cubic curves.
    Spline,
}

/// Segmentation strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Clustering {
    /// Dark opaque pixels on transparent or light paper.
    Binary,
    /// Region growing by color similarity.
    Color,
}

/// Layering strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Layering {
    /// Larger regions underneath smaller ones.
    Stacked,
    /// Disjoint regions with no overlap.
    Cutout,
}

const fn mode_from_pipeline(mode: PathMode) -> Mode {
    match mode {
        PathMode::None => Mode::None,
        PathMode::Polygon => Mode::Polygon,
        PathMode::Spline => Mode::Spline,
    }
}

const fn clustering_from_pipeline(mode: ClusteringMode) -> Clustering {
    match mode {
        ClusteringMode::Binary => Clustering::Binary,
        ClusteringMode::Color => Clustering::Color,
    }
}

const fn layering_from_pipeline(hierarchy: Hierarchy) -> Layering {
    match hierarchy {
        Hierarchy::Stacked => Layering::Stacked,
        Hierarchy::Cutout => Layering::Cutout,
    }
}

// CLI defaults derived from the pipeline constants so the two cannot
// silently diverge.
const CLI_DEFAULT_MODE: Mode = mode_from_pipeline(VectorizeConfig::DEFAULT_MODE);
const CLI_DEFAULT_CLUSTERING: Clustering =
    clustering_from_pipeline(VectorizeConfig::DEFAULT_CLUSTERING_MODE);
const CLI_DEFAULT_LAYERING: Layering =
    layering_from_pipeline(VectorizeConfig::DEFAULT_HIERARCHICAL);

/// Build a [`VectorizeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. The result is validated
/// either way.
fn config_from_cli(cli: &Cli) -> Result<VectorizeConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("error parsing --config-json: {e}"))?
    } else {
        VectorizeConfig {
            mode: match cli.mode {
                Mode::None => PathMode::None,
                Mode::Polygon => PathMode::Polygon,
                Mode::Spline => PathMode::Spline,
            },
            clustering_mode: match cli.clustering {
                Clustering::Binary => ClusteringMode::Binary,
                Clustering::Color => ClusteringMode::Color,
            },
            hierarchical: match cli.hierarchical {
                Layering::Stacked => Hierarchy::Stacked,
                Layering::Cutout => Hierarchy::Cutout,
            },
            corner_threshold: cli.corner_threshold,
            length_threshold: cli.length_threshold,
            max_iterations: cli.max_iterations,
            splice_threshold: cli.splice_threshold,
            filter_speckle: cli.filter_speckle,
            color_precision: cli.color_precision,
            layer_difference: cli.layer_difference,
            path_precision: cli.path_precision,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    debug!(?config, "configuration");

    let image = match image::open(&cli.image_path) {
        Ok(decoded) => RawImage::from(decoded.to_rgba8()),
        Err(e) => {
            error!("error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        path = %cli.image_path.display(),
        width = image.width(),
        height = image.height(),
        "image decoded"
    );

    let started = Instant::now();
    let mut last_logged = 0_u8;
    let traced = pixtrace_pipeline::process_with_progress(&image, &config, |progress| {
        // Log each tenth once; per-cluster updates are debug noise.
        if progress / 10 > last_logged / 10 {
            info!(progress, "tracing");
            last_logged = progress;
        } else {
            debug!(progress, "tracing");
        }
    });
    info!(
        paths = traced.paths.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "trace complete"
    );

    if cli.summary {
        match serde_json::to_string_pretty(&traced.summary) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => {
                error!("error serializing summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let svg = pixtrace_export::to_svg(&traced);
    match cli.output {
        Some(ref path) => {
            if let Err(e) = std::fs::write(path, &svg) {
                error!("error writing SVG to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            info!(path = %path.display(), bytes = svg.len(), "SVG written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{svg}") {
                error!("error writing SVG to stdout: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
