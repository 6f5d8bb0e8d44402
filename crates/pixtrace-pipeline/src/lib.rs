//! pixtrace-pipeline: Pure raster-to-vector pipeline (sans-IO).
//!
//! Converts an RGBA pixel buffer into filled vector paths through:
//! color keying -> clustering -> optional cutout rebuild ->
//! speckle filtering and draw order -> contour tracing ->
//! path refinement -> curve rendering.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. SVG serialization lives in
//! `pixtrace-export`; decoding and job handling live in the front ends.

pub mod cluster;
pub mod contour;
pub mod curve;
pub mod cutout;
pub mod keying;
pub mod raster;
pub mod refine;
pub mod simplify;
pub mod types;

use tracing::{debug, trace};

pub use cluster::{ClusterInfo, Connectivity, LabeledImage};
pub use raster::RawImage;
pub use refine::{Refined, RefineSettings};
pub use types::{
    ClusteringMode, Contour, Dimensions, FilledPath, GridPoint, Hierarchy, PathMode,
    PipelineError, Point, Polyline, ProcessSummary, TracedImage, VectorizeConfig,
};

/// Progress reported once the input has been keyed.
pub const PROGRESS_KEYED: u8 = 5;
/// Progress reported once segmentation and ordering are done.
pub const PROGRESS_SEGMENTED: u8 = 40;
/// Progress reported when the run is complete.
pub const PROGRESS_DONE: u8 = 100;

/// Run the full pipeline.
///
/// See [`process_with_progress`].
#[must_use]
pub fn process(image: &RawImage, config: &VectorizeConfig) -> TracedImage {
    process_with_progress(image, config, |_| {})
}

/// Run the full pipeline, reporting progress percentages to `on_progress`.
///
/// # Pipeline steps
///
/// 1. Color keying of mostly transparent images (color mode only)
/// 2. Binary or color clustering
/// 3. Optional cutout rebuild (color mode only)
/// 4. Speckle filtering and draw ordering
/// 5. Per cluster: contour tracing, refinement, and rendering
///
/// Progress is reported as [`PROGRESS_KEYED`] after step 1,
/// [`PROGRESS_SEGMENTED`] after step 4, `50 + round(50 * (i + 1) / n)`
/// after each of the `n` clusters, and [`PROGRESS_DONE`] at the end.
///
/// The configuration is used as given; call
/// [`VectorizeConfig::validate`] first to reject out-of-range values.
pub fn process_with_progress(
    image: &RawImage,
    config: &VectorizeConfig,
    mut on_progress: impl FnMut(u8),
) -> TracedImage {
    let dimensions = image.dimensions();
    let mut summary = ProcessSummary::default();

    // 1-3. Keying and segmentation.
    let labeled = match config.clustering_mode {
        ClusteringMode::Binary => {
            on_progress(PROGRESS_KEYED);
            cluster::cluster_binary(image)
        }
        ClusteringMode::Color => {
            let key = if keying::should_key(image) {
                keying::find_unused_key_color(image)
            } else {
                None
            };
            summary.key_color = key.map(|k| k.0);
            let keyed = keying::apply_key_color(image, key);
            on_progress(PROGRESS_KEYED);

            let ignore = key.map(|k| raster::quantize(k, config.precision_loss()));
            let options = cluster::ColorClusterOptions::for_config(config, ignore);
            let labeled = cluster::cluster_color(&keyed, &options);
            match config.hierarchical {
                Hierarchy::Stacked => labeled,
                Hierarchy::Cutout => cutout::rebuild(&labeled, key),
            }
        }
    };
    summary.clusters_found = labeled.clusters().len();

    // 4. Filtering and draw order.
    let order = draw_order(&labeled, config);
    summary.clusters_kept = order.len();
    debug!(
        found = summary.clusters_found,
        kept = summary.clusters_kept,
        key = ?summary.key_color,
        "segmentation complete"
    );
    on_progress(PROGRESS_SEGMENTED);

    // 5. Per-cluster tracing.
    let settings = RefineSettings::from(config);
    let total = order.len().max(1);
    let mut paths = Vec::new();
    for (index, cluster) in order.iter().enumerate() {
        let contours = contour::trace_cluster(&labeled, cluster.id);
        summary.loops_traced += contours.len();

        let data: Vec<String> = contours
            .iter()
            .filter_map(|c| refine::refine_contour(c, &settings))
            .map(|refined| curve::render(&refined, config.path_precision))
            .filter(|d| !d.is_empty())
            .collect();
        trace!(
            cluster = cluster.id,
            area = cluster.area,
            loops = contours.len(),
            drawn = data.len(),
            "rendered cluster"
        );
        if !data.is_empty() {
            paths.push(FilledPath {
                data: data.join(" "),
                fill: cluster.color,
            });
        }

        on_progress(cluster_progress(index, total));
    }
    summary.clusters_drawn = paths.len();
    debug!(
        paths = paths.len(),
        loops = summary.loops_traced,
        "tracing complete"
    );
    on_progress(PROGRESS_DONE);

    TracedImage {
        dimensions,
        paths,
        summary,
    }
}

/// Clusters that survive the speckle filter, in draw order.
///
/// Cutout runs keep every cluster. Stacked color runs draw the largest
/// regions first so smaller ones land on top; everything else draws in
/// id order.
fn draw_order<'a>(labeled: &'a LabeledImage, config: &VectorizeConfig) -> Vec<&'a ClusterInfo> {
    let min_area = config.speckle_area();
    let mut kept: Vec<&ClusterInfo> = labeled
        .clusters()
        .iter()
        .filter(|c| {
            config.hierarchical == Hierarchy::Cutout
                || u64::try_from(c.area).unwrap_or(u64::MAX) >= min_area
        })
        .collect();

    let by_area = config.clustering_mode == ClusteringMode::Color
        && config.hierarchical == Hierarchy::Stacked;
    if by_area {
        kept.sort_by(|a, b| b.area.cmp(&a.area));
    }
    kept
}

/// Progress after tracing cluster `index` of `total`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn cluster_progress(index: usize, total: usize) -> u8 {
    let fraction = (index + 1) as f64 / total as f64;
    (50.0 + (50.0 * fraction).round()) as u8
}
