//! Shared types for the pixtrace tracing pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `Rgb` so downstream crates can read cluster and fill colors
/// without depending on `image` directly.
pub use image::Rgb;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Point halfway between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<GridPoint> for Point {
    fn from(p: GridPoint) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// A sequence of connected points forming a path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }
}

/// A pixel-corner lattice coordinate.
///
/// Boundaries run along the grid between pixels, so `x` ranges over
/// `0..=width` and `y` over `0..=height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: u32,
    pub y: u32,
}

impl GridPoint {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One traced boundary loop on the pixel-corner lattice.
///
/// A properly closed loop repeats its first point at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<GridPoint>);

impl Contour {
    #[must_use]
    pub const fn new(points: Vec<GridPoint>) -> Self {
        Self(points)
    }

    #[must_use]
    pub fn points(&self) -> &[GridPoint] {
        &self.0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// How traced boundaries are turned into path geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Raw pixel staircase outlines.
    None,
    /// Douglas-Peucker simplified polygons.
    Polygon,
    /// Smoothed cubic Bezier curves.
    #[default]
    Spline,
}

/// How the image is segmented into regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMode {
    /// Dark opaque pixels become black ink, everything else is background.
    Binary,
    /// Region growing over quantized colors.
    #[default]
    Color,
}

/// How overlapping regions are layered in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hierarchy {
    /// Shapes are painted largest first so small shapes land on top.
    #[default]
    Stacked,
    /// Shapes are re-segmented into disjoint exact-color regions.
    Cutout,
}

/// Configuration for the tracing pipeline.
///
/// The pipeline itself never clamps these values. Callers that accept
/// untrusted settings should run [`validate`](Self::validate) first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeConfig {
    /// Path geometry mode.
    pub mode: PathMode,

    /// Segmentation strategy.
    pub clustering_mode: ClusteringMode,

    /// Layering strategy.
    pub hierarchical: Hierarchy,

    /// Vertices with an interior angle below this many degrees are kept
    /// sharp during spline smoothing.
    pub corner_threshold: f64,

    /// Maximum edge length in pixels before spline subdivision inserts a
    /// midpoint. Also scales the simplification tolerance.
    pub length_threshold: f64,

    /// Upper bound on subdivision passes.
    pub max_iterations: u32,

    /// Vertices with an angle below this many degrees split a spline loop
    /// into separate curve chains.
    pub splice_threshold: f64,

    /// Regions with fewer than `filter_speckle²` pixels are dropped.
    pub filter_speckle: u32,

    /// Significant bits kept per color channel (1 to 8).
    pub color_precision: u32,

    /// Maximum Chebyshev distance from a region's seed color for a pixel
    /// to join the region.
    pub layer_difference: u32,

    /// Decimal digits kept in path coordinates.
    pub path_precision: u32,
}

impl VectorizeConfig {
    /// Default path geometry mode.
    pub const DEFAULT_MODE: PathMode = PathMode::Spline;
    /// Default segmentation strategy.
    pub const DEFAULT_CLUSTERING_MODE: ClusteringMode = ClusteringMode::Color;
    /// Default layering strategy.
    pub const DEFAULT_HIERARCHICAL: Hierarchy = Hierarchy::Stacked;
    /// Default corner threshold in degrees.
    pub const DEFAULT_CORNER_THRESHOLD: f64 = 60.0;
    /// Default subdivision length threshold in pixels.
    pub const DEFAULT_LENGTH_THRESHOLD: f64 = 4.0;
    /// Default number of subdivision passes.
    pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
    /// Default splice threshold in degrees.
    pub const DEFAULT_SPLICE_THRESHOLD: f64 = 45.0;
    /// Default speckle filter side length in pixels.
    pub const DEFAULT_FILTER_SPECKLE: u32 = 4;
    /// Default bits kept per color channel.
    pub const DEFAULT_COLOR_PRECISION: u32 = 6;
    /// Default layer difference.
    pub const DEFAULT_LAYER_DIFFERENCE: u32 = 16;
    /// Default path coordinate precision.
    pub const DEFAULT_PATH_PRECISION: u32 = 8;

    /// Number of low bits masked off each color channel before
    /// clustering.
    #[must_use]
    pub const fn precision_loss(&self) -> u32 {
        8_u32.saturating_sub(self.color_precision)
    }

    /// Minimum region area that survives the speckle filter.
    #[must_use]
    pub fn speckle_area(&self) -> u64 {
        u64::from(self.filter_speckle) * u64::from(self.filter_speckle)
    }

    /// Douglas-Peucker tolerance derived from the length threshold.
    #[must_use]
    pub fn simplify_tolerance(&self) -> f64 {
        (self.length_threshold / 6.0).max(0.5)
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let angle_ok = |v: f64| (0.0..=180.0).contains(&v);
        if !angle_ok(self.corner_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "corner_threshold must be within 0..=180, got {}",
                self.corner_threshold
            )));
        }
        if !angle_ok(self.splice_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "splice_threshold must be within 0..=180, got {}",
                self.splice_threshold
            )));
        }
        if !(self.length_threshold.is_finite() && self.length_threshold > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "length_threshold must be a positive number, got {}",
                self.length_threshold
            )));
        }
        if !(1..=8).contains(&self.color_precision) {
            return Err(PipelineError::InvalidConfig(format!(
                "color_precision must be within 1..=8, got {}",
                self.color_precision
            )));
        }
        if self.layer_difference > 128 {
            return Err(PipelineError::InvalidConfig(format!(
                "layer_difference must be within 0..=128, got {}",
                self.layer_difference
            )));
        }
        if self.path_precision > 16 {
            return Err(PipelineError::InvalidConfig(format!(
                "path_precision must be within 0..=16, got {}",
                self.path_precision
            )));
        }
        Ok(())
    }
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            mode: Self::DEFAULT_MODE,
            clustering_mode: Self::DEFAULT_CLUSTERING_MODE,
            hierarchical: Self::DEFAULT_HIERARCHICAL,
            corner_threshold: Self::DEFAULT_CORNER_THRESHOLD,
            length_threshold: Self::DEFAULT_LENGTH_THRESHOLD,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            splice_threshold: Self::DEFAULT_SPLICE_THRESHOLD,
            filter_speckle: Self::DEFAULT_FILTER_SPECKLE,
            color_precision: Self::DEFAULT_COLOR_PRECISION,
            layer_difference: Self::DEFAULT_LAYER_DIFFERENCE,
            path_precision: Self::DEFAULT_PATH_PRECISION,
        }
    }
}

/// Path data for one region, ready to be emitted as a filled shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledPath {
    /// SVG path `d` attribute: every loop of the region, space separated.
    pub data: String,
    /// Mean color of the region.
    pub fill: Rgb<u8>,
}

/// Counts collected while tracing, for logging and the CLI report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// Regions produced by segmentation.
    pub clusters_found: usize,
    /// Regions that survived the speckle filter.
    pub clusters_kept: usize,
    /// Regions that produced path data.
    pub clusters_drawn: usize,
    /// Boundary loops traced across all kept regions.
    pub loops_traced: usize,
    /// Synthetic backdrop color substituted for transparent pixels.
    pub key_color: Option<[u8; 3]>,
}

/// Result of running the full tracing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedImage {
    /// Dimensions of the source image in pixels.
    ///
    /// The SVG assembler uses these for the document size and `viewBox`.
    pub dimensions: Dimensions,
    /// Filled regions in paint order.
    pub paths: Vec<FilledPath>,
    /// Stage counts.
    pub summary: ProcessSummary,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The pixel buffer does not hold exactly `width * height` RGBA pixels.
    #[error("pixel buffer has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
