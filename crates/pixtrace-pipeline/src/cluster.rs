//! Region segmentation: split an image into labeled clusters.
//!
//! Two strategies are available:
//!
//! - [`cluster_binary`] treats dark opaque pixels as ink and labels each
//!   4-connected ink component.
//! - [`cluster_color`] grows regions over quantized colors, admitting a
//!   neighbor when its color is within `layer_difference` (Chebyshev) of
//!   the region's seed color.
//!
//! Both scan seeds in raster order, so cluster ids are dense and assigned
//! by the position of each cluster's first pixel. Flood fill uses a LIFO
//! working list; traversal order does not change the resulting partition.

use image::Rgb;
use tracing::debug;

use crate::raster::{RawImage, color_distance, quantize, rgb_of};
use crate::types::{Dimensions, VectorizeConfig};

/// Red channel values below this count as ink in binary mode.
pub const BINARY_THRESHOLD: u8 = 128;

/// Pixel neighborhood used while growing a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Left, right, up, down.
    Four,
    /// The four edge neighbors plus the four diagonals.
    Eight,
}

const OFFSETS_C8: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Self::Four => &OFFSETS_C8[..4],
            Self::Eight => &OFFSETS_C8,
        }
    }
}

/// Summary of one segmented region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Dense 0-based id, equal to the cluster's index in
    /// [`LabeledImage::clusters`].
    pub id: u32,
    /// Rounded mean of the member pixels' quantized colors.
    pub color: Rgb<u8>,
    /// Number of member pixels (at least 1).
    pub area: usize,
}

/// Per-pixel cluster labels plus the cluster table.
///
/// For every id `L`, exactly `clusters()[L].area` pixels carry label
/// `Some(L)`. Unlabeled pixels (background, transparent, or keyed out)
/// carry `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImage {
    width: u32,
    height: u32,
    labels: Vec<Option<u32>>,
    clusters: Vec<ClusterInfo>,
}

impl LabeledImage {
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Row-major label buffer.
    #[must_use]
    pub fn labels(&self) -> &[Option<u32>] {
        &self.labels
    }

    /// Label of the pixel at `(x, y)`, or `None` when the coordinate is
    /// off-grid or the pixel is unlabeled.
    #[must_use]
    pub fn label(&self, x: i64, y: i64) -> Option<u32> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = y as usize * self.width as usize + x as usize;
        self.labels[index]
    }

    /// Clusters ordered by id.
    #[must_use]
    pub fn clusters(&self) -> &[ClusterInfo] {
        &self.clusters
    }

    /// Number of pixels that belong to some cluster.
    #[must_use]
    pub fn labeled_pixel_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }
}

/// Flood-fill state shared by both clustering strategies.
struct RegionGrower {
    width: usize,
    height: usize,
    labels: Vec<Option<u32>>,
    clusters: Vec<ClusterInfo>,
    stack: Vec<usize>,
}

impl RegionGrower {
    fn new(width: u32, height: u32) -> Self {
        let width = width as usize;
        let height = height as usize;
        Self {
            width,
            height,
            labels: vec![None; width * height],
            clusters: Vec::new(),
            stack: Vec::new(),
        }
    }

    const fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    fn is_labeled(&self, index: usize) -> bool {
        self.labels[index].is_some()
    }

    // The cluster count never exceeds the pixel count.
    #[allow(clippy::cast_possible_truncation)]
    const fn next_id(&self) -> u32 {
        self.clusters.len() as u32
    }

    /// Label every pixel reachable from `seed` through neighbors accepted
    /// by `joins`, calling `visit` once per member. Returns the area.
    fn grow(
        &mut self,
        seed: usize,
        id: u32,
        connectivity: Connectivity,
        mut joins: impl FnMut(usize) -> bool,
        mut visit: impl FnMut(usize),
    ) -> usize {
        self.labels[seed] = Some(id);
        self.stack.clear();
        self.stack.push(seed);
        let mut area = 0;

        while let Some(current) = self.stack.pop() {
            area += 1;
            visit(current);

            let cx = current % self.width;
            let cy = current / self.width;
            for &(dx, dy) in connectivity.offsets() {
                let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                else {
                    continue;
                };
                if nx >= self.width || ny >= self.height {
                    continue;
                }
                let neighbor = ny * self.width + nx;
                if self.labels[neighbor].is_some() || !joins(neighbor) {
                    continue;
                }
                self.labels[neighbor] = Some(id);
                self.stack.push(neighbor);
            }
        }

        area
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(self) -> LabeledImage {
        LabeledImage {
            width: self.width as u32,
            height: self.height as u32,
            labels: self.labels,
            clusters: self.clusters,
        }
    }
}

/// Label 4-connected components of ink pixels.
///
/// A pixel is ink when it has any opacity and its red channel is below
/// [`BINARY_THRESHOLD`]. Every cluster is colored black.
#[must_use]
pub fn cluster_binary(image: &RawImage) -> LabeledImage {
    let ink: Vec<bool> = image
        .pixels()
        .map(|p| p.0[3] != 0 && p.0[0] < BINARY_THRESHOLD)
        .collect();

    let mut grower = RegionGrower::new(image.width(), image.height());
    for seed in 0..grower.pixel_count() {
        if grower.is_labeled(seed) || !ink[seed] {
            continue;
        }
        let id = grower.next_id();
        let area = grower.grow(seed, id, Connectivity::Four, |i| ink[i], |_| {});
        grower.clusters.push(ClusterInfo {
            id,
            color: Rgb([0, 0, 0]),
            area,
        });
    }

    let labeled = grower.finish();
    debug!(clusters = labeled.clusters.len(), "binary clustering complete");
    labeled
}

/// Parameters for [`cluster_color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorClusterOptions {
    /// Low bits masked off each channel before comparing colors.
    pub precision_loss: u32,
    /// Maximum Chebyshev distance from the seed color.
    pub layer_difference: u32,
    /// Quantized color that is never labeled.
    pub ignore: Option<Rgb<u8>>,
    /// Neighborhood used while growing.
    pub connectivity: Connectivity,
}

impl ColorClusterOptions {
    /// Options for the first segmentation pass of a pipeline run.
    ///
    /// A zero layer difference switches to 8-connectivity so that
    /// exact-color regions are not split along thin diagonals.
    #[must_use]
    pub const fn for_config(config: &VectorizeConfig, ignore: Option<Rgb<u8>>) -> Self {
        Self {
            precision_loss: config.precision_loss(),
            layer_difference: config.layer_difference,
            ignore,
            connectivity: if config.layer_difference == 0 {
                Connectivity::Eight
            } else {
                Connectivity::Four
            },
        }
    }
}

/// Grow color regions over quantized pixels.
///
/// Transparent pixels and pixels whose quantized color equals
/// `options.ignore` are never labeled. A neighbor joins the region when
/// its quantized color is within `options.layer_difference` of the
/// region's seed color.
#[must_use]
pub fn cluster_color(image: &RawImage, options: &ColorClusterOptions) -> LabeledImage {
    let quantized: Vec<Rgb<u8>> = image
        .pixels()
        .map(|&p| quantize(rgb_of(p), options.precision_loss))
        .collect();
    let eligible: Vec<bool> = image
        .pixels()
        .zip(&quantized)
        .map(|(p, &q)| p.0[3] != 0 && Some(q) != options.ignore)
        .collect();

    let mut grower = RegionGrower::new(image.width(), image.height());
    for seed in 0..grower.pixel_count() {
        if grower.is_labeled(seed) || !eligible[seed] {
            continue;
        }

        let seed_color = quantized[seed];
        let mut sums = [0_u64; 3];
        let id = grower.next_id();
        let area = grower.grow(
            seed,
            id,
            options.connectivity,
            |i| {
                eligible[i]
                    && u32::from(color_distance(seed_color, quantized[i]))
                        <= options.layer_difference
            },
            |i| {
                for (sum, &channel) in sums.iter_mut().zip(&quantized[i].0) {
                    *sum += u64::from(channel);
                }
            },
        );
        grower.clusters.push(ClusterInfo {
            id,
            color: Rgb(sums.map(|sum| mean_channel(sum, area))),
            area,
        });
    }

    let labeled = grower.finish();
    debug!(
        clusters = labeled.clusters.len(),
        precision_loss = options.precision_loss,
        layer_difference = options.layer_difference,
        "color clustering complete"
    );
    labeled
}

/// Rounded mean of a channel sum over `area` pixels.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn mean_channel(sum: u64, area: usize) -> u8 {
    (sum as f64 / area.max(1) as f64).round() as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn image_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> RawImage {
        RawImage::from(RgbaImage::from_fn(width, height, f))
    }

    fn exact_options() -> ColorClusterOptions {
        ColorClusterOptions {
            precision_loss: 0,
            layer_difference: 0,
            ignore: None,
            connectivity: Connectivity::Four,
        }
    }

    /// Areas must match label counts and every label must index a cluster.
    fn assert_consistent(labeled: &LabeledImage) {
        let mut counts = vec![0_usize; labeled.clusters().len()];
        for label in labeled.labels().iter().flatten() {
            counts[*label as usize] += 1;
        }
        for (cluster, count) in labeled.clusters().iter().zip(&counts) {
            assert_eq!(cluster.area, *count, "area mismatch for {cluster:?}");
            assert!(cluster.area >= 1);
        }
        for (index, cluster) in labeled.clusters().iter().enumerate() {
            assert_eq!(cluster.id as usize, index);
        }
        let total: usize = labeled.clusters().iter().map(|c| c.area).sum();
        assert_eq!(total, labeled.labeled_pixel_count());
    }

    #[test]
    fn binary_diagonal_pixels_are_separate_clusters() {
        let image = image_from_fn(2, 2, |x, y| if x == y { INK } else { PAPER });
        let labeled = cluster_binary(&image);
        assert_eq!(labeled.clusters().len(), 2);
        assert_eq!(labeled.label(0, 0), Some(0));
        assert_eq!(labeled.label(1, 1), Some(1));
        assert_eq!(labeled.label(1, 0), None);
        assert_consistent(&labeled);
    }

    #[test]
    fn binary_diagonal_chain_stays_split() {
        // An 8-connected staircase is still three 4-connected components.
        let image = image_from_fn(3, 3, |x, y| if x == y { INK } else { PAPER });
        let labeled = cluster_binary(&image);
        assert_eq!(labeled.clusters().len(), 3);
        assert_consistent(&labeled);
    }

    #[test]
    fn binary_ink_rules() {
        // Transparent dark pixels and light pixels are not ink.
        let image = image_from_fn(4, 1, |x, _| match x {
            0 => Rgba([0, 0, 0, 0]),
            1 => Rgba([128, 0, 0, 255]),
            2 => Rgba([127, 255, 255, 1]),
            _ => PAPER,
        });
        let labeled = cluster_binary(&image);
        assert_eq!(labeled.clusters().len(), 1);
        assert_eq!(labeled.label(2, 0), Some(0));
        assert_eq!(labeled.clusters()[0].color, Rgb([0, 0, 0]));
    }

    #[test]
    fn binary_connected_shape_is_one_cluster() {
        // A ring of ink around a paper hole.
        let image = image_from_fn(3, 3, |x, y| if x == 1 && y == 1 { PAPER } else { INK });
        let labeled = cluster_binary(&image);
        assert_eq!(labeled.clusters().len(), 1);
        assert_eq!(labeled.clusters()[0].area, 8);
        assert_consistent(&labeled);
    }

    #[test]
    fn color_ids_follow_raster_order_of_seeds() {
        // Row 0: red red blue; row 1: green green green.
        let image = image_from_fn(3, 2, |x, y| match (x, y) {
            (0 | 1, 0) => Rgba([255, 0, 0, 255]),
            (2, 0) => Rgba([0, 0, 255, 255]),
            _ => Rgba([0, 255, 0, 255]),
        });
        let labeled = cluster_color(&image, &exact_options());
        let colors: Vec<Rgb<u8>> = labeled.clusters().iter().map(|c| c.color).collect();
        assert_eq!(
            colors,
            vec![Rgb([255, 0, 0]), Rgb([0, 0, 255]), Rgb([0, 255, 0])]
        );
        assert_eq!(labeled.clusters()[2].area, 3);
        assert_consistent(&labeled);
    }

    #[test]
    fn zero_tolerance_checkerboard_merges_diagonals() {
        let black = Rgba([0, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let image = image_from_fn(4, 4, |x, y| if (x + y) % 2 == 0 { black } else { white });
        let options = ColorClusterOptions::for_config(
            &VectorizeConfig {
                layer_difference: 0,
                color_precision: 8,
                ..VectorizeConfig::default()
            },
            None,
        );
        assert_eq!(options.connectivity, Connectivity::Eight);
        let labeled = cluster_color(&image, &options);
        assert_eq!(labeled.clusters().len(), 2);
        assert_eq!(labeled.clusters()[0].color, Rgb([0, 0, 0]));
        assert_eq!(labeled.clusters()[0].area, 8);
        assert_eq!(labeled.clusters()[1].area, 8);
        assert_consistent(&labeled);
    }

    #[test]
    fn four_connected_checkerboard_is_fully_split() {
        let black = Rgba([0, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let image = image_from_fn(3, 3, |x, y| if (x + y) % 2 == 0 { black } else { white });
        let labeled = cluster_color(&image, &exact_options());
        assert_eq!(labeled.clusters().len(), 9);
        assert_consistent(&labeled);
    }

    #[test]
    fn tolerance_is_measured_from_the_seed() {
        // A gradient 0, 10, 20, 30: with tolerance 15 the seed at 0 admits
        // 10 but not 20, even though 20 is within 15 of 10.
        let image = image_from_fn(4, 1, |x, _| {
            let v = u8::try_from(x * 10).unwrap();
            Rgba([v, v, v, 255])
        });
        let options = ColorClusterOptions {
            layer_difference: 15,
            ..exact_options()
        };
        let labeled = cluster_color(&image, &options);
        assert_eq!(labeled.clusters().len(), 2);
        assert_eq!(labeled.clusters()[0].area, 2);
        assert_eq!(labeled.clusters()[0].color, Rgb([5, 5, 5]));
        assert_eq!(labeled.label(2, 0), Some(1));
        assert_consistent(&labeled);
    }

    #[test]
    fn mean_color_is_rounded() {
        // Values 1 and 2 average to 1.5, which rounds to 2.
        let image = image_from_fn(2, 1, |x, _| {
            let v = u8::try_from(x + 1).unwrap();
            Rgba([v, 0, 0, 255])
        });
        let options = ColorClusterOptions {
            layer_difference: 4,
            ..exact_options()
        };
        let labeled = cluster_color(&image, &options);
        assert_eq!(labeled.clusters().len(), 1);
        assert_eq!(labeled.clusters()[0].color, Rgb([2, 0, 0]));
    }

    #[test]
    fn quantization_merges_nearby_colors() {
        let image = image_from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0x40, 0x40, 0x40, 255])
            } else {
                Rgba([0x43, 0x41, 0x42, 255])
            }
        });
        let options = ColorClusterOptions {
            precision_loss: 2,
            ..exact_options()
        };
        let labeled = cluster_color(&image, &options);
        assert_eq!(labeled.clusters().len(), 1);
        assert_eq!(labeled.clusters()[0].color, Rgb([0x40, 0x40, 0x40]));
    }

    #[test]
    fn transparent_and_ignored_pixels_stay_unlabeled() {
        let image = image_from_fn(3, 1, |x, _| match x {
            0 => Rgba([10, 10, 10, 0]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([10, 10, 10, 255]),
        });
        let options = ColorClusterOptions {
            ignore: Some(Rgb([0, 255, 0])),
            layer_difference: 255,
            ..exact_options()
        };
        let labeled = cluster_color(&image, &options);
        assert_eq!(labeled.labels(), &[None, None, Some(0)]);
        assert_consistent(&labeled);
    }

    #[test]
    fn empty_image_has_no_clusters() {
        let image = RawImage::from_raw(0, 0, Vec::new()).unwrap();
        assert!(cluster_color(&image, &exact_options()).clusters().is_empty());
        assert!(cluster_binary(&image).clusters().is_empty());
    }

    #[test]
    fn label_lookup_is_off_grid_safe() {
        let image = image_from_fn(1, 1, |_, _| INK);
        let labeled = cluster_binary(&image);
        assert_eq!(labeled.label(0, 0), Some(0));
        assert_eq!(labeled.label(-1, 0), None);
        assert_eq!(labeled.label(0, 1), None);
    }
}
