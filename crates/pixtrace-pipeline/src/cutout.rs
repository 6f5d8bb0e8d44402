//! Cutout rebuilding: re-segment flattened cluster colors.
//!
//! Region growing against a seed color leaves seams where neighboring
//! clusters share similar pixels. Painting every cluster with its mean
//! color and segmenting that image again at zero tolerance yields
//! disjoint, exact-color regions that can be drawn without overlap.

use image::{Rgb, Rgba, RgbaImage};

use crate::cluster::{ColorClusterOptions, Connectivity, LabeledImage, cluster_color};
use crate::raster::RawImage;

/// Paint every labeled pixel with its cluster's color at full opacity.
///
/// Unlabeled pixels become fully transparent black.
#[must_use]
pub fn flatten(labeled: &LabeledImage) -> RawImage {
    let clusters = labeled.clusters();
    let labels = labeled.labels();
    let width = labeled.width() as usize;
    let image = RgbaImage::from_fn(labeled.width(), labeled.height(), |x, y| {
        match labels[y as usize * width + x as usize] {
            Some(id) => {
                let Rgb([r, g, b]) = clusters[id as usize].color;
                Rgba([r, g, b, 255])
            }
            None => Rgba([0, 0, 0, 0]),
        }
    });
    RawImage::from(image)
}

/// Replace a first-pass segmentation with exact-color, 4-connected
/// regions of its flattened image.
///
/// `key` is compared against the flattened colors as-is.
#[must_use]
pub fn rebuild(labeled: &LabeledImage, key: Option<Rgb<u8>>) -> LabeledImage {
    let flattened = flatten(labeled);
    let options = ColorClusterOptions {
        precision_loss: 0,
        layer_difference: 0,
        ignore: key,
        connectivity: Connectivity::Four,
    };
    cluster_color(&flattened, &options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> RawImage {
        RawImage::from(RgbaImage::from_fn(width, height, f))
    }

    #[test]
    fn flatten_paints_cluster_colors() {
        let image = raw(3, 1, |x, _| match x {
            0 => Rgba([10, 0, 0, 255]),
            1 => Rgba([12, 0, 0, 200]),
            _ => Rgba([0, 0, 0, 0]),
        });
        let options = ColorClusterOptions {
            precision_loss: 0,
            layer_difference: 8,
            ignore: None,
            connectivity: Connectivity::Four,
        };
        let labeled = cluster_color(&image, &options);
        let flat = flatten(&labeled);
        assert_eq!(flat.pixel(0, 0), Rgba([11, 0, 0, 255]));
        assert_eq!(flat.pixel(1, 0), Rgba([11, 0, 0, 255]));
        assert_eq!(flat.pixel(2, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn rebuild_splits_same_color_regions_touching_only_diagonally() {
        // Two red pixels joined diagonally form one 8-connected cluster;
        // the cutout pass is 4-connected and splits them.
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let image = raw(2, 2, |x, y| if x == y { red } else { blue });
        let first = cluster_color(
            &image,
            &ColorClusterOptions {
                precision_loss: 0,
                layer_difference: 0,
                ignore: None,
                connectivity: Connectivity::Eight,
            },
        );
        assert_eq!(first.clusters().len(), 2);

        let rebuilt = rebuild(&first, None);
        assert_eq!(rebuilt.clusters().len(), 4);
        for cluster in rebuilt.clusters() {
            assert_eq!(cluster.area, 1);
        }
    }

    #[test]
    fn rebuild_merges_neighbors_with_identical_means() {
        // Seed-relative growth splits 0,10,20,30 into two clusters with
        // distinct means; flattened, each becomes one exact region.
        let image = raw(4, 1, |x, _| {
            let v = u8::try_from(x * 10).unwrap();
            Rgba([v, v, v, 255])
        });
        let first = cluster_color(
            &image,
            &ColorClusterOptions {
                precision_loss: 0,
                layer_difference: 15,
                ignore: None,
                connectivity: Connectivity::Four,
            },
        );
        let rebuilt = rebuild(&first, None);
        assert_eq!(rebuilt.clusters().len(), 2);
        assert_eq!(rebuilt.clusters()[0].color, Rgb([5, 5, 5]));
        assert_eq!(rebuilt.clusters()[1].color, Rgb([25, 25, 25]));
    }

    #[test]
    fn rebuild_skips_key_colored_regions() {
        let image = raw(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([5, 5, 5, 255])
            }
        });
        let first = cluster_color(
            &image,
            &ColorClusterOptions {
                precision_loss: 0,
                layer_difference: 0,
                ignore: None,
                connectivity: Connectivity::Four,
            },
        );
        assert_eq!(first.clusters().len(), 2);
        let rebuilt = rebuild(&first, Some(Rgb([0, 255, 0])));
        assert_eq!(rebuilt.labels(), &[None, Some(0)]);
    }
}
