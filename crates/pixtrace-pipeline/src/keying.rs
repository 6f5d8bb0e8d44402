//! Color keying: give heavily transparent images an opaque backdrop.
//!
//! Region growing only looks at color, so large transparent areas are
//! replaced with a marker color that does not occur anywhere in the
//! image. The marker is then ignored by the cluster engine, which keeps
//! the backdrop from ever turning into a visible shape.
//!
//! If every palette color already occurs in the image, keying is
//! silently skipped.

use std::borrow::Cow;

use image::{Rgb, Rgba};

use crate::raster::{RawImage, rgb_of};

/// Candidate marker colors, tried in order.
pub const KEY_COLORS: [Rgb<u8>; 7] = [
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 255]),
    Rgb([255, 0, 255]),
    Rgb([128, 128, 128]),
];

/// Whether enough of the sampled rows are fully transparent to warrant
/// a backdrop.
///
/// Five rows are sampled (top, quarter, middle, three quarters, bottom)
/// and the image qualifies once the transparent count reaches 20% of
/// two rows' worth of pixels.
#[must_use]
pub fn should_key(image: &RawImage) -> bool {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return false;
    }

    let threshold = (2 * width as usize) / 5;
    let rows = [0, height / 4, height / 2, (3 * height) / 4, height - 1];
    let mut transparent = 0_usize;
    for y in rows {
        for x in 0..width {
            if image.pixel(x, y).0[3] == 0 {
                transparent += 1;
            }
            if transparent >= threshold {
                return true;
            }
        }
    }
    false
}

/// The first palette color that does not occur anywhere in the image.
///
/// Alpha is ignored when comparing.
#[must_use]
pub fn find_unused_key_color(image: &RawImage) -> Option<Rgb<u8>> {
    KEY_COLORS
        .into_iter()
        .find(|&key| !image.pixels().any(|&p| rgb_of(p) == key))
}

/// Replace every fully transparent pixel with `key` at full opacity.
///
/// Pixels with any coverage are left untouched. Without a key the input
/// is returned as-is.
#[must_use]
pub fn apply_key_color(image: &RawImage, key: Option<Rgb<u8>>) -> Cow<'_, RawImage> {
    let Some(Rgb([r, g, b])) = key else {
        return Cow::Borrowed(image);
    };
    let mut keyed = image.clone().into_inner();
    for pixel in keyed.pixels_mut() {
        if pixel.0[3] == 0 {
            *pixel = Rgba([r, g, b, 255]);
        }
    }
    Cow::Owned(RawImage::from(keyed))
}
