//! Pixel access helpers over a row-major RGBA8 buffer.
//!
//! [`RawImage`] is the pipeline's only input. It wraps an
//! [`RgbaImage`] whose buffer length has been checked against its
//! dimensions, so every pixel lookup below can index directly.

use image::{Rgb, Rgba, RgbaImage};

use crate::types::{Dimensions, PipelineError};

/// Bytes per RGBA8 pixel.
const CHANNELS: usize = 4;

/// An immutable RGBA8 raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage(RgbaImage);

impl RawImage {
    /// Build an image from a raw `R,G,B,A` byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BufferSize`] unless `data.len()` equals
    /// `width * height * 4` exactly.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        let actual = data.len();
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS));
        let size_error = PipelineError::BufferSize {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        };
        if expected != Some(actual) {
            return Err(size_error);
        }
        RgbaImage::from_raw(width, height, data)
            .map(Self)
            .ok_or(size_error)
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The pixel at `(x, y)`.
    ///
    /// Callers must keep `x < width` and `y < height`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.0.get_pixel(x, y)
    }

    /// Iterate over every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &Rgba<u8>> {
        self.0.pixels()
    }

    #[must_use]
    pub fn into_inner(self) -> RgbaImage {
        self.0
    }
}

impl From<RgbaImage> for RawImage {
    fn from(image: RgbaImage) -> Self {
        Self(image)
    }
}

/// Drop the color channels of a pixel.
#[must_use]
pub const fn rgb_of(pixel: Rgba<u8>) -> Rgb<u8> {
    Rgb([pixel.0[0], pixel.0[1], pixel.0[2]])
}

/// Mask off the low `precision_loss` bits of every channel.
///
/// A loss of 0 leaves the color untouched; a loss of 8 or more maps
/// everything to black.
#[must_use]
pub fn quantize(color: Rgb<u8>, precision_loss: u32) -> Rgb<u8> {
    if precision_loss == 0 {
        return color;
    }
    let mask = 0xff_u8.checked_shl(precision_loss).unwrap_or(0);
    Rgb(color.0.map(|c| c & mask))
}

/// Chebyshev distance: the largest per-channel absolute difference.
#[must_use]
pub fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> u8 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}

/// Format a color as a lowercase `#rrggbb` string.
#[must_use]
pub fn to_hex(color: Rgb<u8>) -> String {
    let [r, g, b] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_accepts_exact_length() {
        let image = RawImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        assert_eq!(image.pixel(1, 0), Rgba([5, 6, 7, 8]));
    }

    #[test]
    fn from_raw_rejects_short_buffer() {
        let result = RawImage::from_raw(2, 2, vec![0; 15]);
        assert_eq!(
            result,
            Err(PipelineError::BufferSize {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15,
            })
        );
    }

    #[test]
    fn from_raw_rejects_long_buffer() {
        let result = RawImage::from_raw(1, 1, vec![0; 5]);
        assert!(matches!(
            result,
            Err(PipelineError::BufferSize { expected: 4, actual: 5, .. })
        ));
    }

    #[test]
    fn from_raw_accepts_empty_image() {
        let image = RawImage::from_raw(0, 0, Vec::new()).unwrap();
        assert_eq!(image.dimensions(), Dimensions { width: 0, height: 0 });
        assert_eq!(image.pixels().count(), 0);
    }

    #[test]
    fn quantize_masks_low_bits() {
        assert_eq!(quantize(Rgb([0xff, 0x81, 0x7f]), 2), Rgb([0xfc, 0x80, 0x7c]));
        assert_eq!(quantize(Rgb([0xff, 0x81, 0x7f]), 0), Rgb([0xff, 0x81, 0x7f]));
        assert_eq!(quantize(Rgb([0xff, 0x81, 0x7f]), 7), Rgb([0x80, 0x80, 0x00]));
        assert_eq!(quantize(Rgb([0xff, 0xff, 0xff]), 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn color_distance_is_max_channel_difference() {
        assert_eq!(color_distance(Rgb([10, 20, 30]), Rgb([15, 5, 31])), 15);
        assert_eq!(color_distance(Rgb([7, 7, 7]), Rgb([7, 7, 7])), 0);
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(to_hex(Rgb([255, 0, 16])), "#ff0010");
    }
}
