//! Path data rendering: polygons and Catmull-Rom splines.
//!
//! Splines pass through every input point. Each sub-chain is closed into
//! a ring and every ring edge becomes one cubic Bezier segment whose
//! control points follow the uniform Catmull-Rom tangents.

use std::fmt::Write as _;

use crate::refine::{Refined, open_loop};
use crate::types::Point;

/// Format a coordinate with at most `precision` decimals.
///
/// Rounding works on the exact binary value, and a value exactly halfway
/// between two candidates rounds away from zero (`0.25` at one decimal
/// is `0.3`). Trailing zeros and a bare trailing decimal point are
/// removed, and a value that rounds to negative zero prints as `0`.
#[must_use]
pub fn format_value(value: f64, precision: u32) -> String {
    let precision = usize::try_from(precision).unwrap_or(usize::MAX);
    let mut text = round_half_away(value, precision);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text.remove(0);
    }
    text
}

/// `value` with exactly `precision` decimals, ties away from zero.
///
/// Values that need no more than `precision` decimals are printed
/// exactly with their own digit count instead.
fn round_half_away(value: f64, precision: usize) -> String {
    let digits = exact_fraction_digits(value);
    if digits <= precision {
        return format!("{value:.digits$}");
    }

    // The full expansion is exact, so the first dropped digit decides.
    let exact = format!("{value:.digits$}");
    let keep = exact.len() - (digits - precision);
    let round_up = exact.as_bytes()[keep] >= b'5';
    let mut text = exact[..keep].trim_end_matches('.').to_owned();
    if round_up {
        increment_magnitude(&mut text);
    }
    text
}

/// Number of decimals in the exact expansion of a finite `f64`.
///
/// Every finite double is `m * 2^e`; with `m` odd and `e < 0` its
/// decimal expansion has exactly `-e` fraction digits.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn exact_fraction_digits(value: f64) -> usize {
    if !value.is_finite() || value == 0.0 {
        return 0;
    }
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    let exponent = exponent + mantissa.trailing_zeros() as i32;
    usize::try_from(-exponent).unwrap_or(0)
}

/// Add one unit in the last place of a decimal string, away from zero.
fn increment_magnitude(text: &mut String) {
    let mut digits = std::mem::take(text).into_bytes();
    let mut carry = true;
    for byte in digits.iter_mut().rev() {
        match *byte {
            b'9' => *byte = b'0',
            b'0'..=b'8' => {
                *byte += 1;
                carry = false;
                break;
            }
            _ => {}
        }
    }
    if carry {
        let at = usize::from(digits.first() == Some(&b'-'));
        digits.insert(at, b'1');
    }
    *text = String::from_utf8(digits).unwrap_or_default();
}

fn format_point(point: Point, precision: u32) -> String {
    format!(
        "{},{}",
        format_value(point.x, precision),
        format_value(point.y, precision)
    )
}

/// Render a closed straight-edged loop as `M x,y L x,y … Z`.
///
/// Returns an empty string for an empty loop.
#[must_use]
pub fn polygon_path(points: &[Point], precision: u32) -> String {
    let points = open_loop(points);
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let rest: Vec<String> = rest.iter().map(|&p| format_point(p, precision)).collect();
    format!("M {} L {} Z", format_point(*first, precision), rest.join(" "))
}

/// One cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub from: Point,
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

impl CubicSegment {
    /// Evaluate the segment at parameter `t` in `0..=1`.
    #[must_use]
    pub fn eval(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point::new(
            b3.mul_add(
                self.to.x,
                b2.mul_add(self.c2.x, b0.mul_add(self.from.x, b1 * self.c1.x)),
            ),
            b3.mul_add(
                self.to.y,
                b2.mul_add(self.c2.y, b0.mul_add(self.from.y, b1 * self.c1.y)),
            ),
        )
    }
}

/// Convert a chain, treated as a ring, into one cubic per ring edge.
///
/// A repeated closing point is dropped first; chains with fewer than 2
/// points yield no segments.
#[must_use]
pub fn catmull_rom_segments(points: &[Point]) -> Vec<CubicSegment> {
    let ring = open_loop(points);
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }

    (0..n)
        .map(|i| {
            let p0 = ring[(i + n - 1) % n];
            let p1 = ring[i];
            let p2 = ring[(i + 1) % n];
            let p3 = ring[(i + 2) % n];
            CubicSegment {
                from: p1,
                c1: Point::new(p1.x + (p2.x - p0.x) / 6.0, p1.y + (p2.y - p0.y) / 6.0),
                c2: Point::new(p2.x - (p3.x - p1.x) / 6.0, p2.y - (p3.y - p1.y) / 6.0),
                to: p2,
            }
        })
        .collect()
}

/// Render a chain as a closed Catmull-Rom spline:
/// `M p C c1 c2 p … Z`.
///
/// Returns an empty string for chains with fewer than 2 points.
#[must_use]
pub fn spline_path(points: &[Point], precision: u32) -> String {
    let segments = catmull_rom_segments(points);
    let Some(first) = segments.first() else {
        return String::new();
    };

    let mut d = format!("M {}", format_point(first.from, precision));
    for segment in &segments {
        let _ = write!(
            d,
            " C {} {} {}",
            format_point(segment.c1, precision),
            format_point(segment.c2, precision),
            format_point(segment.to, precision)
        );
    }
    d.push_str(" Z");
    d
}

/// Render refined geometry for one loop as SVG path data.
///
/// Spline chains are rendered independently and joined with spaces.
#[must_use]
pub fn render(refined: &Refined, precision: u32) -> String {
    match refined {
        Refined::Polygon(polygon) => polygon_path(polygon.points(), precision),
        Refined::Spline(chains) => chains
            .iter()
            .map(|chain| spline_path(chain.points(), precision))
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
