//! Path refinement: turn a traced pixel loop into drawable geometry.
//!
//! Depending on [`PathMode`], a loop is passed through untouched,
//! simplified into a polygon, or prepared for spline fitting:
//!
//! 1. Douglas-Peucker simplification
//! 2. subdivision of long edges
//! 3. corner marking by interior angle
//! 4. 1:2:1 smoothing of non-corner vertices
//! 5. splicing into open chains at sharp direction changes
//!
//! Every step treats the loop as a ring without a repeated closing
//! point, except splicing, which walks it as an open chain.

use crate::simplify::simplify_points;
use crate::types::{Contour, PathMode, Point, Polyline, VectorizeConfig};

/// Parameters for [`refine_contour`], derived from a [`VectorizeConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineSettings {
    pub mode: PathMode,
    /// Douglas-Peucker tolerance in pixels.
    pub tolerance: f64,
    /// Interior angle (degrees) below which a vertex stays sharp.
    pub corner_threshold: f64,
    /// Edges longer than this are subdivided.
    pub length_threshold: f64,
    pub max_iterations: u32,
    /// Angle (degrees) below which a vertex starts a new chain.
    pub splice_threshold: f64,
}

impl From<&VectorizeConfig> for RefineSettings {
    fn from(config: &VectorizeConfig) -> Self {
        Self {
            mode: config.mode,
            tolerance: config.simplify_tolerance(),
            corner_threshold: config.corner_threshold,
            length_threshold: config.length_threshold,
            max_iterations: config.max_iterations,
            splice_threshold: config.splice_threshold,
        }
    }
}

/// Geometry produced for one boundary loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Refined {
    /// A closed straight-edged loop, without its closing point.
    Polygon(Polyline),
    /// Open chains to be fitted with curves, each with 3 or more points.
    Spline(Vec<Polyline>),
}

/// Refine one traced loop.
///
/// Returns `None` when nothing drawable is left: loops that collapse to
/// fewer than 2 distinct points, and spline loops whose every chain was
/// too short.
#[must_use]
pub fn refine_contour(contour: &Contour, settings: &RefineSettings) -> Option<Refined> {
    let lattice: Vec<Point> = contour.points().iter().copied().map(Point::from).collect();
    let points = remove_duplicate_points(open_loop(&lattice));
    if points.len() < 2 {
        return None;
    }

    match settings.mode {
        PathMode::None => Some(Refined::Polygon(Polyline::new(points))),
        PathMode::Polygon => Some(Refined::Polygon(Polyline::new(simplify_points(
            &points,
            settings.tolerance,
        )))),
        PathMode::Spline => {
            let simplified = simplify_points(&points, settings.tolerance);
            let refined = subdivide(
                &simplified,
                settings.max_iterations,
                settings.length_threshold,
            );
            let corners = mark_corners(&refined, settings.corner_threshold);
            let smoothed = smooth(&refined, &corners);
            let chains: Vec<Polyline> = splice(&smoothed, settings.splice_threshold)
                .into_iter()
                .filter(|chain| chain.len() > 2)
                .map(Polyline::new)
                .collect();
            if chains.is_empty() {
                None
            } else {
                Some(Refined::Spline(chains))
            }
        }
    }
}

/// Drop the closing point of a loop that repeats its first point.
#[must_use]
pub fn open_loop(points: &[Point]) -> &[Point] {
    match points {
        [first, .., last] if first == last => &points[..points.len() - 1],
        _ => points,
    }
}

/// Collapse runs of identical consecutive points.
#[must_use]
pub fn remove_duplicate_points(points: &[Point]) -> Vec<Point> {
    let mut cleaned: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if cleaned.last() != Some(&p) {
            cleaned.push(p);
        }
    }
    cleaned
}

/// Angle in degrees at `current` between the vectors to `prev` and
/// `next`.
///
/// A zero-length vector yields 180°, so degenerate vertices never count
/// as corners.
#[must_use]
pub fn angle_at(prev: Point, current: Point, next: Point) -> f64 {
    let (v1x, v1y) = (prev.x - current.x, prev.y - current.y);
    let (v2x, v2y) = (next.x - current.x, next.y - current.y);
    let mag1 = v1x.hypot(v1y);
    let mag2 = v2x.hypot(v2y);
    if mag1 == 0.0 || mag2 == 0.0 {
        return 180.0;
    }
    let dot = v1x.mul_add(v2x, v1y * v2y);
    (dot / (mag1 * mag2)).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Insert midpoints on every ring edge longer than `length_threshold`.
///
/// Runs at most `max_iterations` passes and stops early once no edge,
/// including the closing edge, exceeds the threshold.
#[must_use]
pub fn subdivide(points: &[Point], max_iterations: u32, length_threshold: f64) -> Vec<Point> {
    let mut output = points.to_vec();
    if output.len() < 2 {
        return output;
    }

    for _ in 0..max_iterations {
        let n = output.len();
        let mut next_points = Vec::with_capacity(n * 2);
        let mut has_long_edge = false;
        for (i, &current) in output.iter().enumerate() {
            let next = output[(i + 1) % n];
            next_points.push(current);
            if current.distance(next) > length_threshold {
                has_long_edge = true;
                next_points.push(current.midpoint(next));
            }
        }
        output = remove_duplicate_points(&next_points);
        if !has_long_edge {
            break;
        }
    }

    output
}

/// Flag ring vertices whose interior angle is below `corner_threshold`.
///
/// Rings with fewer than 3 points have no corners.
#[must_use]
pub fn mark_corners(points: &[Point], corner_threshold: f64) -> Vec<bool> {
    let n = points.len();
    if n < 3 {
        return vec![false; n];
    }
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            angle_at(prev, points[i], next) < corner_threshold
        })
        .collect()
}

/// Replace every non-corner ring vertex with the 1:2:1 weighted average
/// of itself and its neighbors.
#[must_use]
pub fn smooth(points: &[Point], corners: &[bool]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    (0..n)
        .map(|i| {
            let current = points[i];
            if corners.get(i).copied().unwrap_or(false) {
                return current;
            }
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            Point::new(
                2.0f64.mul_add(current.x, prev.x + next.x) / 4.0,
                2.0f64.mul_add(current.y, prev.y + next.y) / 4.0,
            )
        })
        .collect()
}

/// Split an open chain wherever the angle at an interior vertex falls
/// below `min_angle`. The splitting vertex ends one chain and starts the
/// next.
#[must_use]
pub fn splice(points: &[Point], min_angle: f64) -> Vec<Vec<Point>> {
    let n = points.len();
    if n < 3 {
        return vec![points.to_vec()];
    }

    let mut chains = Vec::new();
    let mut current = vec![points[0]];
    for i in 1..n - 1 {
        current.push(points[i]);
        if angle_at(points[i - 1], points[i], points[i + 1]) < min_angle {
            chains.push(std::mem::replace(&mut current, vec![points[i]]));
        }
    }
    current.push(points[n - 1]);
    chains.push(current);
    chains
}
