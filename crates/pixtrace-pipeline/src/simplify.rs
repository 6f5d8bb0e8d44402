//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count by removing points that lie within a tolerance
//! of the chord between their surviving neighbors. Implemented from
//! scratch to keep the pipeline free of geometry crate dependencies.
//!
//! Boundary loops are simplified as open chains from their first to
//! their last point; the closing edge is never a chord.

use crate::types::Point;

/// Simplify a chain of points.
///
/// Points within `tolerance` pixels of the chord between their endpoints
/// are removed. When several points are equally far from a chord, the
/// first of them is the one kept. Chains with fewer than 3 points are
/// returned unchanged.
#[must_use = "returns the simplified points"]
pub fn simplify_points(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// chord between them. If that distance exceeds `tolerance`, the point
/// is kept and both halves are processed recursively. Only a strictly
/// larger distance replaces the current candidate, so ties go to the
/// earliest point.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line through `a` and `b`.
///
/// Uses |cross(b-a, p-a)| / |b-a|. When `a` and `b` coincide (as they do
/// for the endpoints of a closed loop), returns the distance from `p` to
/// `a`. Lattice points that are equally far from the chord in exact
/// arithmetic can differ here in the last bit, which decides which of
/// them survives.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
