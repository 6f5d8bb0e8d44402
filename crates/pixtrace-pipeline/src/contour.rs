//! Contour tracing: extract closed boundary loops of one cluster.
//!
//! Every pixel of the cluster contributes a unit edge on each side that
//! faces off-grid or a differently labeled pixel. Edges are oriented so
//! the cluster lies to their right when walking in screen coordinates:
//! top edges point right, right edges point down, bottom edges point
//! left, and left edges point up. Outer boundaries therefore come out
//! clockwise and holes counter-clockwise, which an even-odd fill renders
//! correctly without tracking which loop is inside which.
//!
//! Loops are walked greedily, preferring a right turn, then straight,
//! then left, then back. The right-hand preference hugs the tightest
//! boundary, so two regions of a cluster that touch only at a corner
//! become two separate loops.

use std::collections::HashMap;

use tracing::trace;

use crate::cluster::LabeledImage;
use crate::types::{Contour, GridPoint};

/// Compass heading of a unit boundary edge, clockwise from east.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Right,
    Down,
    Left,
    Up,
}

impl Heading {
    const ALL: [Self; 4] = [Self::Right, Self::Down, Self::Left, Self::Up];

    const fn index(self) -> usize {
        match self {
            Self::Right => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Up => 3,
        }
    }

    /// The heading after `quarter_turns` clockwise quarter turns.
    const fn turned(self, quarter_turns: usize) -> Self {
        Self::ALL[(self.index() + quarter_turns) % 4]
    }
}

/// Continuation preference in clockwise quarter turns: right, straight,
/// left, back.
const TURN_PREFERENCE: [usize; 4] = [1, 0, 3, 2];

/// A directed unit edge on the pixel-corner lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    start: GridPoint,
    heading: Heading,
}

impl Edge {
    const fn end(self) -> GridPoint {
        let GridPoint { x, y } = self.start;
        match self.heading {
            Heading::Right => GridPoint::new(x + 1, y),
            Heading::Down => GridPoint::new(x, y + 1),
            Heading::Left => GridPoint::new(x - 1, y),
            Heading::Up => GridPoint::new(x, y - 1),
        }
    }
}

/// Collect boundary edges of cluster `id` in raster order, top, right,
/// bottom, left per pixel.
fn boundary_edges(labeled: &LabeledImage, id: u32) -> Vec<Edge> {
    let inside = |x: i64, y: i64| labeled.label(x, y) == Some(id);
    let mut edges = Vec::new();

    for y in 0..labeled.height() {
        for x in 0..labeled.width() {
            let (ix, iy) = (i64::from(x), i64::from(y));
            if !inside(ix, iy) {
                continue;
            }
            if !inside(ix, iy - 1) {
                edges.push(Edge {
                    start: GridPoint::new(x, y),
                    heading: Heading::Right,
                });
            }
            if !inside(ix + 1, iy) {
                edges.push(Edge {
                    start: GridPoint::new(x + 1, y),
                    heading: Heading::Down,
                });
            }
            if !inside(ix, iy + 1) {
                edges.push(Edge {
                    start: GridPoint::new(x + 1, y + 1),
                    heading: Heading::Left,
                });
            }
            if !inside(ix - 1, iy) {
                edges.push(Edge {
                    start: GridPoint::new(x, y + 1),
                    heading: Heading::Up,
                });
            }
        }
    }

    edges
}

/// Trace every boundary loop of cluster `id`.
///
/// Closed loops repeat their starting point at the end. A walk that runs
/// out of unused edges before closing is kept as-is if it has more than
/// two points, and dropped otherwise.
#[must_use]
pub fn trace_cluster(labeled: &LabeledImage, id: u32) -> Vec<Contour> {
    let edges = boundary_edges(labeled, id);

    // At most one edge per heading can start at any vertex.
    let mut by_start: HashMap<GridPoint, [Option<usize>; 4]> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        by_start.entry(edge.start).or_default()[edge.heading.index()] = Some(index);
    }

    let mut used = vec![false; edges.len()];
    let mut contours = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let origin = edges[first].start;
        let mut points = vec![origin];
        let mut current = first;

        loop {
            used[current] = true;
            let edge = edges[current];
            let end = edge.end();
            points.push(end);
            if end == origin {
                break;
            }

            let Some(slots) = by_start.get(&end) else {
                break;
            };
            let next = TURN_PREFERENCE.iter().find_map(|&turn| {
                slots[edge.heading.turned(turn).index()].filter(|&candidate| !used[candidate])
            });
            match next {
                Some(index) => current = index,
                None => break,
            }
        }

        if points.len() > 2 {
            contours.push(Contour::new(points));
        }
    }

    trace!(cluster = id, edges = edges.len(), loops = contours.len(), "traced cluster");
    contours
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::cluster::{ColorClusterOptions, Connectivity, cluster_color};
    use crate::raster::RawImage;

    fn labeled_from_fn(
        width: u32,
        height: u32,
        connectivity: Connectivity,
        f: impl Fn(u32, u32) -> Rgba<u8>,
    ) -> LabeledImage {
        let image = RawImage::from(RgbaImage::from_fn(width, height, f));
        let options = ColorClusterOptions {
            precision_loss: 0,
            layer_difference: 0,
            ignore: None,
            connectivity,
        };
        cluster_color(&image, &options)
    }

    fn pts(coords: &[(u32, u32)]) -> Vec<GridPoint> {
        coords.iter().map(|&(x, y)| GridPoint::new(x, y)).collect()
    }

    /// Shoelace area; positive for clockwise loops in screen coordinates.
    fn signed_area(contour: &Contour) -> i64 {
        contour
            .points()
            .windows(2)
            .map(|w| {
                let (a, b) = (w[0], w[1]);
                i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
            })
            .sum::<i64>()
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn heading_turns_clockwise() {
        assert_eq!(Heading::Right.turned(1), Heading::Down);
        assert_eq!(Heading::Up.turned(1), Heading::Right);
        assert_eq!(Heading::Left.turned(3), Heading::Down);
        assert_eq!(Heading::Down.turned(2), Heading::Up);
    }

    #[test]
    fn single_pixel_is_a_unit_square() {
        let labeled = labeled_from_fn(1, 1, Connectivity::Four, |_, _| RED);
        let contours = trace_cluster(&labeled, 0);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].points(),
            pts(&[(0, 0), (1, 0), (1, 1), (0, 1), (0, 0)])
        );
    }

    #[test]
    fn solid_block_walks_its_outline_clockwise() {
        let labeled = labeled_from_fn(2, 2, Connectivity::Four, |_, _| RED);
        let contours = trace_cluster(&labeled, 0);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].points(),
            pts(&[
                (0, 0),
                (1, 0),
                (2, 0),
                (2, 1),
                (2, 2),
                (1, 2),
                (0, 2),
                (0, 1),
                (0, 0)
            ])
        );
        assert_eq!(signed_area(&contours[0]), 8);
    }

    #[test]
    fn hole_winds_opposite_to_outer_boundary() {
        let labeled =
            labeled_from_fn(3, 3, Connectivity::Four, |x, y| if x == 1 && y == 1 { BLUE } else { RED });
        let contours = trace_cluster(&labeled, 0);
        assert_eq!(contours.len(), 2);
        let outer = &contours[0];
        let hole = &contours[1];
        assert_eq!(outer.len(), 13);
        assert_eq!(hole.points(), pts(&[(2, 1), (1, 1), (1, 2), (2, 2), (2, 1)]));
        assert!(signed_area(outer) > 0);
        assert!(signed_area(hole) < 0);
    }

    #[test]
    fn hole_cluster_traces_its_own_square() {
        let labeled =
            labeled_from_fn(3, 3, Connectivity::Four, |x, y| if x == 1 && y == 1 { BLUE } else { RED });
        let contours = trace_cluster(&labeled, 1);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].points(),
            pts(&[(1, 1), (2, 1), (2, 2), (1, 2), (1, 1)])
        );
    }

    #[test]
    fn corner_touching_pixels_split_into_two_loops() {
        let labeled =
            labeled_from_fn(2, 2, Connectivity::Eight, |x, y| if x == y { RED } else { BLUE });
        assert_eq!(labeled.clusters()[0].area, 2);
        let contours = trace_cluster(&labeled, 0);
        assert_eq!(contours.len(), 2);
        assert_eq!(
            contours[0].points(),
            pts(&[(0, 0), (1, 0), (1, 1), (0, 1), (0, 0)])
        );
        assert_eq!(
            contours[1].points(),
            pts(&[(1, 1), (2, 1), (2, 2), (1, 2), (1, 1)])
        );
    }

    #[test]
    fn unknown_cluster_has_no_loops() {
        let labeled = labeled_from_fn(2, 2, Connectivity::Four, |_, _| RED);
        assert!(trace_cluster(&labeled, 7).is_empty());
    }
}
