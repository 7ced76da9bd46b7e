//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Removes points that lie within a tolerance of the chord between their
//! retained neighbours. [`simplify`] treats the input as an open
//! polyline with fixed endpoints; [`simplify_closed`] handles rings by
//! splitting them at the first point and the point farthest from it.

use crate::types::{Contour, Point};

/// Simplify an open polyline.
///
/// Points within `tolerance` pixels of the chord between the retained
/// endpoints are removed. A tolerance of 0.0 keeps every point that is
/// not exactly on a chord. Inputs with fewer than 3 points are returned
/// unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
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

/// Simplify a closed ring.
///
/// The ring is cut at point 0 and at the point farthest from it; both
/// halves are simplified as open polylines and rejoined. The two cut
/// points are always kept, so a non-degenerate ring never collapses
/// below two points. A ring whose points all coincide becomes a single
/// point.
#[must_use = "returns the simplified contour"]
pub fn simplify_closed(contour: &Contour, tolerance: f64) -> Contour {
    let points = contour.points();
    if points.len() < 3 {
        return contour.clone();
    }

    let first = points[0];
    let (split, split_dist) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.distance_squared(first)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if split_dist == 0.0 {
        return Contour::new(vec![first]);
    }

    let mut result = simplify(&points[..=split], tolerance);

    let mut back_half: Vec<Point> = points[split..].to_vec();
    back_half.push(first);
    let back = simplify(&back_half, tolerance);
    // Skip the shared split point and the closing copy of point 0.
    result.extend_from_slice(&back[1..back.len() - 1]);

    Contour::new(result)
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line through them. If that distance exceeds `tolerance`, the point is
/// kept and both sub-segments are processed recursively.
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

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
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

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    /// Square outline traced pixel by pixel, as border following emits it.
    fn traced_square(side: u32) -> Contour {
        let s = f64::from(side);
        let mut points = Vec::new();
        for i in 0..side {
            points.push(Point::new(f64::from(i), 0.0));
        }
        for i in 0..side {
            points.push(Point::new(s, f64::from(i)));
        }
        for i in 0..side {
            points.push(Point::new(s - f64::from(i), s));
        }
        for i in 0..side {
            points.push(Point::new(0.0, s - f64::from(i)));
        }
        Contour::new(points)
    }

    #[test]
    fn short_polylines_unchanged() {
        assert!(simplify(&[], 1.0).is_empty());
        let two = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(simplify(&two, 1.0), two);
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(simplify(&line, 0.1), pts(&[(0.0, 0.0), (3.0, 3.0)]));
    }

    #[test]
    fn significant_deviation_is_kept() {
        let bent = pts(&[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]);
        assert_eq!(simplify(&bent, 1.0).len(), 3);
        assert_eq!(simplify(&bent, 10.0).len(), 2);
    }

    #[test]
    fn traced_square_reduces_to_corners() {
        let square = traced_square(20);
        let simplified = simplify_closed(&square, 0.01 * square.perimeter());
        assert_eq!(simplified.len(), 4);
        for p in simplified.points() {
            assert!(p.x == 0.0 || p.x == 20.0, "unexpected x {}", p.x);
            assert!(p.y == 0.0 || p.y == 20.0, "unexpected y {}", p.y);
        }
        assert!((simplified.area() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_ring_collapses_to_point() {
        let ring = Contour::new(pts(&[(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)]));
        assert_eq!(simplify_closed(&ring, 1.0).len(), 1);
    }

    #[test]
    fn looser_tolerance_never_adds_points() {
        let square = traced_square(12);
        let tight = simplify_closed(&square, 0.01 * square.perimeter());
        let loose = simplify_closed(&square, 0.02 * square.perimeter());
        assert!(loose.len() <= tight.len());
    }

    #[test]
    fn perpendicular_distance_of_degenerate_segment() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < f64::EPSILON);
    }
}
