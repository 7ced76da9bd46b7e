//! Hysteresis edge detection.
//!
//! Follows `imageproc::edges::canny` (3×3 Sobel, non-maximum
//! suppression, hysteresis) with three differences:
//!
//! 1. No implicit Gaussian pre-blur. Callers smooth first (median or
//!    Gaussian) or feed an already-smooth gradient image.
//! 2. Hysteresis follows all 8 neighbours and bounds-checks them, so
//!    tracking never wraps past the image border.
//! 3. Magnitude is the L1 norm `|gx| + |gy|` and both thresholds are
//!    strict: a pixel must exceed a threshold, not merely reach it.
//!
//! Output is binary: 255 for edge pixels, 0 elsewhere. The one-pixel
//! frame is never an edge.

use image::{GrayImage, Luma};
use imageproc::definitions::{HasBlack, HasWhite, Image};
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Horizontal and vertical 3×3 Sobel responses, border pixels clamped.
#[must_use]
pub fn sobel_gradients(image: &GrayImage) -> (Image<Luma<i16>>, Image<Luma<i16>>) {
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    (gx, gy)
}

/// Detect edges with two-level hysteresis.
///
/// Pixels whose suppressed gradient magnitude exceeds `high_threshold`
/// are edges; pixels exceeding `low_threshold` that connect (8-way) to an
/// edge are edges too. Thresholds are used as given; see
/// [`crate::edge::canny`] for the normalising wrapper.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::from_pixel(width, height, Luma::black());
    }

    let (gx, gy) = sobel_gradients(image);
    let magnitude: Image<Luma<f32>> = Image::from_fn(width, height, |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.abs() + v.abs()])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Gradient direction quantised to the four neighbour axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn of(x_gradient: f32, y_gradient: f32) -> Self {
        let mut angle = y_gradient.atan2(x_gradient).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// The two neighbours across the edge, as offsets.
    const fn across(self) -> [(i32, i32); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal => [(1, 1), (-1, -1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::AntiDiagonal => [(-1, 1), (1, -1)],
        }
    }
}

/// Keep only pixels that are local maxima across the edge direction.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (width, height) = g.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0_f32]));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let direction = Direction::of(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let pixel = g.get_pixel(x, y).0[0];
            let is_maximum = direction.across().iter().all(|&(dx, dy)| {
                let nx = x.wrapping_add_signed(dx);
                let ny = y.wrapping_add_signed(dy);
                pixel >= g.get_pixel(nx, ny).0[0]
            });
            if is_maximum {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

/// 8-connected neighbourhood offsets.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Grow definite edges into connected weak edges (depth-first, explicit
/// stack).
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (width, height) = input.dimensions();
    let mut out = GrayImage::from_pixel(width, height, Luma::black());
    let mut stack = Vec::new();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if input.get_pixel(x, y).0[0] <= high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma::white());
            stack.push((x, y));

            while let Some((px, py)) = stack.pop() {
                for &(dx, dy) in &NEIGHBOURS {
                    let nx = px.wrapping_add_signed(dx);
                    let ny = py.wrapping_add_signed(dy);
                    if nx >= width || ny >= height {
                        continue;
                    }
                    if input.get_pixel(nx, ny).0[0] > low_thresh && out.get_pixel(nx, ny).0[0] == 0
                    {
                        out.put_pixel(nx, ny, Luma::white());
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(edges: &GrayImage) -> usize {
        edges.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn border_edge_does_not_panic() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([0]));
        for y in 0..10 {
            img.put_pixel(1, y, Luma([255]));
        }
        let _edges = canny(&img, 1.0, 2.0);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        assert_eq!(canny(&img, 50.0, 150.0).dimensions(), (17, 31));
    }

    #[test]
    fn tiny_images_have_no_edges() {
        let img = GrayImage::from_fn(2, 5, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        let edges = canny(&img, 1.0, 2.0);
        assert_eq!(edges.dimensions(), (2, 5));
        assert_eq!(edge_count(&edges), 0);
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
    }

    #[test]
    fn sharp_edge_detected_as_thin_line() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let edges = canny(&img, 50.0, 150.0);
        // Both step columns tie; nothing else survives suppression.
        for y in 1..19 {
            let row: usize = (0..20).filter(|&x| edges.get_pixel(x, y).0[0] > 0).count();
            assert!((1..=2).contains(&row), "row {y} has {row} edge pixels");
        }
        for x in 0..8 {
            assert_eq!(edges.get_pixel(x, 10).0[0], 0);
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn output_is_binary() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 13 + y * 7) % 256) as u8]));
        let edges = canny(&img, 20.0, 60.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn weak_edge_survives_only_when_connected() {
        // Strong step above y=10, weak step below, meeting at x=10.
        let img = GrayImage::from_fn(20, 20, |x, y| {
            let bright = if y < 10 { 255 } else { 40 };
            Luma([if x < 10 { 0 } else { bright }])
        });
        // The corner at (10, 9) peaks at |805| + |-645| = 1450.
        let strong_only = canny(&img, 1450.0, 1450.0);
        assert_eq!(edge_count(&strong_only), 0);

        let connected = canny(&img, 100.0, 900.0);
        let isolated = canny(&img, 170.0, 900.0);
        assert!(edge_count(&connected) > edge_count(&isolated));
    }

    #[test]
    fn thresholds_must_be_exceeded() {
        // A clean 0 -> 255 step gives |gx| = 4 * 255 on both step columns.
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        assert_eq!(edge_count(&canny(&img, 1020.0, 1020.0)), 0);
        assert!(edge_count(&canny(&img, 1019.0, 1019.0)) > 0);
    }

    #[test]
    fn magnitude_sums_both_gradient_axes() {
        // Diagonal step: |gx| = |gy| = 3 * 255 at the boundary, so the
        // summed magnitude is 1530 while the Euclidean one is about 1082.
        let img = GrayImage::from_fn(20, 20, |x, y| Luma([if x + y < 20 { 0 } else { 255 }]));
        assert!(edge_count(&canny(&img, 1400.0, 1400.0)) > 0);
    }

    #[test]
    fn direction_bins() {
        assert_eq!(Direction::of(1.0, 0.0), Direction::Horizontal);
        assert_eq!(Direction::of(1.0, 1.0), Direction::Diagonal);
        assert_eq!(Direction::of(0.0, 1.0), Direction::Vertical);
        assert_eq!(Direction::of(-1.0, 1.0), Direction::AntiDiagonal);
        assert_eq!(Direction::of(-1.0, 0.0), Direction::Horizontal);
    }
}
