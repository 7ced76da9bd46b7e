//! Polygon outlines painted onto a binary canvas via `tiny-skia`.
//!
//! Contour points are integer pixel coordinates; each is mapped to the
//! pixel's centre before stroking. Strokes are rasterised without
//! anti-aliasing so the canvas stays strictly two-level: any pixel the
//! stroke covers becomes ink.

use image::GrayImage;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::types::{Contour, INK, PAPER};

/// Alpha above which a stroked pixel counts as covered.
const COVERAGE_THRESHOLD: u8 = 127;

/// A blank canvas: every pixel paper.
#[must_use]
pub fn blank_canvas(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, image::Luma([PAPER]))
}

/// Stroke the closed outline of every contour onto `canvas` in ink.
///
/// `line_thickness` is the stroke width in pixels. Single-point contours
/// become a dot of the same diameter.
#[allow(clippy::cast_precision_loss)]
pub fn draw_polygons(canvas: &mut GrayImage, contours: &[Contour], line_thickness: u32) {
    let (width, height) = canvas.dimensions();
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return;
    };
    let line_width = line_thickness.max(1) as f32;

    let mut outlines = PathBuilder::new();
    let mut dots = PathBuilder::new();
    for contour in contours {
        let points = contour.points();
        match points {
            [] => {}
            [only] => {
                let (x, y) = pixel_centre(only.x, only.y);
                dots.push_circle(x, y, line_width / 2.0);
            }
            [first, rest @ ..] => {
                let (x, y) = pixel_centre(first.x, first.y);
                outlines.move_to(x, y);
                for p in rest {
                    let (x, y) = pixel_centre(p.x, p.y);
                    outlines.line_to(x, y);
                }
                outlines.close();
            }
        }
    }

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = false;

    if let Some(path) = outlines.finish() {
        let stroke = Stroke {
            width: line_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    if let Some(path) = dots.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    for (pixel, rgba) in canvas.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        if rgba[3] > COVERAGE_THRESHOLD {
            pixel.0[0] = INK;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn pixel_centre(x: f64, y: f64) -> (f32, f32) {
    ((x + 0.5) as f32, (y + 0.5) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn square(min: f64, max: f64) -> Contour {
        Contour::new(vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ])
    }

    fn is_ink(canvas: &GrayImage, x: u32, y: u32) -> bool {
        canvas.get_pixel(x, y).0[0] == INK
    }

    #[test]
    fn blank_canvas_is_all_paper() {
        assert!(blank_canvas(4, 3).pixels().all(|p| p.0[0] == PAPER));
    }

    #[test]
    fn thin_outline_follows_polygon() {
        let mut canvas = blank_canvas(12, 12);
        draw_polygons(&mut canvas, &[square(2.0, 8.0)], 1);
        assert!(is_ink(&canvas, 5, 2));
        assert!(is_ink(&canvas, 8, 5));
        assert!(is_ink(&canvas, 5, 8));
        assert!(is_ink(&canvas, 2, 5));
        assert!(!is_ink(&canvas, 5, 5));
        assert!(!is_ink(&canvas, 0, 0));
        assert!(!is_ink(&canvas, 11, 11));
    }

    #[test]
    fn thickness_widens_stroke() {
        let mut canvas = blank_canvas(16, 16);
        draw_polygons(&mut canvas, &[square(2.0, 12.0)], 3);
        assert!(is_ink(&canvas, 7, 1));
        assert!(is_ink(&canvas, 7, 2));
        assert!(is_ink(&canvas, 7, 3));
        assert!(!is_ink(&canvas, 7, 5));
        assert!(!is_ink(&canvas, 7, 7));
    }

    #[test]
    fn canvas_stays_two_level() {
        let mut canvas = blank_canvas(20, 20);
        let diamond = Contour::new(vec![
            Point::new(10.0, 2.0),
            Point::new(17.0, 10.0),
            Point::new(10.0, 17.0),
            Point::new(3.0, 10.0),
        ]);
        draw_polygons(&mut canvas, &[diamond], 2);
        assert!(canvas.pixels().all(|p| p.0[0] == INK || p.0[0] == PAPER));
        assert!(canvas.pixels().any(|p| p.0[0] == INK));
    }

    #[test]
    fn single_point_contour_draws_a_dot() {
        let mut canvas = blank_canvas(9, 9);
        draw_polygons(&mut canvas, &[Contour::new(vec![Point::new(4.0, 4.0)])], 3);
        assert!(is_ink(&canvas, 4, 4));
        assert!(!is_ink(&canvas, 0, 0));
    }

    #[test]
    fn no_contours_leave_canvas_blank() {
        let mut canvas = blank_canvas(5, 5);
        draw_polygons(&mut canvas, &[], 2);
        assert_eq!(canvas, blank_canvas(5, 5));
    }
}
