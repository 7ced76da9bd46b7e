//! Region outlines from the quantized grayscale proxy.
//!
//! The proxy is binarised at several brightness cut points. Each binary
//! map is closed, its outermost region borders are traced with
//! `imageproc::contours::find_contours`, small regions are dropped, and
//! the survivors are simplified to polygons whose tolerance scales with
//! their perimeter. Layering the cut points catches both light-on-dark
//! and dark-on-light transitions.

use image::{GrayImage, Luma};
use imageproc::contours::BorderType;

use crate::draw;
use crate::morphology;
use crate::simplify::simplify_closed;
use crate::types::{Contour, Point};

/// Threshold sweep and polygon tolerance of one pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourPreset {
    /// Brightness cut points; a pixel is foreground when strictly above.
    pub thresholds: [u8; 4],
    /// Side of the square closing element applied to each binary map.
    pub closing_side: u32,
    /// Simplification tolerance as a fraction of the contour perimeter.
    pub epsilon_fraction: f64,
}

impl ContourPreset {
    /// Bilateral variant: tighter tolerance, 3×3 closing.
    pub const XDOG: Self = Self {
        thresholds: [50, 100, 150, 200],
        closing_side: 3,
        epsilon_fraction: 0.01,
    };

    /// Mean-shift variant: looser tolerance, 2×2 closing.
    pub const HF: Self = Self {
        thresholds: [50, 100, 150, 200],
        closing_side: 2,
        epsilon_fraction: 0.02,
    };
}

/// Binary map of pixels strictly brighter than `threshold` (255), rest 0.
#[must_use = "returns the binary map"]
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] > threshold { 255 } else { 0 }])
    })
}

/// Borders of the outermost foreground regions of a binary map.
///
/// Hole borders and regions nested inside holes are skipped. Pixels
/// outside the image count as background, so a region touching the edge
/// is traced along the edge pixels themselves.
#[must_use]
pub fn outer_borders(binary: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect(),
            )
        })
        .collect()
}

/// Simplified outlines of every region enclosing more than `min_area`,
/// over all of the preset's thresholds.
#[must_use]
pub fn extract_contours(proxy: &GrayImage, preset: &ContourPreset, min_area: f64) -> Vec<Contour> {
    preset
        .thresholds
        .iter()
        .flat_map(|&threshold| {
            let binary = morphology::close(&binarize(proxy, threshold), preset.closing_side);
            let found = outer_borders(&binary);
            tracing::trace!(threshold, borders = found.len(), "traced threshold");
            found
        })
        .filter(|c| c.area() > min_area)
        .map(|c| {
            let tolerance = preset.epsilon_fraction * c.perimeter();
            simplify_closed(&c, tolerance)
        })
        .collect()
}

/// The contour canvas: every simplified outline stroked in ink on a
/// blank page.
///
/// Returns the canvas together with the number of outlines drawn.
#[must_use]
pub fn contour_canvas(
    proxy: &GrayImage,
    preset: &ContourPreset,
    min_area: f64,
    line_thickness: u32,
) -> (GrayImage, usize) {
    let contours = extract_contours(proxy, preset, min_area);
    let mut canvas = draw::blank_canvas(proxy.width(), proxy.height());
    draw::draw_polygons(&mut canvas, &contours, line_thickness);
    (canvas, contours.len())
}
