//! Near-blank output guard.
//!
//! When the composite leaves almost nothing but paper, it is replaced by a
//! single-pass edge drawing of the grayscale image: 3×3 median blur,
//! hysteresis edges at softened thresholds, inversion to ink on paper,
//! and a dilation sized to the stroke width.

use image::GrayImage;

use crate::blur::median_blur;
use crate::edge;
use crate::grayscale::mean_intensity;
use crate::morphology;
use crate::types::FallbackThresholds;

/// Composited means strictly above this count as degenerate.
pub const DEGENERATE_MEAN: f64 = 250.0;

/// Median kernel applied before the fallback detector.
pub const MEDIAN_KERNEL: u32 = 3;

/// Floor of the softened low threshold.
pub const MIN_SOFT_LOW: i64 = 10;

/// Floor of the softened high threshold.
pub const MIN_SOFT_HIGH: i64 = 50;

/// Whether a composited raster is almost entirely paper.
#[must_use]
pub fn is_degenerate(composited: &GrayImage) -> bool {
    mean_intensity(composited) > DEGENERATE_MEAN
}

/// The request's thresholds halved (rounding down) and floored at
/// [`MIN_SOFT_LOW`] / [`MIN_SOFT_HIGH`].
#[must_use]
pub fn soft_thresholds(thresholds: FallbackThresholds) -> (i64, i64) {
    (
        thresholds.canny_low.div_euclid(2).max(MIN_SOFT_LOW),
        thresholds.canny_high.div_euclid(2).max(MIN_SOFT_HIGH),
    )
}

/// Single-pass edge drawing of `gray`, ink on paper.
#[must_use = "returns the fallback drawing"]
#[allow(clippy::cast_precision_loss)]
pub fn fallback_edges(gray: &GrayImage, thresholds: FallbackThresholds, line_thickness: u32) -> GrayImage {
    let (low, high) = soft_thresholds(thresholds);
    let blurred = median_blur(gray, MEDIAN_KERNEL);
    let edges = edge::canny(&blurred, low as f32, high as f32);
    morphology::dilate(&edge::invert(&edges), line_thickness.max(1))
}

/// Replace `composited` with [`fallback_edges`] of `original_gray` when
/// it is degenerate.
///
/// Returns the raster to keep and whether the fallback fired.
#[must_use]
pub fn apply_fallback_if_degenerate(
    composited: GrayImage,
    original_gray: &GrayImage,
    thresholds: FallbackThresholds,
    line_thickness: u32,
) -> (GrayImage, bool) {
    let mean = mean_intensity(&composited);
    if mean <= DEGENERATE_MEAN {
        return (composited, false);
    }
    tracing::warn!(
        mean,
        threshold = DEGENERATE_MEAN,
        "composite is nearly blank, falling back to single-pass edges"
    );
    (fallback_edges(original_gray, thresholds, line_thickness), true)
}
