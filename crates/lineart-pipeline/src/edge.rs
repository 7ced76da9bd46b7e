//! Binary edge maps from the smoothed image.
//!
//! Two strategies produce an ink-on-paper edge map (edges 0, background
//! 255):
//!
//! - [`gradient_edges`]: Sobel gradient magnitude, rescaled to the full
//!   0..=255 range, then hysteresis edges on that magnitude image.
//! - [`combined_edges`]: median blur, then the union of an adaptive
//!   local threshold (soft edges) and fixed-threshold hysteresis edges
//!   (strong edges), cleaned with a 2×2 closing and dilation.

use image::{GrayImage, Luma};

use crate::blur::median_blur;
use crate::morphology;
use crate::types::EdgeStrategy;

/// Minimum allowed hysteresis threshold.
///
/// A low threshold of zero makes every pixel with any gradient a
/// candidate edge, producing an edge map dense enough to swamp the
/// composite.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Median kernel applied before the combined detector.
pub const COMBINED_MEDIAN_KERNEL: u32 = 5;

/// Fixed hysteresis thresholds of the combined detector.
pub const COMBINED_CANNY_LOW: f32 = 50.0;
/// See [`COMBINED_CANNY_LOW`].
pub const COMBINED_CANNY_HIGH: f32 = 150.0;

/// Adaptive threshold neighbourhood side.
pub const ADAPTIVE_BLOCK_SIZE: u32 = 9;
/// Adaptive threshold bias: how much darker than the local mean a pixel
/// must be.
pub const ADAPTIVE_BIAS: i16 = 2;

/// Structuring element of the combined detector's cleanup.
pub const COMBINED_CLEANUP_SIDE: u32 = 2;

/// Detect edges using hysteresis thresholding.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    crate::canny::canny(image, low, high)
}

/// Invert a raster (bitwise NOT).
///
/// Swaps edge pixels (255 → 0) and background pixels (0 → 255).
#[must_use = "returns the inverted image"]
pub fn invert(image: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([!image.get_pixel(x, y).0[0]])
    })
}

/// Pixel-wise OR of two binary maps of equal size.
#[must_use = "returns the union"]
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}

/// Sobel gradient magnitude, min/max rescaled to 0..=255.
///
/// Values are truncated after rescaling. A flat image (no gradient
/// spread) maps to all zeros.
#[must_use = "returns the gradient magnitude image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gradient_magnitude(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (gx, gy) = crate::canny::sobel_gradients(gray);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(h, v)| f32::from(h.0[0]).hypot(f32::from(v.0[0])))
        .collect();

    let (min, max) = magnitude
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &m| {
            (lo.min(m), hi.max(m))
        });
    let range = max - min;

    let data = if range > 0.0 {
        let scale = 255.0 / range;
        magnitude
            .iter()
            .map(|&m| ((m - min) * scale).clamp(0.0, 255.0) as u8)
            .collect()
    } else {
        vec![0; magnitude.len()]
    };

    GrayImage::from_raw(width, height, data)
        .unwrap_or_else(|| GrayImage::new(width, height))
}

/// Adaptive local threshold.
///
/// A pixel is foreground (255) when it is at most the Gaussian-weighted
/// mean of its `block_size`×`block_size` neighbourhood minus `bias`;
/// otherwise 0. Neighbourhoods extend past the border by repeating edge
/// pixels. Even block sizes are rounded up to the next odd side.
#[must_use = "returns the binary threshold map"]
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, bias: i16) -> GrayImage {
    let weights = gaussian_weights(block_size);
    let means = imageproc::filter::separable_filter_equal(gray, weights.as_slice());
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = i16::from(gray.get_pixel(x, y).0[0]);
        let local = i16::from(means.get_pixel(x, y).0[0]);
        Luma([if value <= local - bias { 255 } else { 0 }])
    })
}

/// Normalised 1-D Gaussian taps over an odd window of `block_size`, with
/// sigma `0.3 * (radius - 1) + 0.8`.
#[allow(clippy::cast_precision_loss)]
fn gaussian_weights(block_size: u32) -> Vec<f32> {
    let side = block_size.max(1) | 1;
    let radius = (side / 2) as f32;
    let sigma = 0.3f32.mul_add(radius - 1.0, 0.8);
    let raw: Vec<f32> = (0..side)
        .map(|i| {
            let d = i as f32 - radius;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Edge map of the bilateral variant: hysteresis edges on the rescaled
/// gradient magnitude, inverted to ink on paper.
#[must_use = "returns the edge map"]
pub fn gradient_edges(gray: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let magnitude = gradient_magnitude(gray);
    invert(&canny(&magnitude, low_threshold, high_threshold))
}

/// Edge map of the mean-shift variant.
///
/// Median blur, then adaptive threshold OR fixed hysteresis edges,
/// inverted to ink on paper, then one closing and one dilation with a
/// 2×2 element.
#[must_use = "returns the edge map"]
pub fn combined_edges(gray: &GrayImage) -> GrayImage {
    let blurred = median_blur(gray, COMBINED_MEDIAN_KERNEL);
    let soft = adaptive_threshold(&blurred, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_BIAS);
    let strong = canny(&blurred, COMBINED_CANNY_LOW, COMBINED_CANNY_HIGH);
    let edges = invert(&union(&soft, &strong));
    let closed = morphology::close(&edges, COMBINED_CLEANUP_SIDE);
    morphology::dilate(&closed, COMBINED_CLEANUP_SIDE)
}

/// Edge map of the smoothed image's grayscale under `strategy`.
#[must_use = "returns the edge map"]
pub fn extract_edges(gray: &GrayImage, strategy: EdgeStrategy) -> GrayImage {
    match strategy {
        EdgeStrategy::Gradient { low, high } => gradient_edges(gray, low, high),
        EdgeStrategy::Combined => combined_edges(gray),
    }
}
