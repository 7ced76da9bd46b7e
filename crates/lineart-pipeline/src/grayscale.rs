//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF, TIFF) and produces
//! a three-channel colour buffer; any alpha channel is discarded. The
//! grayscale helpers use the BT.601 luma weights so every stage that
//! needs intensity (edge detection, the quantized proxy, the fallback)
//! agrees on the same conversion.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::types::PipelineError;

/// Fixed-point (14-bit) BT.601 weights: 0.299, 0.587, 0.114.
const WEIGHT_R: u32 = 4899;
const WEIGHT_G: u32 = 9617;
const WEIGHT_B: u32 = 1868;
const WEIGHT_SHIFT: u32 = 14;
const _: () = assert!(WEIGHT_R + WEIGHT_G + WEIGHT_B == 1 << WEIGHT_SHIFT);

/// Decode raw image bytes into an RGB buffer.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt, and [`PipelineError::EmptyImage`]
/// if it decodes to zero width or height.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PipelineError::EmptyImage);
    }
    Ok(rgb)
}

/// Luma of a single colour, rounded to the nearest integer.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn luma(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let weighted = r as u32 * WEIGHT_R + g as u32 * WEIGHT_G + b as u32 * WEIGHT_B;
    ((weighted + (1 << (WEIGHT_SHIFT - 1))) >> WEIGHT_SHIFT) as u8
}

/// Convert an RGB image to single-channel intensity.
#[must_use = "returns the grayscale image"]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(*image.get_pixel(x, y))])
    })
}

/// Mean pixel intensity; 0.0 for an empty image.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_intensity(image: &GrayImage) -> f64 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
    sum as f64 / raw.len() as f64
}
