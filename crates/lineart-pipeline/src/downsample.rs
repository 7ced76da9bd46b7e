//! Bound the working resolution.
//!
//! Reduces the decoded image so its longest side equals `max_dimension`,
//! averaging every source pixel that falls inside each destination pixel.
//! Images already within the bound are returned unchanged; this step
//! never upscales.

use image::RgbImage;

/// Target size for a `width`×`height` image bounded by `max_dimension`.
///
/// Returns `None` when no resize is needed. Each side is scaled by
/// `max_dimension / longest_side` and truncated, but never below 1.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops
)]
pub fn target_size(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let long_axis = width.max(height);
    if long_axis <= max_dimension {
        return None;
    }

    let scale = f64::from(max_dimension) / f64::from(long_axis);
    let w = ((f64::from(width) * scale) as u32).max(1);
    let h = ((f64::from(height) * scale) as u32).max(1);
    Some((w, h))
}

/// Downsample so the longest side is at most `max_dimension` pixels.
///
/// Returns the (possibly unchanged) image and whether resizing was
/// applied.
#[must_use]
pub fn downsample(image: RgbImage, max_dimension: u32) -> (RgbImage, bool) {
    match target_size(image.width(), image.height(), max_dimension) {
        None => (image, false),
        Some((w, h)) => (image::imageops::thumbnail(&image, w, h), true),
    }
}
