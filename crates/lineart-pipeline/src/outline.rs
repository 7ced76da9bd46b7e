//! Legacy single-pass outline: Gaussian blur plus hysteresis edges.
//!
//! Unlike the coloring-page pipeline there is no resizing, smoothing,
//! quantization or compositing. Edges come out white on black unless
//! inverted.

use crate::blur::gaussian_blur_kernel;
use crate::edge;
use crate::encode::finalize;
use crate::grayscale::{decode, to_gray};
use crate::types::{Dimensions, OutlineArt, OutlineParams, PipelineError};

/// Run the outline operation on raw image bytes.
///
/// # Errors
///
/// Returns a decode-kind [`PipelineError`] if the bytes are not a usable
/// image, [`PipelineError::InvalidConfig`] if `blur_kernel` is below 1
/// after parity coercion, or [`PipelineError::Encode`] if PNG encoding
/// fails.
#[allow(clippy::cast_precision_loss)]
pub fn outline(bytes: &[u8], params: &OutlineParams) -> Result<OutlineArt, PipelineError> {
    let rgb = decode(bytes)?;
    let dimensions = Dimensions::of(&rgb);
    let gray = to_gray(&rgb);
    let blurred = gaussian_blur_kernel(&gray, params.blur_kernel)?;
    let edges = edge::canny(
        &blurred,
        params.low_threshold as f32,
        params.high_threshold as f32,
    );
    tracing::debug!(
        width = dimensions.width,
        height = dimensions.height,
        blur_kernel = params.blur_kernel,
        invert = params.invert_colors,
        "outline computed"
    );

    let (raster, encoded) = finalize(edges, params.invert_colors)?;
    Ok(OutlineArt {
        encoded,
        raster,
        dimensions,
    })
}
