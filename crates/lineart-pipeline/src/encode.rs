//! Output polarity and lossless serialisation.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};

use crate::edge::invert;
use crate::types::{EncodedImage, PipelineError};

/// Media type of every encoded result.
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// Encode a single-channel raster as PNG.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the PNG encoder fails.
pub fn encode_png(image: &GrayImage) -> Result<EncodedImage, PipelineError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .map_err(PipelineError::Encode)?;
    Ok(EncodedImage {
        bytes,
        media_type: PNG_MEDIA_TYPE,
    })
}

/// Apply the requested polarity, then encode.
///
/// Returns the raster that was encoded alongside the encoding.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the PNG encoder fails.
pub fn finalize(image: GrayImage, invert_colors: bool) -> Result<(GrayImage, EncodedImage), PipelineError> {
    let image = if invert_colors { invert(&image) } else { image };
    let encoded = encode_png(&image)?;
    Ok((image, encoded))
}
