//! lineart-pipeline: Pure line-art / coloring-page pipeline (sans-IO).
//!
//! Converts raster photos into black-on-white line art through:
//! decode -> resize -> smooth -> edge map -> colour quantization ->
//! contour canvas -> composite -> near-blank guard -> PNG.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns encoded bytes plus metadata. The HTTP host
//! lives in `lineart-server`.

pub mod blur;
pub mod canny;
pub mod composite;
pub mod contour;
pub mod diagnostics;
pub mod downsample;
pub mod draw;
pub mod edge;
pub mod encode;
pub mod fallback;
pub mod grayscale;
pub mod morphology;
pub mod outline;
pub mod pipeline;
pub mod quantize;
pub mod simplify;
pub mod smooth;
pub mod types;

pub use composite::FinishPreset;
pub use contour::ContourPreset;
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use outline::outline;
pub use pipeline::Pipeline;
pub use types::{
    Contour, Dimensions, EdgeStrategy, EncodedImage, ErrorKind, FallbackThresholds, HfParams,
    LineArt, OutlineArt, OutlineParams, PipelineError, PipelineParameters, Point, Smoothing,
    XdogParams,
};

/// Run the full coloring-page pipeline.
///
/// # Pipeline steps
///
/// 1. Decode to a three-channel image
/// 2. Bound the longest side to `max_dimension`
/// 3. Edge-preserving smoothing (bilateral or mean shift)
/// 4. Ink-on-paper edge map
/// 5. Seeded k-means colour quantization
/// 6. Threshold-sweep contours stroked onto a blank canvas
/// 7. Merge canvas and edges, then morphological finish
/// 8. Near-blank guard (when enabled)
/// 9. Optional inversion and PNG encoding
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] / [`PipelineError::EmptyImage`] if it is
/// not a usable image, and [`PipelineError::Encode`] if PNG encoding
/// fails.
pub fn process(
    image_bytes: &[u8],
    params: &PipelineParameters,
) -> Result<LineArt, PipelineError> {
    Pipeline::new(image_bytes, params.clone())
        .decode()?
        .resize()
        .smooth()
        .detect_edges()
        .quantize()
        .trace_contours()
        .composite()
        .guard()
        .encode()
}

/// Bilateral-smoothing variant with the near-blank guard.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for out-of-range
/// `resize_max` or `line_thickness`, otherwise as [`process`].
pub fn process_xdog(image_bytes: &[u8], params: &XdogParams) -> Result<LineArt, PipelineError> {
    process(image_bytes, &params.to_parameters()?)
}

/// Mean-shift variant with combined edges.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an out-of-range
/// `line_thickness`, otherwise as [`process`].
pub fn process_hf(image_bytes: &[u8], params: &HfParams) -> Result<LineArt, PipelineError> {
    process(image_bytes, &params.to_parameters()?)
}
