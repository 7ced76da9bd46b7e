//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::process`] and the diagnostics runner both drive this
//! typestate chain; callers that want the intermediates can drive it
//! themselves:
//!
//! ```rust
//! # use lineart_pipeline::{Pipeline, PipelineError, XdogParams};
//! # fn run(png: &[u8]) -> Result<(), PipelineError> {
//! let params = XdogParams::default().to_parameters()?;
//! let art = Pipeline::new(png, params)
//!     .decode()?
//!     .resize()
//!     .smooth()
//!     .detect_edges()
//!     .quantize()
//!     .trace_contours()
//!     .composite()
//!     .guard()
//!     .encode()?;
//! # let _ = art;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state. A stage
//! carries only the intermediates later stages still read: the edge map
//! lives until compositing and the smoothed grayscale until the guard.

use crate::composite;
use crate::contour;
use crate::diagnostics::{StageMetrics, count_ink_pixels};
use crate::downsample;
use crate::edge;
use crate::encode;
use crate::fallback;
use crate::grayscale;
use crate::quantize::{self, Quantization};
use crate::smooth;
use crate::types::{
    Dimensions, EdgeStrategy, GrayImage, LineArt, PipelineError, PipelineParameters, RgbImage,
    Smoothing,
};

/// Entry point of the typestate chain.
pub struct Pipeline;

impl Pipeline {
    /// Start a run over `source` with `params`.
    pub const fn new(source: &[u8], params: PipelineParameters) -> Pending<'_> {
        Pending { params, source }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing — call .decode() to continue"]
pub struct Pending<'a> {
    params: PipelineParameters,
    source: &'a [u8],
}

impl Pending<'_> {
    /// The raw source image bytes.
    #[must_use]
    pub const fn source(&self) -> &[u8] {
        self.source
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty, [`PipelineError::ImageDecode`] if they are not a supported
    /// image and [`PipelineError::EmptyImage`] if the image has no pixels.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let image = grayscale::decode(self.source)?;
        tracing::debug!(
            bytes = self.source.len(),
            width = image.width(),
            height = image.height(),
            "decoded"
        );
        Ok(Decoded {
            params: self.params,
            image,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding; the image is three-channel.
#[must_use = "pipeline stages are consumed by advancing — call .resize() to continue"]
pub struct Decoded {
    params: PipelineParameters,
    image: RgbImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded colour image.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.image
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dimensions = Dimensions::of(&self.image);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        }
    }

    /// Bound the longest side to `max_dimension` and advance.
    pub fn resize(self) -> Resized {
        let (image, applied) = downsample::downsample(self.image, self.params.max_dimension);
        let dimensions = Dimensions::of(&image);
        tracing::debug!(
            width = dimensions.width,
            height = dimensions.height,
            applied,
            "resized"
        );
        Resized {
            params: self.params,
            image,
            dimensions,
            applied,
        }
    }
}

// ───────────────────────── Stage 2: Resized ──────────────────────────

/// Pipeline state after bounding the working size.
///
/// Every later raster has these dimensions.
#[must_use = "pipeline stages are consumed by advancing — call .smooth() to continue"]
pub struct Resized {
    params: PipelineParameters,
    image: RgbImage,
    dimensions: Dimensions,
    applied: bool,
}

impl Resized {
    /// The working-size colour image.
    #[must_use]
    pub const fn resized(&self) -> &RgbImage {
        &self.image
    }

    /// Whether the image was actually shrunk.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Resize {
            width: self.dimensions.width,
            height: self.dimensions.height,
            applied: self.applied,
        }
    }

    /// Apply the configured edge-preserving smoothing and advance.
    pub fn smooth(self) -> Smoothed {
        let smoothed = smooth::smooth(&self.image, self.params.smoothing);
        let gray = grayscale::to_gray(&smoothed);
        tracing::debug!(smoothing = ?self.params.smoothing, "smoothed");
        Smoothed {
            params: self.params,
            dimensions: self.dimensions,
            smoothed,
            gray,
        }
    }
}

// ───────────────────────── Stage 3: Smoothed ─────────────────────────

/// Pipeline state after smoothing.
#[must_use = "pipeline stages are consumed by advancing — call .detect_edges() to continue"]
pub struct Smoothed {
    params: PipelineParameters,
    dimensions: Dimensions,
    smoothed: RgbImage,
    gray: GrayImage,
}

impl Smoothed {
    /// The smoothed colour image.
    #[must_use]
    pub const fn smoothed(&self) -> &RgbImage {
        &self.smoothed
    }

    /// Grayscale of the smoothed image.
    #[must_use]
    pub const fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let filter = match self.params.smoothing {
            Smoothing::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => format!("bilateral d={diameter} sc={sigma_color} ss={sigma_space}"),
            Smoothing::MeanShift {
                spatial_radius,
                color_radius,
            } => format!("mean-shift sp={spatial_radius} sr={color_radius}"),
        };
        StageMetrics::Smooth { filter }
    }

    /// Build the ink-on-paper edge map and advance.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = edge::extract_edges(&self.gray, self.params.edges);
        tracing::debug!(
            strategy = ?self.params.edges,
            ink = count_ink_pixels(&edges),
            "edges detected"
        );
        EdgesDetected {
            params: self.params,
            dimensions: self.dimensions,
            smoothed: self.smoothed,
            gray: self.gray,
            edges,
        }
    }
}

// ───────────────────────── Stage 4: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
#[must_use = "pipeline stages are consumed by advancing — call .quantize() to continue"]
pub struct EdgesDetected {
    params: PipelineParameters,
    dimensions: Dimensions,
    smoothed: RgbImage,
    gray: GrayImage,
    edges: GrayImage,
}

impl EdgesDetected {
    /// The edge map (edges are ink).
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let strategy = match self.params.edges {
            EdgeStrategy::Gradient { low, high } => format!("gradient low={low} high={high}"),
            EdgeStrategy::Combined => "combined".to_string(),
        };
        StageMetrics::Edges {
            strategy,
            ink_pixel_count: count_ink_pixels(&self.edges),
            total_pixel_count: self.dimensions.pixel_count(),
        }
    }

    /// Cluster the smoothed colours and advance.
    pub fn quantize(self) -> Quantized {
        let quantization = quantize::quantize(
            &self.smoothed,
            self.params.clusters,
            self.params.kmeans_iterations,
        );
        let proxy = quantization.proxy();
        tracing::debug!(
            requested = self.params.clusters,
            clusters = quantization.palette.len(),
            "quantized"
        );
        Quantized {
            params: self.params,
            dimensions: self.dimensions,
            gray: self.gray,
            edges: self.edges,
            quantization,
            proxy,
        }
    }
}

// ───────────────────────── Stage 5: Quantized ────────────────────────

/// Pipeline state after colour quantization.
#[must_use = "pipeline stages are consumed by advancing — call .trace_contours() to continue"]
pub struct Quantized {
    params: PipelineParameters,
    dimensions: Dimensions,
    gray: GrayImage,
    edges: GrayImage,
    quantization: Quantization,
    proxy: GrayImage,
}

impl Quantized {
    /// Labels and palette.
    #[must_use]
    pub const fn quantization(&self) -> &Quantization {
        &self.quantization
    }

    /// Grayscale of the quantized image.
    #[must_use]
    pub const fn proxy(&self) -> &GrayImage {
        &self.proxy
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Quantize {
            requested: self.params.clusters,
            clusters: self.quantization.palette.len(),
            max_iterations: self.params.kmeans_iterations,
        }
    }

    /// Trace and draw region outlines of the proxy, then advance.
    pub fn trace_contours(self) -> ContoursTraced {
        let (canvas, contour_count) = contour::contour_canvas(
            &self.proxy,
            &self.params.contour,
            self.params.min_area,
            self.params.line_thickness,
        );
        tracing::debug!(contour_count, "contours traced");
        ContoursTraced {
            params: self.params,
            dimensions: self.dimensions,
            gray: self.gray,
            edges: self.edges,
            canvas,
            contour_count,
        }
    }
}

// ───────────────────────── Stage 6: ContoursTraced ───────────────────

/// Pipeline state after drawing the contour canvas.
#[must_use = "pipeline stages are consumed by advancing — call .composite() to continue"]
pub struct ContoursTraced {
    params: PipelineParameters,
    dimensions: Dimensions,
    gray: GrayImage,
    edges: GrayImage,
    canvas: GrayImage,
    contour_count: usize,
}

impl ContoursTraced {
    /// Outlines stroked on a blank page.
    #[must_use]
    pub const fn canvas(&self) -> &GrayImage {
        &self.canvas
    }

    /// Number of outlines drawn.
    #[must_use]
    pub const fn contour_count(&self) -> usize {
        self.contour_count
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Contours {
            contour_count: self.contour_count,
            ink_pixel_count: count_ink_pixels(&self.canvas),
        }
    }

    /// Merge canvas and edges, apply the finish and advance.
    pub fn composite(self) -> Composited {
        let composited = composite::composite(
            &self.canvas,
            &self.edges,
            self.params.finish,
            self.params.line_thickness,
        );
        let mean = grayscale::mean_intensity(&composited);
        tracing::debug!(mean, "composited");
        Composited {
            params: self.params,
            dimensions: self.dimensions,
            gray: self.gray,
            contour_count: self.contour_count,
            composited,
            mean,
        }
    }
}

// ───────────────────────── Stage 7: Composited ───────────────────────

/// Pipeline state after compositing.
#[must_use = "pipeline stages are consumed by advancing — call .guard() to continue"]
pub struct Composited {
    params: PipelineParameters,
    dimensions: Dimensions,
    gray: GrayImage,
    contour_count: usize,
    composited: GrayImage,
    mean: f64,
}

impl Composited {
    /// The composited raster.
    #[must_use]
    pub const fn composited(&self) -> &GrayImage {
        &self.composited
    }

    /// Mean intensity of the composited raster.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Diagnostics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Composite {
            mean: self.mean,
            ink_pixel_count: count_ink_pixels(&self.composited),
        }
    }

    /// Replace a near-blank composite with the fallback drawing when the
    /// guard is enabled, then advance.
    pub fn guard(self) -> Guarded {
        let (raster, fallback_used) = match self.params.fallback {
            Some(thresholds) => fallback::apply_fallback_if_degenerate(
                self.composited,
                &self.gray,
                thresholds,
                self.params.line_thickness,
            ),
            None => (self.composited, false),
        };
        Guarded {
            params: self.params,
            dimensions: self.dimensions,
            contour_count: self.contour_count,
            composited_mean: self.mean,
            raster,
            fallback_used,
        }
    }
}

// ───────────────────────── Stage 8: Guarded ──────────────────────────

/// Final raster, before polarity and encoding.
#[must_use = "call .encode() to produce the LineArt"]
pub struct Guarded {
    params: PipelineParameters,
    dimensions: Dimensions,
    contour_count: usize,
    composited_mean: f64,
    raster: GrayImage,
    fallback_used: bool,
}

impl Guarded {
    /// The final raster (ink on paper).
    #[must_use]
    pub const fn raster(&self) -> &GrayImage {
        &self.raster
    }

    /// Whether the fallback drawing replaced the composite.
    #[must_use]
    pub const fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    /// Number of outlines drawn on the contour canvas.
    #[must_use]
    pub const fn contour_count(&self) -> usize {
        self.contour_count
    }

    /// Working dimensions (and output dimensions).
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Diagnostics for the guard, or `None` when it is disabled.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        self.params.fallback.map(|_| StageMetrics::Fallback {
            fired: self.fallback_used,
            ink_pixel_count: count_ink_pixels(&self.raster),
        })
    }

    /// Apply the requested polarity and encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if PNG encoding fails.
    pub fn encode(self) -> Result<LineArt, PipelineError> {
        let (raster, encoded) = encode::finalize(self.raster, self.params.invert_colors)?;
        tracing::debug!(
            bytes = encoded.bytes.len(),
            inverted = self.params.invert_colors,
            "encoded"
        );
        Ok(LineArt {
            encoded,
            raster,
            dimensions: self.dimensions,
            fallback_used: self.fallback_used,
            composited_mean: self.composited_mean,
        })
    }
}
