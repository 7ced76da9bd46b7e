//! Shared types for the line-art pipeline.

use serde::{Deserialize, Serialize};

use crate::composite::FinishPreset;
use crate::contour::ContourPreset;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`: decoded input is always three-channel.
pub use image::RgbImage;

/// Intensity of ink (lines) in every binary raster the pipeline produces.
pub const INK: u8 = 0;

/// Intensity of paper (background) in every binary raster the pipeline
/// produces.
pub const PAPER: u8 = 255;

/// Largest accepted stroke width in pixels.
pub const MAX_LINE_THICKNESS: u32 = 255;

/// Largest accepted bilateral window radius in pixels.
pub const MAX_BILATERAL_RADIUS: i64 = 64;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A closed boundary: the last point connects back to the first.
///
/// Contours only live between tracing and drawing; nothing retains
/// them once the canvas is painted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a contour from its ring of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of points on the ring.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Enclosed area (shoelace formula), independent of winding order.
    #[must_use]
    pub fn area(&self) -> f64 {
        let n = self.0.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.0[i];
                let b = self.0[(i + 1) % n];
                a.x.mul_add(b.y, -(b.x * a.y))
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Length of the closed ring, including the closing segment.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        let n = self.0.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| self.0[i].distance(self.0[(i + 1) % n]))
            .sum()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Edge-preserving smoothing applied after resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// Bilateral filter over a circular window.
    Bilateral {
        /// Window diameter; non-positive derives it from `sigma_space`.
        diameter: i32,
        /// Colour falloff. Larger merges more colour variation.
        sigma_color: f64,
        /// Spatial falloff. Larger merges farther pixels.
        sigma_space: f64,
    },
    /// Mean-shift mode seeking in joint position/colour space.
    MeanShift {
        /// Spatial window radius in pixels.
        spatial_radius: u32,
        /// Colour window radius (Euclidean RGB distance).
        color_radius: f64,
    },
}

/// How the binary edge map is derived from the smoothed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeStrategy {
    /// Hysteresis edges on the rescaled Sobel gradient magnitude.
    Gradient {
        /// Hysteresis low threshold.
        low: f32,
        /// Hysteresis high threshold.
        high: f32,
    },
    /// Median blur, then adaptive threshold OR fixed-threshold hysteresis
    /// edges, inverted and cleaned with a 2×2 closing and dilation.
    Combined,
}

/// Thresholds the degenerate-output guard derives its softer detector from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackThresholds {
    /// The request's hysteresis low threshold (halved, floored at 10).
    pub canny_low: i64,
    /// The request's hysteresis high threshold (halved, floored at 50).
    pub canny_high: i64,
}

/// Immutable per-request configuration for one pipeline run.
///
/// Built from [`XdogParams`] or [`HfParams`]; never shared between
/// requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParameters {
    /// Larger image side after resizing.
    pub max_dimension: u32,
    /// Edge-preserving smoothing.
    pub smoothing: Smoothing,
    /// Edge map strategy.
    pub edges: EdgeStrategy,
    /// Requested cluster count; clamped to [2, 12] by the quantizer.
    pub clusters: i64,
    /// Lloyd iteration cap per k-means attempt.
    pub kmeans_iterations: u32,
    /// Threshold sweep and polygon tolerance.
    pub contour: ContourPreset,
    /// Morphological cleanup after compositing.
    pub finish: FinishPreset,
    /// `Some` when the near-blank guard is enabled.
    pub fallback: Option<FallbackThresholds>,
    /// Stroke width in pixels (at least 1).
    pub line_thickness: u32,
    /// Contours must enclose strictly more than this area.
    pub min_area: f64,
    /// Swap ink and paper in the encoded output.
    pub invert_colors: bool,
}

/// Request parameters of the bilateral-smoothing coloring variant.
///
/// Integer fields mirror the HTTP form fields one to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XdogParams {
    /// Max image dimension for processing.
    pub resize_max: i64,
    /// Bilateral filter diameter.
    pub bilateral_d: i64,
    /// Bilateral colour sigma.
    pub bilateral_sigma_color: i64,
    /// Bilateral spatial sigma.
    pub bilateral_sigma_space: i64,
    /// Colour quantization clusters.
    pub k_clusters: i64,
    /// Hysteresis low threshold.
    pub canny_low: i64,
    /// Hysteresis high threshold.
    pub canny_high: i64,
    /// Stroke width.
    pub line_thickness: i64,
    /// Minimum enclosed contour area.
    pub min_area: i64,
    /// Invert final image colours.
    pub invert_colors: bool,
}

impl XdogParams {
    /// Default max image dimension.
    pub const DEFAULT_RESIZE_MAX: i64 = 1024;
    /// Default bilateral diameter.
    pub const DEFAULT_BILATERAL_D: i64 = 9;
    /// Default bilateral colour sigma.
    pub const DEFAULT_BILATERAL_SIGMA_COLOR: i64 = 75;
    /// Default bilateral spatial sigma.
    pub const DEFAULT_BILATERAL_SIGMA_SPACE: i64 = 75;
    /// Default cluster count.
    pub const DEFAULT_K_CLUSTERS: i64 = 6;
    /// Default hysteresis low threshold.
    pub const DEFAULT_CANNY_LOW: i64 = 50;
    /// Default hysteresis high threshold.
    pub const DEFAULT_CANNY_HIGH: i64 = 150;
    /// Default stroke width.
    pub const DEFAULT_LINE_THICKNESS: i64 = 2;
    /// Default minimum contour area.
    pub const DEFAULT_MIN_AREA: i64 = 300;

    /// Lloyd iteration cap for this variant.
    pub const KMEANS_ITERATIONS: u32 = 15;

    /// Lower into the immutable per-run record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when `resize_max`,
    /// `line_thickness` or the bilateral window is out of range.
    pub fn to_parameters(&self) -> Result<PipelineParameters, PipelineError> {
        bilateral_radius(self.bilateral_d, self.bilateral_sigma_space)?;
        Ok(PipelineParameters {
            max_dimension: positive_u32("resize_max", self.resize_max)?,
            smoothing: Smoothing::Bilateral {
                diameter: saturate_i32(self.bilateral_d),
                sigma_color: lossy_f64(self.bilateral_sigma_color),
                sigma_space: lossy_f64(self.bilateral_sigma_space),
            },
            edges: EdgeStrategy::Gradient {
                low: lossy_f32(self.canny_low),
                high: lossy_f32(self.canny_high),
            },
            clusters: self.k_clusters,
            kmeans_iterations: Self::KMEANS_ITERATIONS,
            contour: ContourPreset::XDOG,
            finish: FinishPreset::XDOG,
            fallback: Some(FallbackThresholds {
                canny_low: self.canny_low,
                canny_high: self.canny_high,
            }),
            line_thickness: line_thickness(self.line_thickness)?,
            min_area: lossy_f64(self.min_area),
            invert_colors: self.invert_colors,
        })
    }
}

impl Default for XdogParams {
    fn default() -> Self {
        Self {
            resize_max: Self::DEFAULT_RESIZE_MAX,
            bilateral_d: Self::DEFAULT_BILATERAL_D,
            bilateral_sigma_color: Self::DEFAULT_BILATERAL_SIGMA_COLOR,
            bilateral_sigma_space: Self::DEFAULT_BILATERAL_SIGMA_SPACE,
            k_clusters: Self::DEFAULT_K_CLUSTERS,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            line_thickness: Self::DEFAULT_LINE_THICKNESS,
            min_area: Self::DEFAULT_MIN_AREA,
            invert_colors: false,
        }
    }
}

/// Request parameters of the mean-shift coloring variant.
///
/// The resize bound, smoothing radii and edge thresholds are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HfParams {
    /// Colour quantization clusters.
    pub k: i64,
    /// Stroke width.
    pub line_thickness: i64,
    /// Minimum enclosed contour area.
    pub min_area: i64,
    /// Invert final image colours.
    pub invert_colors: bool,
}

impl HfParams {
    /// Default cluster count.
    pub const DEFAULT_K: i64 = 6;
    /// Default stroke width.
    pub const DEFAULT_LINE_THICKNESS: i64 = 2;
    /// Default minimum contour area.
    pub const DEFAULT_MIN_AREA: i64 = 300;

    /// Fixed max image dimension.
    pub const RESIZE_MAX: u32 = 1200;
    /// Fixed mean-shift spatial radius.
    pub const SPATIAL_RADIUS: u32 = 21;
    /// Fixed mean-shift colour radius.
    pub const COLOR_RADIUS: f64 = 51.0;
    /// Lloyd iteration cap for this variant.
    pub const KMEANS_ITERATIONS: u32 = 10;

    /// Lower into the immutable per-run record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when `line_thickness` is
    /// out of range.
    pub fn to_parameters(&self) -> Result<PipelineParameters, PipelineError> {
        Ok(PipelineParameters {
            max_dimension: Self::RESIZE_MAX,
            smoothing: Smoothing::MeanShift {
                spatial_radius: Self::SPATIAL_RADIUS,
                color_radius: Self::COLOR_RADIUS,
            },
            edges: EdgeStrategy::Combined,
            clusters: self.k,
            kmeans_iterations: Self::KMEANS_ITERATIONS,
            contour: ContourPreset::HF,
            finish: FinishPreset::HF,
            fallback: None,
            line_thickness: line_thickness(self.line_thickness)?,
            min_area: lossy_f64(self.min_area),
            invert_colors: self.invert_colors,
        })
    }
}

impl Default for HfParams {
    fn default() -> Self {
        Self {
            k: Self::DEFAULT_K,
            line_thickness: Self::DEFAULT_LINE_THICKNESS,
            min_area: Self::DEFAULT_MIN_AREA,
            invert_colors: false,
        }
    }
}

/// Request parameters of the legacy single-pass outline operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineParams {
    /// Hysteresis low threshold.
    pub low_threshold: i64,
    /// Hysteresis high threshold.
    pub high_threshold: i64,
    /// Gaussian kernel size; even values are bumped to the next odd one.
    pub blur_kernel: i64,
    /// Invert the edge map (dark lines on white).
    pub invert_colors: bool,
}

impl OutlineParams {
    /// Default hysteresis low threshold.
    pub const DEFAULT_LOW_THRESHOLD: i64 = 50;
    /// Default hysteresis high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: i64 = 150;
    /// Default Gaussian kernel size.
    pub const DEFAULT_BLUR_KERNEL: i64 = 5;
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            invert_colors: false,
        }
    }
}

/// Encoded output plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Serialized image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub media_type: &'static str,
}

/// Result of one coloring-page run.
#[derive(Debug, Clone)]
pub struct LineArt {
    /// The PNG-encoded page.
    pub encoded: EncodedImage,
    /// Final raster (after optional inversion).
    pub raster: GrayImage,
    /// Dimensions of the resized working image (and of the output).
    pub dimensions: Dimensions,
    /// Whether the near-blank guard replaced the composited result.
    pub fallback_used: bool,
    /// Mean intensity of the composited result, before the guard.
    pub composited_mean: f64,
}

/// Result of the legacy single-pass outline operation.
#[derive(Debug, Clone)]
pub struct OutlineArt {
    /// The PNG-encoded edge drawing.
    pub encoded: EncodedImage,
    /// Final raster (after optional inversion).
    pub raster: GrayImage,
    /// Dimensions of the decoded input (and of the output).
    pub dimensions: Dimensions,
}

/// Coarse classification of [`PipelineError`] for host boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The upload is not a usable raster (client error).
    Decode,
    /// A stage failed or the parameters were rejected (server error).
    Processing,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The image decoded to zero width or height.
    #[error("decoded image has no pixels")]
    EmptyImage,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Serializing the final raster failed.
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),
}

impl PipelineError {
    /// Which side of the boundary is at fault.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput | Self::ImageDecode(_) | Self::EmptyImage => ErrorKind::Decode,
            Self::InvalidConfig(_) | Self::Encode(_) => ErrorKind::Processing,
        }
    }
}

fn positive_u32(name: &str, value: i64) -> Result<u32, PipelineError> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v >= 1)
        .ok_or_else(|| PipelineError::InvalidConfig(format!("{name} must be at least 1, got {value}")))
}

fn line_thickness(value: i64) -> Result<u32, PipelineError> {
    let thickness = positive_u32("line_thickness", value)?;
    if thickness > MAX_LINE_THICKNESS {
        return Err(PipelineError::InvalidConfig(format!(
            "line_thickness must be at most {MAX_LINE_THICKNESS}, got {value}"
        )));
    }
    Ok(thickness)
}

/// Window radius the bilateral filter will use: `diameter / 2`, or
/// `round(1.5 * sigma_space)` when `diameter` is not positive.
fn bilateral_radius(diameter: i64, sigma_space: i64) -> Result<i64, PipelineError> {
    let radius = if diameter > 0 {
        diameter / 2
    } else {
        sigma_space.max(1).saturating_mul(3).saturating_add(1) / 2
    };
    if radius > MAX_BILATERAL_RADIUS {
        return Err(PipelineError::InvalidConfig(format!(
            "bilateral window radius must be at most {MAX_BILATERAL_RADIUS}, got {radius} \
             (bilateral_d={diameter}, bilateral_sigma_space={sigma_space})"
        )));
    }
    Ok(radius)
}

#[allow(clippy::cast_precision_loss)]
const fn lossy_f64(value: i64) -> f64 {
    value as f64
}

#[allow(clippy::cast_precision_loss)]
const fn lossy_f32(value: i64) -> f32 {
    value as f32
}

#[allow(clippy::cast_possible_truncation)]
fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
