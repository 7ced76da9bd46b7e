//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`process_with_diagnostics`] drives the same stage chain as
//! [`crate::process`] and records a [`StageDiagnostics`] per stage. Time
//! is read through the [`Clock`] trait so the crate itself never touches
//! a platform timer; hosts pass a clock backed by `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{GrayImage, INK, LineArt, PipelineError, PipelineParameters};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: bounding the working size.
    pub resize: StageDiagnostics,
    /// Stage 2: edge-preserving smoothing.
    pub smooth: StageDiagnostics,
    /// Stage 3: edge map.
    pub edges: StageDiagnostics,
    /// Stage 4: colour quantization.
    pub quantize: StageDiagnostics,
    /// Stage 5: contour tracing and drawing.
    pub contours: StageDiagnostics,
    /// Stage 6: merge and finish.
    pub composite: StageDiagnostics,
    /// Stage 7: near-blank guard (only when the variant enables it).
    pub fallback: Option<StageDiagnostics>,
    /// Stage 8: polarity and PNG encoding.
    pub encode: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Working-size metrics.
    Resize {
        /// Working width in pixels.
        width: u32,
        /// Working height in pixels.
        height: u32,
        /// Whether the image was shrunk.
        applied: bool,
    },
    /// Smoothing metrics.
    Smooth {
        /// Filter and its parameters.
        filter: String,
    },
    /// Edge map metrics.
    Edges {
        /// Strategy and its thresholds.
        strategy: String,
        /// Number of edge (ink) pixels.
        ink_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Quantization metrics.
    Quantize {
        /// Cluster count as requested.
        requested: i64,
        /// Cluster count after clamping.
        clusters: usize,
        /// Lloyd iteration cap.
        max_iterations: u32,
    },
    /// Contour canvas metrics.
    Contours {
        /// Outlines drawn (across all thresholds).
        contour_count: usize,
        /// Ink pixels on the canvas.
        ink_pixel_count: u64,
    },
    /// Composite metrics.
    Composite {
        /// Mean intensity of the composited raster.
        mean: f64,
        /// Ink pixels after the finish.
        ink_pixel_count: u64,
    },
    /// Near-blank guard metrics.
    Fallback {
        /// Whether the fallback drawing replaced the composite.
        fired: bool,
        /// Ink pixels in the kept raster.
        ink_pixel_count: u64,
    },
    /// Encoding metrics.
    Encode {
        /// Size of the PNG stream.
        output_bytes: usize,
        /// Whether ink and paper were swapped.
        inverted: bool,
    },
}

/// High-level summary of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Working (and output) width in pixels.
    pub image_width: u32,
    /// Working (and output) height in pixels.
    pub image_height: u32,
    /// Working pixel count.
    pub pixel_count: u64,
    /// Outlines drawn on the contour canvas.
    pub contour_count: usize,
    /// Mean intensity of the composited raster.
    pub composited_mean: f64,
    /// Whether the fallback drawing was used.
    pub fallback_used: bool,
}

/// Run the full pipeline, timing every stage with `clock`.
///
/// # Errors
///
/// Same as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &PipelineParameters,
    clock: &C,
) -> Result<(LineArt, PipelineDiagnostics), PipelineError> {
    let invert_colors = params.invert_colors;
    let run_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(image_bytes, params.clone()).decode()?;
    let decode = stage(clock, &start, decoded.metrics());

    let start = clock.now();
    let resized = decoded.resize();
    let resize = stage(clock, &start, resized.metrics());

    let start = clock.now();
    let smoothed = resized.smooth();
    let smooth = stage(clock, &start, smoothed.metrics());

    let start = clock.now();
    let edges_detected = smoothed.detect_edges();
    let edges = stage(clock, &start, edges_detected.metrics());

    let start = clock.now();
    let quantized = edges_detected.quantize();
    let quantize = stage(clock, &start, quantized.metrics());

    let start = clock.now();
    let traced = quantized.trace_contours();
    let contours = stage(clock, &start, traced.metrics());

    let start = clock.now();
    let composited = traced.composite();
    let composite = stage(clock, &start, composited.metrics());

    let start = clock.now();
    let guarded = composited.guard();
    let fallback = guarded
        .metrics()
        .map(|metrics| stage(clock, &start, metrics));
    let contour_count = guarded.contour_count();

    let start = clock.now();
    let art = guarded.encode()?;
    let encode = stage(
        clock,
        &start,
        StageMetrics::Encode {
            output_bytes: art.encoded.bytes.len(),
            inverted: invert_colors,
        },
    );

    let total_duration = clock.elapsed(&run_start);
    let summary = PipelineSummary {
        image_width: art.dimensions.width,
        image_height: art.dimensions.height,
        pixel_count: art.dimensions.pixel_count(),
        contour_count,
        composited_mean: art.composited_mean,
        fallback_used: art.fallback_used,
    };

    Ok((
        art,
        PipelineDiagnostics {
            decode,
            resize,
            smooth,
            edges,
            quantize,
            contours,
            composite,
            fallback,
            encode,
            total_duration,
            summary,
        },
    ))
}

fn stage<C: Clock>(clock: &C, start: &C::Instant, metrics: StageMetrics) -> StageDiagnostics {
    StageDiagnostics {
        duration: clock.elapsed(start),
        metrics,
    }
}

impl PipelineDiagnostics {
    /// Stages in execution order, skipping a disabled guard.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![
            ("Decode", &self.decode),
            ("Resize", &self.resize),
            ("Smooth", &self.smooth),
            ("Edges", &self.edges),
            ("Quantize", &self.quantize),
            ("Contours", &self.contours),
            ("Composite", &self.composite),
        ];
        if let Some(ref fallback) = self.fallback {
            stages.push(("Fallback", fallback));
        }
        stages.push(("Encode", &self.encode));
        stages
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Composited mean: {:.1}  |  Fallback: {}",
            self.summary.contour_count,
            self.summary.composited_mean,
            if self.summary.fallback_used { "yes" } else { "no" },
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Resize {
            width,
            height,
            applied,
        } => {
            if *applied {
                format!("-> {width}x{height}")
            } else {
                format!("{width}x{height} (unchanged)")
            }
        }
        StageMetrics::Smooth { filter } => filter.clone(),
        StageMetrics::Edges {
            strategy,
            ink_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *ink_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{strategy} edges={ink_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Quantize {
            requested,
            clusters,
            max_iterations,
        } => format!("k={clusters} (requested {requested}) iters<={max_iterations}"),
        StageMetrics::Contours {
            contour_count,
            ink_pixel_count,
        } => format!("{contour_count} contours, ink={ink_pixel_count}"),
        StageMetrics::Composite {
            mean,
            ink_pixel_count,
        } => format!("mean={mean:.1} ink={ink_pixel_count}"),
        StageMetrics::Fallback {
            fired,
            ink_pixel_count,
        } => {
            if *fired {
                format!("fired, ink={ink_pixel_count}")
            } else {
                "not needed".to_string()
            }
        }
        StageMetrics::Encode {
            output_bytes,
            inverted,
        } => {
            if *inverted {
                format!("{output_bytes} bytes (inverted)")
            } else {
                format!("{output_bytes} bytes")
            }
        }
    }
}

/// Count ink pixels (value == 0) in a raster.
pub(crate) fn count_ink_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == INK)))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use image::{Luma, Rgb, RgbImage};

    use super::*;
    use crate::types::{HfParams, XdogParams};

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn stage_with(metrics: StageMetrics, ms: u64) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample(fallback: Option<StageDiagnostics>) -> PipelineDiagnostics {
        PipelineDiagnostics {
            decode: stage_with(
                StageMetrics::Decode {
                    input_bytes: 1000,
                    width: 100,
                    height: 100,
                    pixel_count: 10000,
                },
                10,
            ),
            resize: stage_with(
                StageMetrics::Resize {
                    width: 100,
                    height: 100,
                    applied: false,
                },
                1,
            ),
            smooth: stage_with(
                StageMetrics::Smooth {
                    filter: "bilateral d=9 sc=75 ss=75".to_string(),
                },
                40,
            ),
            edges: stage_with(
                StageMetrics::Edges {
                    strategy: "gradient low=50 high=150".to_string(),
                    ink_pixel_count: 500,
                    total_pixel_count: 10000,
                },
                9,
            ),
            quantize: stage_with(
                StageMetrics::Quantize {
                    requested: 6,
                    clusters: 6,
                    max_iterations: 15,
                },
                20,
            ),
            contours: stage_with(
                StageMetrics::Contours {
                    contour_count: 12,
                    ink_pixel_count: 800,
                },
                8,
            ),
            composite: stage_with(
                StageMetrics::Composite {
                    mean: 231.5,
                    ink_pixel_count: 920,
                },
                6,
            ),
            fallback,
            encode: stage_with(
                StageMetrics::Encode {
                    output_bytes: 2048,
                    inverted: false,
                },
                2,
            ),
            total_duration: Duration::from_millis(100),
            summary: PipelineSummary {
                image_width: 100,
                image_height: 100,
                pixel_count: 10000,
                contour_count: 12,
                composited_mean: 231.5,
                fallback_used: false,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn count_ink_pixels_works() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        for i in 0..5 {
            img.put_pixel(i, 0, Luma([INK]));
        }
        assert_eq!(count_ink_pixels(&img), 5);
    }

    #[test]
    fn report_produces_nonempty_string() {
        let report = sample(None).report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Quantize"));
        assert!(report.contains("k=6 (requested 6)"));
        assert!(!report.contains("Fallback "));
        assert!(report.contains("Fallback: no"));
    }

    #[test]
    fn report_lists_guard_when_present() {
        let diag = sample(Some(stage_with(
            StageMetrics::Fallback {
                fired: false,
                ink_pixel_count: 920,
            },
            1,
        )));
        assert_eq!(diag.stages().len(), 9);
        assert!(diag.report().contains("not needed"));
    }

    #[test]
    fn diagnostics_round_trip_through_json() {
        let diag = sample(None);
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(100));
        assert_eq!(back.quantize.metrics, diag.quantize.metrics);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let diag = sample(None);
        let json = serde_json::to_string(&diag)
            .unwrap()
            .replace("\"total_duration\":0.1", "\"total_duration\":-1.0");
        assert!(serde_json::from_str::<PipelineDiagnostics>(&json).is_err());
    }

    #[test]
    fn runner_times_every_enabled_stage() {
        let bytes = png_bytes(&RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 { Rgb([15, 15, 15]) } else { Rgb([240, 240, 240]) }
        }));

        let params = XdogParams::default().to_parameters().unwrap();
        let (art, diag) = process_with_diagnostics(&bytes, &params, &TickClock(Cell::new(0))).unwrap();
        assert_eq!(diag.stages().len(), 9);
        assert!(diag.stages().iter().all(|(_, s)| s.duration > Duration::ZERO));
        assert!(diag.total_duration > diag.decode.duration);
        assert_eq!(diag.summary.fallback_used, art.fallback_used);
        assert_eq!(diag.summary.image_width, 32);

        let params = HfParams::default().to_parameters().unwrap();
        let (_, diag) = process_with_diagnostics(&bytes, &params, &TickClock(Cell::new(0))).unwrap();
        assert!(diag.fallback.is_none());
        assert_eq!(diag.stages().len(), 8);
    }

    #[test]
    fn runner_propagates_decode_errors() {
        let params = XdogParams::default().to_parameters().unwrap();
        let err = process_with_diagnostics(b"", &params, &TickClock(Cell::new(0))).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }
}
