//! lineart-bench: CLI tool for line-art parameter experimentation and diagnostics.
//!
//! Runs one coloring-page variant on an image file with configurable
//! parameters, printing per-stage durations and counts. Useful for:
//!
//! - Comparing the bilateral (`xdog`) and mean-shift (`hf`) variants
//! - Tuning cluster counts, line thickness and minimum contour area
//! - Finding which stage dominates the run time
//! - Seeing when the near-blank guard fires
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin lineart-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use lineart_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use lineart_pipeline::{HfParams, PipelineParameters, XdogParams};
use tracing_subscriber::EnvFilter;

/// Parameter experimentation and diagnostics for the line-art pipeline.
///
/// Runs a coloring-page variant on the given image and prints detailed
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "lineart-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP, GIF, TIFF).
    image_path: PathBuf,

    /// Pipeline variant.
    #[arg(long, value_enum, default_value_t = Variant::Xdog)]
    variant: Variant,

    /// Max image dimension for processing (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_RESIZE_MAX)]
    resize_max: i64,

    /// Bilateral filter diameter (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_BILATERAL_D)]
    bilateral_d: i64,

    /// Bilateral colour sigma (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_BILATERAL_SIGMA_COLOR)]
    bilateral_sigma_color: i64,

    /// Bilateral spatial sigma (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_BILATERAL_SIGMA_SPACE)]
    bilateral_sigma_space: i64,

    /// Canny low threshold (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_CANNY_LOW)]
    canny_low: i64,

    /// Canny high threshold (xdog only).
    #[arg(long, default_value_t = XdogParams::DEFAULT_CANNY_HIGH)]
    canny_high: i64,

    /// Colour quantization clusters, clamped to [2, 12].
    #[arg(long, default_value_t = XdogParams::DEFAULT_K_CLUSTERS, allow_negative_numbers = true)]
    clusters: i64,

    /// Stroke width of traced outlines.
    #[arg(long, default_value_t = XdogParams::DEFAULT_LINE_THICKNESS)]
    line_thickness: i64,

    /// Smallest contour area kept, in square pixels.
    #[arg(long, default_value_t = XdogParams::DEFAULT_MIN_AREA, allow_negative_numbers = true)]
    min_area: i64,

    /// Emit white lines on black.
    #[arg(long)]
    invert_colors: bool,

    /// Write the PNG of the first run to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full variant parameters as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. The JSON
    /// must deserialize into the selected variant's parameters; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Coloring-page variant selection.
#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    /// Bilateral smoothing, Canny edges, near-blank guard.
    Xdog,
    /// Mean-shift smoothing, combined Canny and adaptive edges.
    Hf,
}

/// Build [`PipelineParameters`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed as the selected
/// variant's parameters and the individual flags are ignored.
fn parameters_from_cli(cli: &Cli) -> Result<PipelineParameters, String> {
    let resolved = match cli.variant {
        Variant::Xdog => {
            let params = match cli.config_json {
                Some(ref json) => serde_json::from_str(json)
                    .map_err(|e| format!("Error parsing --config-json: {e}"))?,
                None => XdogParams {
                    resize_max: cli.resize_max,
                    bilateral_d: cli.bilateral_d,
                    bilateral_sigma_color: cli.bilateral_sigma_color,
                    bilateral_sigma_space: cli.bilateral_sigma_space,
                    k_clusters: cli.clusters,
                    canny_low: cli.canny_low,
                    canny_high: cli.canny_high,
                    line_thickness: cli.line_thickness,
                    min_area: cli.min_area,
                    invert_colors: cli.invert_colors,
                },
            };
            eprintln!("Params: {params:#?}");
            params.to_parameters()
        }
        Variant::Hf => {
            let params = match cli.config_json {
                Some(ref json) => serde_json::from_str(json)
                    .map_err(|e| format!("Error parsing --config-json: {e}"))?,
                None => HfParams {
                    k: cli.clusters,
                    line_thickness: cli.line_thickness,
                    min_area: cli.min_area,
                    invert_colors: cli.invert_colors,
                },
            };
            eprintln!("Params: {params:#?}");
            params.to_parameters()
        }
    };
    resolved.map_err(|e| format!("Invalid parameters: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    let params = match parameters_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match lineart_pipeline::process_with_diagnostics(&image_bytes, &params, &StdClock) {
            Ok((art, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                if run == 0
                    && let Some(ref path) = cli.output
                {
                    match std::fs::write(path, &art.encoded.bytes) {
                        Ok(()) => eprintln!(
                            "PNG written to {} ({} bytes)",
                            path.display(),
                            art.encoded.bytes.len(),
                        ),
                        Err(e) => eprintln!("Error writing PNG to {}: {e}", path.display()),
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    let fallbacks = all_diagnostics
        .iter()
        .filter(|d| d.summary.fallback_used)
        .count();
    if fallbacks > 0 {
        println!("Fallback used in {fallbacks} of {} runs", all_diagnostics.len());
    }

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode.duration)),
        ("Resize", |d| Some(d.resize.duration)),
        ("Smooth", |d| Some(d.smooth.duration)),
        ("Edges", |d| Some(d.edges.duration)),
        ("Quantize", |d| Some(d.quantize.duration)),
        ("Contours", |d| Some(d.contours.duration)),
        ("Composite", |d| Some(d.composite.duration)),
        ("Fallback", |d| d.fallback.as_ref().map(|s| s.duration)),
        ("Encode", |d| Some(d.encode.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
