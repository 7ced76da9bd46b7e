//! Endpoint handlers.

use axum::Json;
use axum::extract::Multipart;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use lineart_pipeline::{EncodedImage, HfParams, OutlineParams, PipelineError, XdogParams};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::form::UploadForm;

/// `GET /`: endpoint list and parameter documentation.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Line art backend API",
        "endpoints": {
            "/outline": "POST - Extract image outline/edges (form-data: image file + optional params)",
            "/coloring_xdog": "POST - Deterministic coloring page generator, bilateral smoothing (form-data params documented below)",
            "/coloring_hf": "POST - Coloring page generator, mean-shift smoothing (form-data params documented below)",
        },
        "outline_params": {
            "low_threshold": format!("int (default: {}) - Lower hysteresis threshold", OutlineParams::DEFAULT_LOW_THRESHOLD),
            "high_threshold": format!("int (default: {}) - Upper hysteresis threshold", OutlineParams::DEFAULT_HIGH_THRESHOLD),
            "blur_kernel": format!("int (default: {}) - Gaussian blur kernel size (even values are bumped to the next odd one)", OutlineParams::DEFAULT_BLUR_KERNEL),
            "invert_colors": "bool (default: false) - Invert the output colors (black/white); legacy alias: invert",
        },
        "coloring_xdog_params": {
            "resize_max": format!("int (default: {}) - Max image dimension for processing", XdogParams::DEFAULT_RESIZE_MAX),
            "bilateral_d": format!("int (default: {}) - Bilateral filter diameter", XdogParams::DEFAULT_BILATERAL_D),
            "bilateral_sigma_color": format!("int (default: {})", XdogParams::DEFAULT_BILATERAL_SIGMA_COLOR),
            "bilateral_sigma_space": format!("int (default: {})", XdogParams::DEFAULT_BILATERAL_SIGMA_SPACE),
            "k_clusters": format!("int (default: {}) - Color quantization clusters, clamped to [2, 12]", XdogParams::DEFAULT_K_CLUSTERS),
            "canny_low": format!("int (default: {})", XdogParams::DEFAULT_CANNY_LOW),
            "canny_high": format!("int (default: {})", XdogParams::DEFAULT_CANNY_HIGH),
            "line_thickness": format!("int (default: {})", XdogParams::DEFAULT_LINE_THICKNESS),
            "min_area": format!("int (default: {})", XdogParams::DEFAULT_MIN_AREA),
            "invert_colors": "bool (default: false) - Invert final image colors",
        },
        "coloring_hf_params": {
            "k": format!("int (default: {}) - Clusters for quantization, clamped to [2, 12]", HfParams::DEFAULT_K),
            "line_thickness": format!("int (default: {})", HfParams::DEFAULT_LINE_THICKNESS),
            "min_area": format!("int (default: {})", HfParams::DEFAULT_MIN_AREA),
            "invert_colors": "bool (default: false) - Invert final image colors",
        },
    }))
}

/// `POST /outline`: single-pass edge drawing.
pub async fn outline(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let image = form.image()?;
    let params = OutlineParams {
        low_threshold: form.int("low_threshold", OutlineParams::DEFAULT_LOW_THRESHOLD)?,
        high_threshold: form.int("high_threshold", OutlineParams::DEFAULT_HIGH_THRESHOLD)?,
        blur_kernel: form.int("blur_kernel", OutlineParams::DEFAULT_BLUR_KERNEL)?,
        invert_colors: form.flag("invert") || form.flag("invert_colors"),
    };

    let art = run_blocking(move || lineart_pipeline::outline(&image, &params)).await?;
    tracing::info!(
        width = art.dimensions.width,
        height = art.dimensions.height,
        "outline generated"
    );
    Ok(png(art.encoded))
}

/// `POST /coloring_xdog`: bilateral variant.
pub async fn coloring_xdog(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let image = form.image()?;
    let params = XdogParams {
        resize_max: form.int("resize_max", XdogParams::DEFAULT_RESIZE_MAX)?,
        bilateral_d: form.int("bilateral_d", XdogParams::DEFAULT_BILATERAL_D)?,
        bilateral_sigma_color: form.int(
            "bilateral_sigma_color",
            XdogParams::DEFAULT_BILATERAL_SIGMA_COLOR,
        )?,
        bilateral_sigma_space: form.int(
            "bilateral_sigma_space",
            XdogParams::DEFAULT_BILATERAL_SIGMA_SPACE,
        )?,
        k_clusters: form.int("k_clusters", XdogParams::DEFAULT_K_CLUSTERS)?,
        canny_low: form.int("canny_low", XdogParams::DEFAULT_CANNY_LOW)?,
        canny_high: form.int("canny_high", XdogParams::DEFAULT_CANNY_HIGH)?,
        line_thickness: form.int("line_thickness", XdogParams::DEFAULT_LINE_THICKNESS)?,
        min_area: form.int("min_area", XdogParams::DEFAULT_MIN_AREA)?,
        invert_colors: form.flag("invert_colors"),
    };

    let art = run_blocking(move || lineart_pipeline::process_xdog(&image, &params)).await?;
    tracing::info!(
        width = art.dimensions.width,
        height = art.dimensions.height,
        fallback = art.fallback_used,
        composited_mean = art.composited_mean,
        "coloring page generated (xdog)"
    );
    Ok(png(art.encoded))
}

/// `POST /coloring_hf`: mean-shift variant.
pub async fn coloring_hf(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let image = form.image()?;
    let params = HfParams {
        k: form.int("k", HfParams::DEFAULT_K)?,
        line_thickness: form.int("line_thickness", HfParams::DEFAULT_LINE_THICKNESS)?,
        min_area: form.int("min_area", HfParams::DEFAULT_MIN_AREA)?,
        invert_colors: form.flag("invert_colors"),
    };

    let art = run_blocking(move || lineart_pipeline::process_hf(&image, &params)).await?;
    tracing::info!(
        width = art.dimensions.width,
        height = art.dimensions.height,
        composited_mean = art.composited_mean,
        "coloring page generated (hf)"
    );
    Ok(png(art.encoded))
}

/// Run a CPU-bound pipeline call off the async runtime.
async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

fn png(encoded: EncodedImage) -> Response {
    ([(header::CONTENT_TYPE, encoded.media_type)], encoded.bytes).into_response()
}
