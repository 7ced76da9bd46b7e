//! Gaussian and median blurs on single-channel intensity.
//!
//! [`gaussian_blur`] wraps [`imageproc::filter::gaussian_blur_f32`].
//! [`gaussian_blur_kernel`] is the kernel-size flavour the legacy outline
//! operation accepts, deriving sigma from the kernel size. [`median_blur`]
//! suppresses speckle ahead of the combined edge detector and the
//! fallback detector.

use image::GrayImage;

use crate::types::PipelineError;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Coerce a requested kernel size to an odd size.
///
/// Even sizes are bumped to the next odd value (4 becomes 5). This is
/// normalisation, not validation: the caller's value changes silently.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the size is below 1 after
/// coercion.
pub fn odd_kernel_size(kernel_size: i64) -> Result<u32, PipelineError> {
    let coerced = if kernel_size % 2 == 0 {
        kernel_size.saturating_add(1)
    } else {
        kernel_size
    };
    u32::try_from(coerced)
        .ok()
        .filter(|&k| k >= 1)
        .ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "blur_kernel must be at least 1, got {kernel_size}"
            ))
        })
}

/// Sigma implied by an odd Gaussian kernel size.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    let half = (f64::from(kernel_size) - 1.0) * 0.5;
    0.3_f64.mul_add(half - 1.0, 0.8) as f32
}

/// Gaussian blur with a kernel-size parameter.
///
/// The size is coerced with [`odd_kernel_size`] and sigma derived with
/// [`kernel_sigma`]. A 1×1 kernel is the identity.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `kernel_size` is below 1
/// after coercion.
pub fn gaussian_blur_kernel(image: &GrayImage, kernel_size: i64) -> Result<GrayImage, PipelineError> {
    let size = odd_kernel_size(kernel_size)?;
    if size == 1 {
        return Ok(image.clone());
    }
    Ok(gaussian_blur(image, kernel_sigma(size)))
}

/// Median blur over a square `kernel_size`×`kernel_size` window.
///
/// `kernel_size` should be odd; a size of 1 or less is the identity.
#[must_use = "returns the blurred image"]
pub fn median_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let radius = kernel_size / 2;
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur(&img, 2.0);
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(left_of_edge > 0, "got {left_of_edge}");
        assert!(right_of_edge < 255, "got {right_of_edge}");
    }

    #[test]
    fn even_kernel_is_bumped_to_next_odd() {
        assert_eq!(odd_kernel_size(4).unwrap(), 5);
        assert_eq!(odd_kernel_size(5).unwrap(), 5);
        assert_eq!(odd_kernel_size(0).unwrap(), 1);
    }

    #[test]
    fn kernel_below_one_is_rejected() {
        assert!(matches!(
            odd_kernel_size(-1),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            odd_kernel_size(-4),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn kernel_sigma_follows_size() {
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-6);
        assert!((kernel_sigma(5) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn even_and_next_odd_kernel_blur_identically() {
        let img = sharp_edge_image();
        assert_eq!(
            gaussian_blur_kernel(&img, 4).unwrap(),
            gaussian_blur_kernel(&img, 5).unwrap()
        );
    }

    #[test]
    fn unit_kernel_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_kernel(&img, 1).unwrap(), img);
    }

    #[test]
    fn median_removes_isolated_speck() {
        let mut img = GrayImage::from_pixel(9, 9, image::Luma([200]));
        img.put_pixel(4, 4, image::Luma([0]));
        let filtered = median_blur(&img, 3);
        assert_eq!(filtered.get_pixel(4, 4).0[0], 200);
    }

    #[test]
    fn median_keeps_straight_boundary() {
        let img = sharp_edge_image();
        assert_eq!(median_blur(&img, 5), img);
    }
}
