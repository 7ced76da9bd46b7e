//! Edge-preserving smoothing of the resized colour image.
//!
//! Two filters flatten texture while keeping strong colour boundaries:
//!
//! - [`bilateral_filter`] averages a circular neighbourhood, weighting
//!   each neighbour by both its distance and its colour difference.
//! - [`mean_shift_filter`] moves each pixel to the mode of its joint
//!   position/colour neighbourhood. It flattens regions harder than the
//!   bilateral filter and costs considerably more.
//!
//! Both read beyond the image border by replicating the nearest edge
//! pixel (bilateral) or by clipping the window (mean shift).

use image::{Rgb, RgbImage};

use crate::types::Smoothing;

/// Mean-shift iteration cap per pixel.
pub const MEAN_SHIFT_MAX_ITERATIONS: u32 = 5;

/// Mean-shift convergence threshold: combined position (L1) plus squared
/// colour shift at or below this ends the search.
const MEAN_SHIFT_EPSILON: i64 = 1;

/// Largest L1 distance between two RGB colours.
const MAX_COLOR_DISTANCE: u32 = 3 * 255;

/// Apply the filter `smoothing` selects.
#[must_use = "returns the smoothed image"]
pub fn smooth(image: &RgbImage, smoothing: Smoothing) -> RgbImage {
    match smoothing {
        Smoothing::Bilateral {
            diameter,
            sigma_color,
            sigma_space,
        } => bilateral_filter(image, diameter, sigma_color, sigma_space),
        Smoothing::MeanShift {
            spatial_radius,
            color_radius,
        } => mean_shift_filter(image, spatial_radius, color_radius),
    }
}

/// Bilateral filter over a circular window.
///
/// The window radius is `diameter / 2`; a non-positive `diameter`
/// derives it from `sigma_space` as `round(1.5 * sigma_space)`. The
/// radius is at least 1. Non-positive sigmas are replaced by 1 so the
/// Gaussian falloffs stay defined.
///
/// Colour similarity uses the L1 distance over the three channels.
#[must_use = "returns the smoothed image"]
#[allow(clippy::cast_possible_truncation)]
pub fn bilateral_filter(
    image: &RgbImage,
    diameter: i32,
    sigma_color: f64,
    sigma_space: f64,
) -> RgbImage {
    let sigma_color = if sigma_color > 0.0 { sigma_color } else { 1.0 };
    let sigma_space = if sigma_space > 0.0 { sigma_space } else { 1.0 };
    let radius = if diameter > 0 {
        diameter / 2
    } else {
        (sigma_space * 1.5).round().min(f64::from(i32::MAX)) as i32
    }
    .max(1);

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let color_weights: Vec<f64> = (0..=MAX_COLOR_DISTANCE)
        .map(|d| {
            let d = f64::from(d);
            (d * d * color_coeff).exp()
        })
        .collect();

    let window = circular_window(radius, space_coeff);
    let (width, height) = image.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let center = image.get_pixel(x, y).0;
        let mut sum = [0.0_f64; 3];
        let mut weight_sum = 0.0_f64;

        for &(dx, dy, space_weight) in &window {
            let sx = clamp_offset(x, dx, width);
            let sy = clamp_offset(y, dy, height);
            let sample = image.get_pixel(sx, sy).0;
            let distance: usize = sample
                .iter()
                .zip(center.iter())
                .map(|(&a, &b)| usize::from(a.abs_diff(b)))
                .sum();
            let weight = space_weight * color_weights[distance];
            for (acc, &v) in sum.iter_mut().zip(sample.iter()) {
                *acc = weight.mul_add(f64::from(v), *acc);
            }
            weight_sum += weight;
        }

        // The centre sample always contributes weight 1.
        Rgb(sum.map(|s| round_channel(s / weight_sum)))
    })
}

/// Offsets and spatial weights of every sample within `radius`.
fn circular_window(radius: i32, space_coeff: f64) -> Vec<(i32, i32, f64)> {
    let limit = f64::from(radius);
    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r = f64::from(dx).hypot(f64::from(dy));
            if r > limit {
                continue;
            }
            window.push((dx, dy, (r * r * space_coeff).exp()));
        }
    }
    window
}

/// `base + delta`, replicated into `0..len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_offset(base: u32, delta: i32, len: u32) -> u32 {
    let v = i64::from(base) + i64::from(delta);
    v.clamp(0, i64::from(len) - 1) as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Mean-shift filtering in joint position/colour space.
///
/// For each pixel the search starts at its own position and colour and
/// repeatedly moves to the mean position and mean colour of every pixel
/// within `spatial_radius` (square window) whose squared colour distance
/// to the current colour is at most `color_radius²`. The search stops
/// after [`MEAN_SHIFT_MAX_ITERATIONS`] steps or once it settles; the
/// pixel takes the colour the search ended on.
#[must_use = "returns the smoothed image"]
#[allow(clippy::cast_possible_truncation)]
pub fn mean_shift_filter(image: &RgbImage, spatial_radius: u32, color_radius: f64) -> RgbImage {
    let color_radius = color_radius.max(0.0);
    let range_sq = (color_radius * color_radius).min(1e15) as i64;
    let (width, height) = image.dimensions();
    let seeker = ModeSeeker {
        data: image.as_raw(),
        width: i64::from(width),
        height: i64::from(height),
        spatial_radius: i64::from(spatial_radius),
        range_sq,
    };

    RgbImage::from_fn(width, height, |x, y| {
        Rgb(seeker.seek(i64::from(x), i64::from(y)))
    })
}

struct ModeSeeker<'a> {
    data: &'a [u8],
    width: i64,
    height: i64,
    spatial_radius: i64,
    range_sq: i64,
}

impl ModeSeeker<'_> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample(&self, x: i64, y: i64) -> [i64; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [
            i64::from(self.data[idx]),
            i64::from(self.data[idx + 1]),
            i64::from(self.data[idx + 2]),
        ]
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn seek(&self, x: i64, y: i64) -> [u8; 3] {
        let (mut x0, mut y0) = (x, y);
        let mut c0 = self.sample(x, y);

        for _ in 0..MEAN_SHIFT_MAX_ITERATIONS {
            let mut count = 0_i64;
            let (mut sx, mut sy) = (0_i64, 0_i64);
            let mut sc = [0_i64; 3];

            let y_range = (y0 - self.spatial_radius).max(0)
                ..=(y0 + self.spatial_radius).min(self.height - 1);
            for yy in y_range {
                let x_range = (x0 - self.spatial_radius).max(0)
                    ..=(x0 + self.spatial_radius).min(self.width - 1);
                for xx in x_range {
                    let c = self.sample(xx, yy);
                    if color_distance_sq(c, c0) <= self.range_sq {
                        count += 1;
                        sx += xx;
                        sy += yy;
                        for (acc, v) in sc.iter_mut().zip(c) {
                            *acc += v;
                        }
                    }
                }
            }

            if count == 0 {
                break;
            }

            let x1 = div_round(sx, count);
            let y1 = div_round(sy, count);
            let c1 = sc.map(|v| div_round(v, count));

            let shift = (x1 - x0).abs() + (y1 - y0).abs() + color_distance_sq(c1, c0);
            let settled = (x1 == x0 && y1 == y0) || shift <= MEAN_SHIFT_EPSILON;

            x0 = x1;
            y0 = y1;
            c0 = c1;
            if settled {
                break;
            }
        }

        c0.map(|v| v.clamp(0, 255) as u8)
    }
}

fn color_distance_sq(a: [i64; 3], b: [i64; 3]) -> i64 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| (p - q) * (p - q))
        .sum()
}

/// Rounded division of a non-negative sum by a positive count.
const fn div_round(sum: i64, count: i64) -> i64 {
    (2 * sum + count) / (2 * count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_image() -> RgbImage {
        RgbImage::from_fn(12, 8, |x, _| {
            if x < 6 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    /// Alternating 120/130 gray checkerboard: low-amplitude texture.
    fn textured_image() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| {
            let v = if (x + y) % 2 == 0 { 120 } else { 130 };
            Rgb([v, v, v])
        })
    }

    fn spread(image: &RgbImage) -> u8 {
        let values: Vec<u8> = image.pixels().map(|p| p.0[0]).collect();
        let max = values.iter().copied().max().unwrap_or(0);
        let min = values.iter().copied().min().unwrap_or(0);
        max - min
    }

    #[test]
    fn bilateral_preserves_dimensions() {
        let img = RgbImage::new(17, 9);
        assert_eq!(bilateral_filter(&img, 9, 75.0, 75.0).dimensions(), (17, 9));
    }

    #[test]
    fn bilateral_leaves_uniform_image_unchanged() {
        let img = RgbImage::from_pixel(10, 10, Rgb([40, 90, 200]));
        assert_eq!(bilateral_filter(&img, 9, 75.0, 75.0), img);
    }

    #[test]
    fn bilateral_keeps_sharp_colour_boundary() {
        // A 765-step colour jump has no weight at sigma_color 10.
        let img = split_image();
        assert_eq!(bilateral_filter(&img, 5, 10.0, 10.0), img);
    }

    #[test]
    fn bilateral_flattens_low_contrast_texture() {
        let img = textured_image();
        let smoothed = bilateral_filter(&img, 9, 75.0, 75.0);
        assert!(spread(&smoothed) < spread(&img));
    }

    #[test]
    fn bilateral_non_positive_parameters_are_usable() {
        let img = textured_image();
        let smoothed = bilateral_filter(&img, 0, -3.0, 0.0);
        assert_eq!(smoothed.dimensions(), img.dimensions());
    }

    #[test]
    fn circular_window_excludes_corners() {
        let window = circular_window(2, -0.5);
        assert!(window.iter().any(|&(dx, dy, _)| dx == 2 && dy == 0));
        assert!(!window.iter().any(|&(dx, dy, _)| dx == 2 && dy == 2));
        let center = window
            .iter()
            .find(|&&(dx, dy, _)| dx == 0 && dy == 0)
            .map(|&(_, _, w)| w);
        assert_eq!(center, Some(1.0));
    }

    #[test]
    fn smooth_dispatches_on_the_filter() {
        let img = textured_image();
        let bilateral = Smoothing::Bilateral {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        };
        assert_eq!(smooth(&img, bilateral), bilateral_filter(&img, 9, 75.0, 75.0));
        let mean_shift = Smoothing::MeanShift {
            spatial_radius: 3,
            color_radius: 20.0,
        };
        assert_eq!(smooth(&img, mean_shift), mean_shift_filter(&img, 3, 20.0));
    }

    #[test]
    fn mean_shift_leaves_uniform_image_unchanged() {
        let img = RgbImage::from_pixel(9, 7, Rgb([10, 200, 90]));
        assert_eq!(mean_shift_filter(&img, 3, 10.0), img);
    }

    #[test]
    fn mean_shift_keeps_regions_further_apart_than_range() {
        let img = split_image();
        assert_eq!(mean_shift_filter(&img, 4, 51.0), img);
    }

    #[test]
    fn mean_shift_flattens_texture_within_range() {
        let img = textured_image();
        let smoothed = mean_shift_filter(&img, 5, 51.0);
        assert!(
            spread(&smoothed) < spread(&img),
            "expected spread below {}, got {}",
            spread(&img),
            spread(&smoothed),
        );
    }

    #[test]
    fn div_round_rounds_half_up() {
        assert_eq!(div_round(5, 2), 3);
        assert_eq!(div_round(4, 3), 1);
        assert_eq!(div_round(0, 7), 0);
    }
}
