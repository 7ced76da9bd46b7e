//! Colour quantization with seeded k-means.
//!
//! Pixel colours are clustered as points in RGB space with Lloyd's
//! algorithm. Initial centroids come from k-means++ driven by a
//! ChaCha8 generator with a fixed seed, so identical input always
//! yields identical regions. Several restarts run and the most compact
//! clustering wins.
//!
//! Large images train on a staggered grid sample of their pixels; every
//! pixel is then labelled with the nearest final centroid.

use image::{GrayImage, Luma, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grayscale::luma;

/// Smallest cluster count the quantizer will use.
pub const MIN_CLUSTERS: usize = 2;

/// Largest cluster count the quantizer will use.
pub const MAX_CLUSTERS: usize = 12;

/// Seed of the k-means++ initialisation.
pub const KMEANS_SEED: u64 = 0x6c69_6e65_6172_7421;

/// Independent k-means++ restarts; the most compact result is kept.
pub const KMEANS_ATTEMPTS: u32 = 3;

/// Lloyd iterations stop once no centroid moves further than this.
pub const CENTROID_EPSILON: f64 = 1.0;

/// Training sample cap; larger images are sampled down to about this
/// many pixels.
pub const TRAINING_SAMPLE_CAP: u64 = 16_384;

type Color = [f64; 3];

/// Clamp a requested cluster count to [`MIN_CLUSTERS`]..=[`MAX_CLUSTERS`].
///
/// Out-of-range requests are silently normalised, not rejected.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub fn clamp_clusters(k: i64) -> usize {
    k.clamp(MIN_CLUSTERS as i64, MAX_CLUSTERS as i64) as usize
}

/// Representative colours, one per cluster index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<Rgb<u8>>);

impl Palette {
    /// Colours in cluster-index order.
    #[must_use]
    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.0
    }

    /// Number of clusters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the palette has no colours.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cluster index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u8>,
}

impl LabelMap {
    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cluster index of the pixel at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Labels in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.labels
    }
}

/// Label map plus palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantization {
    /// Cluster index per pixel.
    pub labels: LabelMap,
    /// Colour per cluster index.
    pub palette: Palette,
}

impl Quantization {
    /// Grayscale proxy: each pixel takes the luma of its cluster colour.
    #[must_use = "returns the quantized grayscale image"]
    pub fn proxy(&self) -> GrayImage {
        let lumas: Vec<u8> = self.palette.colors().iter().map(|&c| luma(c)).collect();
        GrayImage::from_fn(self.labels.width, self.labels.height, |x, y| {
            Luma([lumas[usize::from(self.labels.get(x, y))]])
        })
    }

    /// Colour image with every pixel replaced by its cluster colour.
    #[must_use = "returns the quantized colour image"]
    pub fn quantized(&self) -> RgbImage {
        let colors = self.palette.colors();
        RgbImage::from_fn(self.labels.width, self.labels.height, |x, y| {
            colors[usize::from(self.labels.get(x, y))]
        })
    }
}

/// Cluster the image's colours into `clamp_clusters(k)` groups.
///
/// `max_iterations` caps Lloyd steps per restart.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(image: &RgbImage, k: i64, max_iterations: u32) -> Quantization {
    let k = clamp_clusters(k);
    let pixels: Vec<Color> = image
        .pixels()
        .map(|p| p.0.map(f64::from))
        .collect();

    let sample = training_sample(image);

    let mut rng = ChaCha8Rng::seed_from_u64(KMEANS_SEED);
    let mut best: Option<(f64, Vec<Color>)> = None;
    for _ in 0..KMEANS_ATTEMPTS {
        let centers = lloyd(&sample, plus_plus_init(&sample, k, &mut rng), max_iterations);
        let compactness = compactness(&sample, &centers);
        if best.as_ref().is_none_or(|(c, _)| compactness < *c) {
            best = Some((compactness, centers));
        }
    }
    let centers = best.map_or_else(|| vec![[0.0; 3]; k], |(_, centers)| centers);

    let labels = pixels
        .iter()
        .map(|p| nearest(p, &centers).0 as u8)
        .collect();
    // Centroids truncate to 8-bit colour.
    let palette = Palette(
        centers
            .iter()
            .map(|c| Rgb(c.map(|v| v.clamp(0.0, 255.0) as u8)))
            .collect(),
    );

    Quantization {
        labels: LabelMap {
            width: image.width(),
            height: image.height(),
            labels,
        },
        palette,
    }
}

/// Pixels on a grid of pitch [`grid_step`], read row by row.
///
/// Each sampled row starts one column further right than the previous
/// one (wrapping at the pitch), so narrow vertical features are not
/// skipped by every row at once. Below the cap every pixel is used.
fn training_sample(image: &RgbImage) -> Vec<Color> {
    let (width, height) = image.dimensions();
    let step = grid_step(u64::from(width) * u64::from(height));
    (0..height)
        .step_by(step as usize)
        .zip((0..step).cycle())
        .flat_map(|(y, offset)| {
            (offset..width)
                .step_by(step as usize)
                .map(move |x| image.get_pixel(x, y).0.map(f64::from))
        })
        .collect()
}

/// Smallest pitch whose square grid keeps the sample within
/// [`TRAINING_SAMPLE_CAP`].
fn grid_step(pixel_count: u64) -> u32 {
    let ratio = pixel_count.div_ceil(TRAINING_SAMPLE_CAP).max(1);
    let root = ratio.isqrt();
    let step = if root * root < ratio { root + 1 } else { root };
    u32::try_from(step).unwrap_or(u32::MAX)
}

fn distance_sq(a: &Color, b: &Color) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q) * (p - q))
        .sum()
}

/// Index of and squared distance to the closest centre (first wins ties).
fn nearest(point: &Color, centers: &[Color]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, c)| {
            let d = distance_sq(point, c);
            if d < best.1 { (i, d) } else { best }
        })
}

fn compactness(points: &[Color], centers: &[Color]) -> f64 {
    points.iter().map(|p| nearest(p, centers).1).sum()
}

/// k-means++ seeding: each further centre is drawn with probability
/// proportional to its squared distance from the chosen ones.
fn plus_plus_init(points: &[Color], k: usize, rng: &mut ChaCha8Rng) -> Vec<Color> {
    if points.is_empty() {
        return vec![[0.0; 3]; k];
    }
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    let mut dist: Vec<f64> = points.iter().map(|p| distance_sq(p, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = dist.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            dist.iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.random_range(0..points.len())
        };
        let center = points[chosen];
        for (d, p) in dist.iter_mut().zip(points) {
            *d = d.min(distance_sq(p, &center));
        }
        centers.push(center);
    }
    centers
}

/// Lloyd refinement from `centers`.
#[allow(clippy::cast_precision_loss)]
fn lloyd(points: &[Color], mut centers: Vec<Color>, max_iterations: u32) -> Vec<Color> {
    let k = centers.len();
    let epsilon_sq = CENTROID_EPSILON * CENTROID_EPSILON;
    let mut assignment: Vec<usize> = points.iter().map(|p| nearest(p, &centers).0).collect();

    for _ in 0..max_iterations.max(1) {
        let mut sums = vec![[0.0_f64; 3]; k];
        let mut counts = vec![0_usize; k];
        for (p, &label) in points.iter().zip(&assignment) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut updated: Vec<Color> = sums
            .iter()
            .zip(&counts)
            .zip(&centers)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    *old
                } else {
                    sum.map(|s| s / count as f64)
                }
            })
            .collect();

        // Empty clusters restart at the point worst served by its centre.
        for (i, &count) in counts.iter().enumerate() {
            if count == 0 {
                if let Some(far) = farthest_point(points, &assignment, &updated) {
                    updated[i] = points[far];
                    assignment[far] = i;
                }
            }
        }

        let max_shift = centers
            .iter()
            .zip(&updated)
            .map(|(a, b)| distance_sq(a, b))
            .fold(0.0, f64::max);
        centers = updated;
        for (label, p) in assignment.iter_mut().zip(points) {
            *label = nearest(p, &centers).0;
        }
        if max_shift <= epsilon_sq {
            break;
        }
    }
    centers
}

fn farthest_point(points: &[Color], assignment: &[usize], centers: &[Color]) -> Option<usize> {
    points
        .iter()
        .zip(assignment)
        .enumerate()
        .map(|(i, (p, &label))| (i, distance_sq(p, &centers[label])))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
