//! Merge the contour canvas with the edge map and clean up the result.
//!
//! Both inputs are ink (0) on paper (255). The merge is a pixel-wise
//! AND of intensities, so a pixel stays paper only where both inputs are
//! paper and ink from either input survives the merge. The finish then
//! applies the variant's morphology, which acts on intensity: openings
//! fill paper gaps narrower than the element and dilations grow paper
//! into the strokes.
//!
//! The finish sees the page surrounded by a paper margin, so strokes
//! running along the image edge are thinned exactly like interior ones.

use image::{GrayImage, Luma};

use crate::morphology;
use crate::types::PAPER;

/// Morphological cleanup applied after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishPreset {
    /// Opening with a `side`×`side` element, a dilation by a square of
    /// the stroke width when strokes are wider than one pixel, then a
    /// closing with the same `side`×`side` element.
    OpenThicken {
        /// Side of the opening and closing elements.
        side: u32,
    },
    /// A single closing with a `side`×`side` element.
    Close {
        /// Side of the closing element.
        side: u32,
    },
}

impl FinishPreset {
    /// Bilateral variant.
    pub const XDOG: Self = Self::OpenThicken { side: 3 };

    /// Mean-shift variant.
    pub const HF: Self = Self::Close { side: 2 };

    /// Apply this finish to a merged raster.
    #[must_use = "returns the finished raster"]
    pub fn apply(self, merged: &GrayImage, line_thickness: u32) -> GrayImage {
        let margin = match self {
            Self::OpenThicken { side } => side.saturating_mul(2).saturating_add(line_thickness),
            Self::Close { side } => side.saturating_mul(2),
        };
        on_paper_margin(merged, margin, |page| self.apply_unpadded(page, line_thickness))
    }

    fn apply_unpadded(self, merged: &GrayImage, line_thickness: u32) -> GrayImage {
        match self {
            Self::OpenThicken { side } => {
                let opened = morphology::open(merged, side);
                let thickened = if line_thickness > 1 {
                    morphology::dilate(&opened, line_thickness)
                } else {
                    opened
                };
                morphology::close(&thickened, side)
            }
            Self::Close { side } => morphology::close(merged, side),
        }
    }
}

/// Run `op` on `image` padded by `margin` paper pixels on every side and
/// crop the result back to the original frame.
fn on_paper_margin(
    image: &GrayImage,
    margin: u32,
    op: impl FnOnce(&GrayImage) -> GrayImage,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut page = GrayImage::from_pixel(
        width.saturating_add(margin.saturating_mul(2)),
        height.saturating_add(margin.saturating_mul(2)),
        Luma([PAPER]),
    );
    image::imageops::replace(&mut page, image, i64::from(margin), i64::from(margin));
    image::imageops::crop_imm(&op(&page), margin, margin, width, height).to_image()
}

/// Pixel-wise AND of two rasters of equal size.
#[must_use = "returns the merged raster"]
pub fn intersect(canvas: &GrayImage, edges: &GrayImage) -> GrayImage {
    GrayImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        Luma([canvas.get_pixel(x, y).0[0] & edges.get_pixel(x, y).0[0]])
    })
}

/// Merge `canvas` and `edges`, then apply `finish`.
#[must_use = "returns the composited raster"]
pub fn composite(
    canvas: &GrayImage,
    edges: &GrayImage,
    finish: FinishPreset,
    line_thickness: u32,
) -> GrayImage {
    finish.apply(&intersect(canvas, edges), line_thickness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::INK;

    fn paper(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([PAPER]))
    }

    /// Paper with an ink bar covering columns `from..to`.
    fn bar(from: u32, to: u32) -> GrayImage {
        GrayImage::from_fn(16, 8, |x, _| {
            Luma([if (from..to).contains(&x) { INK } else { PAPER }])
        })
    }

    fn ink_columns(image: &GrayImage) -> Vec<u32> {
        (0..image.width())
            .filter(|&x| image.get_pixel(x, 4).0[0] == INK)
            .collect()
    }

    #[test]
    fn intersect_keeps_ink_from_either_input() {
        let merged = intersect(&bar(2, 4), &bar(8, 10));
        assert_eq!(ink_columns(&merged), vec![2, 3, 8, 9]);
    }

    #[test]
    fn intersect_of_blank_inputs_is_blank() {
        let merged = intersect(&paper(5, 5), &paper(5, 5));
        assert_eq!(merged, paper(5, 5));
    }

    #[test]
    fn open_fills_narrow_paper_gaps() {
        let mut canvas = bar(3, 10);
        for y in 0..8 {
            canvas.put_pixel(6, y, Luma([PAPER]));
        }
        let finished = FinishPreset::XDOG.apply(&canvas, 1);
        assert_eq!(ink_columns(&finished), (3..10).collect::<Vec<_>>());
    }

    #[test]
    fn unit_thickness_keeps_wide_strokes() {
        let canvas = bar(4, 9);
        assert_eq!(FinishPreset::XDOG.apply(&canvas, 1), canvas);
    }

    #[test]
    fn unit_thickness_still_closes_away_thin_strokes() {
        let finished = FinishPreset::XDOG.apply(&bar(6, 8), 1);
        assert_eq!(finished, paper(16, 8));
    }

    #[test]
    fn wider_strokes_pass_through_dilation_and_closing() {
        let finished = FinishPreset::XDOG.apply(&bar(4, 9), 3);
        assert_eq!(ink_columns(&finished), vec![5, 6, 7]);
    }

    #[test]
    fn close_preset_drops_single_pixel_lines() {
        let finished = FinishPreset::HF.apply(&bar(6, 7), 2);
        assert!(ink_columns(&finished).is_empty());
    }

    #[test]
    fn strokes_along_the_frame_thin_like_interior_ones() {
        let canvas = GrayImage::from_fn(20, 20, |x, _| {
            Luma([if (1..3).contains(&x) { INK } else { PAPER }])
        });
        assert_eq!(FinishPreset::XDOG.apply(&canvas, 2), paper(20, 20));
    }

    #[test]
    fn composite_output_is_two_level() {
        let canvas = bar(2, 6);
        let edges = bar(9, 13);
        let out = composite(&canvas, &edges, FinishPreset::XDOG, 2);
        assert_eq!(out.dimensions(), (16, 8));
        assert!(out.pixels().all(|p| p.0[0] == INK || p.0[0] == PAPER));
    }
}
