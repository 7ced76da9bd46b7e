//! Grayscale morphology over square structuring elements.
//!
//! Thin wrappers over [`imageproc::morphology`]. Erosion takes the
//! neighbourhood minimum and dilation the maximum, so on a paper-white
//! canvas dilation grows paper and thins ink, and closing (dilate, then
//! erode) removes ink features narrower than the element.
//!
//! A `side`×`side` element is anchored at `side / 2`, so odd elements are
//! centred and even ones lean towards the top-left. Samples outside the
//! image are ignored.

use image::{GrayImage, Luma};
use imageproc::morphology::{self as ops, Mask};

/// Largest element side `imageproc` masks accept.
pub const MAX_SIDE: u32 = 511;

/// Neighbourhood minimum over a `side`×`side` element.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, side: u32) -> GrayImage {
    if side <= 1 {
        return image.clone();
    }
    ops::grayscale_erode(image, &square(side))
}

/// Neighbourhood maximum over a `side`×`side` element.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, side: u32) -> GrayImage {
    if side <= 1 {
        return image.clone();
    }
    ops::grayscale_dilate(image, &square(side))
}

/// Erosion followed by dilation: removes bright specks smaller than the
/// element.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, side: u32) -> GrayImage {
    if side <= 1 {
        return image.clone();
    }
    ops::grayscale_open(image, &square(side))
}

/// Dilation followed by erosion: fills dark gaps smaller than the
/// element.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, side: u32) -> GrayImage {
    if side <= 1 {
        return image.clone();
    }
    ops::grayscale_close(image, &square(side))
}

/// Square mask anchored at `side / 2`; `side` is clamped to [`MAX_SIDE`].
fn square(side: u32) -> Mask {
    let side = side.min(MAX_SIDE);
    let anchor = u8::try_from(side / 2).unwrap_or(u8::MAX);
    Mask::from_image(&GrayImage::from_pixel(side, side, Luma([u8::MAX])), anchor, anchor)
}
