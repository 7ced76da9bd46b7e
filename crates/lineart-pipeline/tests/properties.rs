//! End-to-end properties of both coloring-page variants.

#![allow(clippy::unwrap_used)]

use image::{GrayImage, Rgb, RgbImage};
use lineart_pipeline::types::{INK, PAPER};
use lineart_pipeline::{ErrorKind, HfParams, XdogParams, process_hf, process_xdog};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// High-contrast checkerboard of `block`-pixel tiles in two colours.
fn checkerboard(width: u32, height: u32, block: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x / block + y / block) % 2 == 0 {
            Rgb([25, 35, 60])
        } else {
            Rgb([235, 225, 200])
        }
    })
}

/// Light page with a few filled shapes of different tones.
fn shapes(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (f64::from(x), f64::from(y));
        let in_disc = (fx - 30.0).powi(2) + (fy - 30.0).powi(2) < 18.0_f64.powi(2);
        if in_disc {
            Rgb([200, 40, 40])
        } else if (60..100).contains(&x) && (10..50).contains(&y) {
            Rgb([30, 30, 140])
        } else if (20..90).contains(&x) && (56..62).contains(&y) {
            Rgb([20, 120, 20])
        } else {
            Rgb([245, 240, 230])
        }
    })
}

fn is_two_level(raster: &GrayImage) -> bool {
    raster.pixels().all(|p| p.0[0] == INK || p.0[0] == PAPER)
}

#[test]
fn xdog_bounds_large_input_and_emits_png() {
    let bytes = png_bytes(&checkerboard(2000, 1000, 125));
    let art = process_xdog(&bytes, &XdogParams::default()).unwrap();

    assert_eq!(art.dimensions.width, 1024);
    assert_eq!(art.dimensions.height, 512);
    assert_eq!(art.encoded.media_type, "image/png");
    assert!(art.encoded.bytes.starts_with(PNG_SIGNATURE));
    let decoded = image::load_from_memory(&art.encoded.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1024, 512));
    assert!(is_two_level(&art.raster));
}

#[test]
fn xdog_high_contrast_input_keeps_composite() {
    let bytes = png_bytes(&checkerboard(2000, 1000, 125));
    let art = process_xdog(&bytes, &XdogParams::default()).unwrap();
    assert!(art.composited_mean <= 250.0, "mean {}", art.composited_mean);
    assert!(!art.fallback_used);
    assert!(art.raster.pixels().any(|p| p.0[0] == INK));
}

#[test]
fn uniform_gray_triggers_blank_fallback() {
    let bytes = png_bytes(&RgbImage::from_pixel(100, 80, Rgb([128, 128, 128])));
    let art = process_xdog(&bytes, &XdogParams::default()).unwrap();
    assert!(art.composited_mean > 250.0);
    assert!(art.fallback_used);
    assert!(art.raster.pixels().all(|p| p.0[0] == PAPER));
}

#[test]
fn invert_is_exact_complement() {
    let bytes = png_bytes(&shapes(120, 80));

    let plain = process_xdog(&bytes, &XdogParams::default()).unwrap();
    let inverted = process_xdog(
        &bytes,
        &XdogParams {
            invert_colors: true,
            ..XdogParams::default()
        },
    )
    .unwrap();
    for (a, b) in plain.raster.pixels().zip(inverted.raster.pixels()) {
        assert_eq!(a.0[0], !b.0[0]);
    }

    let plain = process_hf(&bytes, &HfParams::default()).unwrap();
    let inverted = process_hf(
        &bytes,
        &HfParams {
            invert_colors: true,
            ..HfParams::default()
        },
    )
    .unwrap();
    for (a, b) in plain.raster.pixels().zip(inverted.raster.pixels()) {
        assert_eq!(a.0[0], !b.0[0]);
    }
}

#[test]
fn cluster_count_clamps_to_boundaries() {
    let bytes = png_bytes(&shapes(120, 80));
    let run = |k| {
        process_xdog(
            &bytes,
            &XdogParams {
                k_clusters: k,
                ..XdogParams::default()
            },
        )
        .unwrap()
        .encoded
    };
    assert_eq!(run(1), run(2));
    assert_eq!(run(-7), run(2));
    assert_eq!(run(50), run(12));
}

#[test]
fn hf_cluster_count_clamps_to_boundaries() {
    let bytes = png_bytes(&shapes(60, 40));
    let run = |k| {
        process_hf(
            &bytes,
            &HfParams {
                k,
                ..HfParams::default()
            },
        )
        .unwrap()
        .encoded
    };
    assert_eq!(run(0), run(2));
    assert_eq!(run(99), run(12));
}

#[test]
fn raising_min_area_never_adds_ink() {
    let bytes = png_bytes(&shapes(120, 80));
    let run = |min_area| {
        process_hf(
            &bytes,
            &HfParams {
                min_area,
                line_thickness: 3,
                ..HfParams::default()
            },
        )
        .unwrap()
        .raster
    };
    let loose = run(0);
    for strict in [run(300), run(2000)] {
        for (s, l) in strict.pixels().zip(loose.pixels()) {
            if s.0[0] == INK {
                assert_eq!(l.0[0], INK);
            }
        }
    }
}

#[test]
fn hf_output_matches_input_size_and_is_two_level() {
    let bytes = png_bytes(&shapes(120, 80));
    let art = process_hf(&bytes, &HfParams::default()).unwrap();
    assert_eq!((art.dimensions.width, art.dimensions.height), (120, 80));
    assert!(!art.fallback_used);
    assert!(is_two_level(&art.raster));
}

#[test]
fn runs_are_reproducible() {
    let bytes = png_bytes(&shapes(120, 80));
    let a = process_xdog(&bytes, &XdogParams::default()).unwrap();
    let b = process_xdog(&bytes, &XdogParams::default()).unwrap();
    assert_eq!(a.encoded, b.encoded);
}

#[test]
fn empty_and_garbage_uploads_are_decode_errors() {
    let uploads: [&[u8]; 3] = [b"", b"GIF89a but not really", &[0xff, 0xd8, 0xff, 0x00]];
    for bytes in uploads {
        let err = process_xdog(bytes, &XdogParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        let err = process_hf(bytes, &HfParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
