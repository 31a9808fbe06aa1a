//! Normalizes the product reference photo to the 9:16 slide frame.
//!
//! Pure image work: deterministic for identical input and mode, no network.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage, imageops};

use crate::config::FormatMode;

pub const TARGET_WIDTH: u32 = 1080;
pub const TARGET_HEIGHT: u32 = 1920;

/// Formats the image at `path` to 9:16 and writes the result next to it with
/// a `_9x16` suffix. Returns the output path.
pub fn format_to_portrait(path: &Path, mode: FormatMode) -> Result<PathBuf> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open reference image: {}", path.display()))?;

    let framed = apply(&img, mode);

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "reference".into());
    let output = path.with_file_name(format!("{}_9x16.jpg", stem));
    framed
        .save(&output)
        .with_context(|| format!("Failed to save formatted image: {}", output.display()))?;
    Ok(output)
}

/// Fits `img` into the 1080x1920 frame according to `mode`.
pub fn apply(img: &DynamicImage, mode: FormatMode) -> RgbImage {
    let rgb = img.to_rgb8();
    match mode {
        FormatMode::Cover => cover(&rgb),
        FormatMode::Contain => contain(&rgb),
        FormatMode::Stretch => imageops::resize(
            &rgb,
            TARGET_WIDTH,
            TARGET_HEIGHT,
            FilterType::Lanczos3,
        ),
    }
}

/// Center crop to the 9:16 ratio, then scale to the exact target dimensions.
fn cover(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();

    // Compare aspect ratios without floats: wider than 9:16 iff w*16 > h*9.
    let cropped = if u64::from(width) * u64::from(TARGET_HEIGHT)
        > u64::from(height) * u64::from(TARGET_WIDTH)
    {
        let new_width =
            ((u64::from(height) * u64::from(TARGET_WIDTH)) / u64::from(TARGET_HEIGHT)) as u32;
        let left = (width - new_width) / 2;
        imageops::crop_imm(img, left, 0, new_width, height).to_image()
    } else {
        let new_height =
            ((u64::from(width) * u64::from(TARGET_HEIGHT)) / u64::from(TARGET_WIDTH)) as u32;
        let top = (height - new_height) / 2;
        imageops::crop_imm(img, 0, top, width, new_height).to_image()
    };

    imageops::resize(&cropped, TARGET_WIDTH, TARGET_HEIGHT, FilterType::Lanczos3)
}

/// Uniform scale to fit inside the frame, letterboxed on white.
fn contain(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();

    // Scale factor limited by the tighter dimension.
    let (fit_width, fit_height) = if u64::from(width) * u64::from(TARGET_HEIGHT)
        > u64::from(height) * u64::from(TARGET_WIDTH)
    {
        let h = ((u64::from(height) * u64::from(TARGET_WIDTH)) / u64::from(width)) as u32;
        (TARGET_WIDTH, h.max(1))
    } else {
        let w = ((u64::from(width) * u64::from(TARGET_HEIGHT)) / u64::from(height)) as u32;
        (w.max(1), TARGET_HEIGHT)
    };

    let resized = imageops::resize(img, fit_width, fit_height, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(TARGET_WIDTH, TARGET_HEIGHT, Rgb([255, 255, 255]));
    let x = i64::from((TARGET_WIDTH - fit_width) / 2);
    let y = i64::from((TARGET_HEIGHT - fit_height) / 2);
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}
