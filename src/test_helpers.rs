//! Shared test utilities: synthetic image fixtures.
//!
//! Tests never ship binary fixtures; every image is generated on the fly with
//! the same `image` crate codecs the tool itself uses. The gradient fill
//! gives JPEG something compressible that still survives quality loss, and
//! makes "did the watermark change any pixels" assertions meaningful.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::fs;
use std::path::Path;

/// Deterministic two-axis gradient, opaque.
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            120,
            255,
        ])
    })
}

/// Write a synthetic JPEG at `path`, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::DynamicImage::ImageRgba8(gradient(width, height)).into_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    write_fixture(path, &buf);
}

/// Write a synthetic PNG at `path`, creating parent directories.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    write_fixture(path, &buf);
}

fn write_fixture(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}
