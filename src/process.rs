//! Per-file watermarking and the batch driver.
//!
//! [`process_file`] takes one image through the full job lifecycle:
//!
//! ```text
//! (exists check) -> decode -> measure -> { skip | tile } -> composite -> save
//! ```
//!
//! and [`run`] drives it: pull the walker one path at a time, filter by
//! extension, mirror the relative path under the output root, process, and
//! stream an [`Event`] per file to the reporting layer. Strictly
//! single-threaded: each file is fully finished before the next is pulled,
//! and nothing is shared across jobs.
//!
//! ## Failure isolation
//!
//! A decode error, an unwritable destination, or any other per-file problem
//! is counted and reported, never fatal; only setup errors (missing input
//! tree, no text) abort the batch. When the destination already exists and
//! overwriting is off, the source file is never even opened.

use crate::config::{Settings, SetupError};
use crate::exif;
use crate::walk::walk;
use crate::watermark::{self, Stroke, TileSpec, WatermarkKind};
use ab_glyph::FontArc;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Why a file produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Destination exists and `--overwrite` was not given.
    DestinationExists,
    /// The text measured to an empty box.
    DegenerateText,
    /// Not even one copy fits between the margins.
    NoSpace,
}

/// Result of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    Skipped(SkipReason),
}

/// Everything one file's job needs. Built per discovered file, dropped after.
pub struct Job<'a> {
    pub source: &'a Path,
    pub dest: &'a Path,
    pub text: &'a str,
    pub font: &'a FontArc,
    pub settings: &'a Settings,
}

/// Watermark a single image.
///
/// Skips are ordinary outcomes, not errors; `Err` means this file failed
/// (unreadable, undecodable, unwritable) and the batch should move on.
pub fn process_file(job: &Job) -> Result<Outcome, ProcessError> {
    // Fast short-circuit: no source read, no decode.
    if job.dest.exists() && !job.settings.overwrite {
        return Ok(Outcome::Skipped(SkipReason::DestinationExists));
    }

    let bytes = fs::read(job.source)?;
    // Captured up front; the decode below drops every metadata segment.
    let exif_payload = if is_lossy(job.dest) {
        exif::extract_app1(&bytes)
    } else {
        None
    };

    let base = decode_oriented(&bytes)?;
    let (width, height) = base.dimensions();

    let font_size = job.settings.effective_font_size(height);
    let (text_width, text_height) = watermark::measure(job.font, job.text, font_size as f32);
    if text_width == 0 || text_height == 0 {
        return Ok(Outcome::Skipped(SkipReason::DegenerateText));
    }

    let gap = job.settings.effective_gap(font_size);
    let Some(spec) = TileSpec::resolve(
        width,
        height,
        text_width,
        text_height,
        gap,
        job.settings.margin,
    ) else {
        return Ok(Outcome::Skipped(SkipReason::NoSpace));
    };

    let alpha = (255.0 * job.settings.opacity.clamp(0.0, 1.0)).round() as u8;
    let fill = Rgba([255, 255, 255, alpha]);
    let stroke = (job.settings.stroke && job.settings.stroke_width > 0).then_some(Stroke {
        width: job.settings.stroke_width,
        color: Rgba([0, 0, 0, alpha]),
    });

    // Draw on a transparent layer, then blend the layer over the base, so
    // overlapping stroke and fill passes never double-darken the photo.
    let mut layer = RgbaImage::new(width, height);
    for (x, y) in spec.positions() {
        watermark::draw_text(
            &mut layer,
            x,
            y,
            job.text,
            job.font,
            font_size as f32,
            fill,
            stroke,
        );
    }

    let mut composited = base;
    composite_layer(&mut composited, &layer);

    if let Some(parent) = job.dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let encoded = encode(
        &composited,
        job.dest,
        job.settings.quality,
        exif_payload.as_deref(),
    )?;
    fs::write(job.dest, encoded)?;
    Ok(Outcome::Saved)
}

/// Decode from bytes, apply the EXIF orientation, normalize to RGBA8.
fn decode_oriented(bytes: &[u8]) -> Result<RgbaImage, ProcessError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image.into_rgba8())
}

/// Blend the text layer over the base image (Porter-Duff "over").
fn composite_layer(base: &mut RgbaImage, layer: &RgbaImage) {
    for (bottom, top) in base.pixels_mut().zip(layer.pixels()) {
        if top[3] > 0 {
            *bottom = watermark::text::blend_over(*bottom, *top);
        }
    }
}

fn is_lossy(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Encode for the destination's format.
///
/// Lossy destinations are flattened to RGB at the configured quality with the
/// captured Exif segment spliced back in; everything else becomes PNG with
/// the alpha channel intact.
fn encode(
    image: &RgbaImage,
    dest: &Path,
    quality: u8,
    exif_payload: Option<&[u8]>,
) -> Result<Vec<u8>, ProcessError> {
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    let mut buf = Vec::new();
    if is_lossy(dest) {
        let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
        JpegEncoder::new_with_quality(&mut buf, quality).write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;
        if let Some(payload) = exif_payload {
            buf = exif::splice_app1(&buf, payload);
        }
    } else {
        PngEncoder::new(&mut buf).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )?;
    }
    Ok(buf)
}

// ============================================================================
// Batch driver
// ============================================================================

/// Per-file progress, streamed to the reporting layer as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Configured font failed to load; the embedded default is used instead.
    FontFallback { path: PathBuf, message: String },
    Saved { source: PathBuf, dest: PathBuf },
    Skipped { source: PathBuf, reason: SkipReason },
    Failed { source: PathBuf, message: String },
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub skipped_existing: usize,
    pub skipped_degenerate: usize,
    pub skipped_no_space: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_existing + self.skipped_degenerate + self.skipped_no_space
    }

    pub fn total(&self) -> usize {
        self.saved + self.skipped() + self.failed
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Saved => self.saved += 1,
            Outcome::Skipped(SkipReason::DestinationExists) => self.skipped_existing += 1,
            Outcome::Skipped(SkipReason::DegenerateText) => self.skipped_degenerate += 1,
            Outcome::Skipped(SkipReason::NoSpace) => self.skipped_no_space += 1,
        }
    }
}

/// Run the batch: walk the input tree and watermark every allowed file into
/// the mirrored output tree.
///
/// `on_event` receives one [`Event`] per processed file (plus at most one
/// font-fallback notice up front); the CLI prints them as they arrive.
pub fn run(
    settings: &Settings,
    mut on_event: impl FnMut(&Event),
) -> Result<RunSummary, SetupError> {
    if !settings.input.is_dir() {
        return Err(SetupError::InputNotFound(settings.input.clone()));
    }
    let text = match &settings.watermark {
        WatermarkKind::Text(text) => text.as_str(),
        WatermarkKind::Image(path) => {
            return Err(SetupError::ImageWatermarkUnsupported(path.clone()));
        }
    };

    let font = match &settings.font {
        Some(path) => match watermark::load_font(path) {
            Ok(font) => font,
            Err(e) => {
                on_event(&Event::FontFallback {
                    path: path.clone(),
                    message: e.to_string(),
                });
                watermark::embedded_font()
            }
        },
        None => watermark::embedded_font(),
    };

    let mut summary = RunSummary::default();
    for entry in walk(&settings.input) {
        let source = match entry {
            Ok(path) => path,
            Err(e) => {
                summary.failed += 1;
                on_event(&Event::Failed {
                    source: e.path,
                    message: e.source.to_string(),
                });
                continue;
            }
        };
        if !settings.allows_extension(&source) {
            continue;
        }

        // The walker only yields paths under the input root.
        let rel = source.strip_prefix(&settings.input).unwrap_or(&source);
        let dest = settings.output.join(rel);

        let job = Job {
            source: &source,
            dest: &dest,
            text,
            font: &font,
            settings,
        };
        match process_file(&job) {
            Ok(outcome) => {
                summary.record(outcome);
                on_event(&match outcome {
                    Outcome::Saved => Event::Saved {
                        source: source.clone(),
                        dest: dest.clone(),
                    },
                    Outcome::Skipped(reason) => Event::Skipped {
                        source: source.clone(),
                        reason,
                    },
                });
            }
            Err(e) => {
                summary.failed += 1;
                on_event(&Event::Failed {
                    source: source.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(summary)
}
