//! Configuration loading and merging.
//!
//! Settings come from two places: an optional JSON config file and the
//! command line, with the command line winning field by field. The merge is
//! a pure function — no process-wide state — and produces a fully resolved
//! [`Settings`] that the rest of the pipeline consumes.
//!
//! ## Config file
//!
//! All keys are optional; unknown keys are rejected to catch typos early:
//!
//! ```json
//! {
//!     "input": "photos",
//!     "output": "stamped",
//!     "text": "© 2026 studio",
//!     "ext": "jpg,jpeg,png",
//!     "font": "fonts/Inter.ttf",
//!     "font_size": 48,
//!     "opacity": 0.25,
//!     "margin": 16,
//!     "stroke": true,
//!     "stroke_width": 2,
//!     "quality": 90
//! }
//! ```
//!
//! `font_scale` sizes the text relative to each image's height instead of
//! `font_size`; `gap` defaults to half the effective font size when not set.

use crate::watermark::WatermarkKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal setup problems. Any of these aborts the run before the first image.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no input folder configured (use --input or the config file)")]
    MissingInput,
    #[error("input folder not found: {0}")]
    InputNotFound(PathBuf),
    #[error("no output folder configured (use --output or the config file)")]
    MissingOutput,
    #[error("no watermark text provided (use --text or the config file)")]
    MissingText,
    #[error("image watermarks are not supported (configured: {0})")]
    ImageWatermarkUnsupported(PathBuf),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Sparse config-file contents. Every key optional, unknown keys rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub text: Option<String>,
    pub wm_image: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub ext: Option<String>,
    pub font: Option<PathBuf>,
    pub font_size: Option<u32>,
    pub font_scale: Option<f32>,
    pub font_min_size: Option<u32>,
    pub font_max_size: Option<u32>,
    pub opacity: Option<f32>,
    pub gap: Option<u32>,
    pub margin: Option<u32>,
    pub stroke: Option<bool>,
    pub stroke_width: Option<u32>,
    pub quality: Option<u8>,
}

/// Values the user passed on the command line. Same shape as [`FileConfig`];
/// `None` means "flag not given", so the file value survives the merge.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub text: Option<String>,
    pub wm_image: Option<PathBuf>,
    /// `true` only when `--overwrite` was present (flags cannot be unset).
    pub overwrite: bool,
    pub ext: Option<String>,
    pub font: Option<PathBuf>,
    pub font_size: Option<u32>,
    pub font_scale: Option<f32>,
    pub font_min_size: Option<u32>,
    pub font_max_size: Option<u32>,
    pub opacity: Option<f32>,
    pub gap: Option<u32>,
    pub margin: Option<u32>,
    /// `true` only when `--stroke` was present.
    pub stroke: bool,
    pub stroke_width: Option<u32>,
    pub quality: Option<u8>,
}

/// Fully resolved settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub watermark: WatermarkKind,
    pub overwrite: bool,
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    pub font: Option<PathBuf>,
    pub font_size: u32,
    /// Fraction of image height; overrides `font_size` when set.
    pub font_scale: Option<f32>,
    pub font_min_size: u32,
    pub font_max_size: u32,
    pub opacity: f32,
    /// Explicit tile gap; `None` derives half the effective font size.
    pub gap: Option<u32>,
    pub margin: u32,
    pub stroke: bool,
    pub stroke_width: u32,
    /// JPEG quality, 1-95. Ignored for lossless outputs.
    pub quality: u8,
}

impl Settings {
    /// Merge file defaults with CLI overrides (CLI wins) and apply the stock
    /// defaults for everything neither provided.
    pub fn merge(file: FileConfig, cli: Overrides) -> Result<Settings, SetupError> {
        let input = cli.input.or(file.input).ok_or(SetupError::MissingInput)?;
        let output = cli.output.or(file.output).ok_or(SetupError::MissingOutput)?;

        let text = cli.text.or(file.text);
        let wm_image = cli.wm_image.or(file.wm_image);
        let watermark = match (text, wm_image) {
            // Text wins when both are configured, like the original tool.
            (Some(text), _) => WatermarkKind::Text(text),
            (None, Some(path)) => WatermarkKind::Image(path),
            (None, None) => return Err(SetupError::MissingText),
        };

        let ext = cli
            .ext
            .or(file.ext)
            .unwrap_or_else(|| "jpg,jpeg,png".to_string());

        Ok(Settings {
            input,
            output,
            watermark,
            overwrite: cli.overwrite || file.overwrite.unwrap_or(false),
            extensions: parse_extensions(&ext),
            font: cli.font.or(file.font),
            font_size: cli.font_size.or(file.font_size).unwrap_or(48),
            font_scale: cli.font_scale.or(file.font_scale),
            font_min_size: cli.font_min_size.or(file.font_min_size).unwrap_or(10),
            font_max_size: cli.font_max_size.or(file.font_max_size).unwrap_or(512),
            opacity: cli.opacity.or(file.opacity).unwrap_or(0.25),
            gap: cli.gap.or(file.gap),
            margin: cli.margin.or(file.margin).unwrap_or(16),
            stroke: cli.stroke || file.stroke.unwrap_or(false),
            stroke_width: cli.stroke_width.or(file.stroke_width).unwrap_or(2),
            quality: cli.quality.or(file.quality).unwrap_or(90),
        })
    }

    /// Check values are within acceptable ranges and the watermark kind is
    /// one this tool implements.
    pub fn validate(&self) -> Result<(), SetupError> {
        if let WatermarkKind::Image(path) = &self.watermark {
            return Err(SetupError::ImageWatermarkUnsupported(path.clone()));
        }
        if !(1..=95).contains(&self.quality) {
            return Err(SetupError::Validation("quality must be 1-95".into()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(SetupError::Validation("opacity must be 0-1".into()));
        }
        if self.font_size == 0 {
            return Err(SetupError::Validation("font_size must be positive".into()));
        }
        if self.font_min_size > self.font_max_size {
            return Err(SetupError::Validation(
                "font_min_size must not exceed font_max_size".into(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(SetupError::Validation(
                "ext must list at least one extension".into(),
            ));
        }
        Ok(())
    }

    /// Whether `path` has one of the allowed extensions (case-insensitive).
    pub fn allows_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|allowed| *allowed == e))
    }

    /// Font size for an image of the given height.
    ///
    /// With `font_scale` set, size tracks the image: `round(height * scale)
    /// * 1.5`, clamped to `[font_min_size, font_max_size]`. Otherwise the
    /// fixed `font_size` applies.
    pub fn effective_font_size(&self, image_height: u32) -> u32 {
        match self.font_scale {
            Some(scale) => {
                let scaled = ((image_height as f32 * scale).round() * 1.5) as u32;
                scaled.clamp(self.font_min_size, self.font_max_size)
            }
            None => self.font_size,
        }
    }

    /// Tile gap for the given effective font size: explicit `gap` wins,
    /// otherwise half the font size.
    pub fn effective_gap(&self, font_size: u32) -> u32 {
        self.gap.unwrap_or(font_size / 2)
    }
}

/// Parse a comma-separated extension allow-list: trimmed, lowercased, empty
/// entries and leading dots dropped.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Read and parse a JSON config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig, SetupError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
