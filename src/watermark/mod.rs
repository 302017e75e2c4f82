//! Watermark geometry and rendering.
//!
//! [`layout`] computes where the repeated text goes (pure math),
//! [`text`] turns a string into pixels at those positions. The processing
//! stage glues the two onto decoded images.

pub mod layout;
pub mod text;

pub use layout::TileSpec;
pub use text::{FontError, Stroke, draw_text, embedded_font, load_font, measure};

/// What gets stamped onto each image.
///
/// Only text watermarks are implemented. The image variant exists so that a
/// configured watermark image fails loudly instead of being silently
/// ignored; see [`crate::config::SetupError::ImageWatermarkUnsupported`].
#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkKind {
    /// Repeated text tiled across the horizontal centerline.
    Text(String),
    /// A logo/overlay image. Accepted by the CLI, not implemented.
    Image(std::path::PathBuf),
}
