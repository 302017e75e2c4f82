//! # Tilemark
//!
//! Batch text watermarking for image trees. Point it at a folder, give it a
//! string, and every matching image comes out the other side with the text
//! tiled across its horizontal centerline — the output directory mirrors the
//! input structure exactly.
//!
//! # Architecture: One Pass, Three Concerns
//!
//! ```text
//! 1. Walk      input/    →  sorted file stream   (deterministic, cycle-safe)
//! 2. Stamp     image     →  watermarked pixels   (measure → tile → composite)
//! 3. Mirror    rel path  →  output/rel path      (format-preserving save)
//! ```
//!
//! The walk is depth-first with children visited in name order, so two runs
//! over the same tree always process files in the same order and a run log
//! diffs cleanly against the last one. Directory symlinks are skipped and
//! canonical paths are tracked, so a symlink cycle can never hang a run.
//!
//! Per-file problems (unreadable file, broken JPEG, full disk) are counted
//! and reported but never abort the batch; only setup errors — no input
//! directory, no text, bad config — stop the program before the first image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Deterministic, cycle-safe depth-first traversal of the input tree |
//! | [`watermark`] | Tile geometry ([`watermark::layout`]) and glyph rendering ([`watermark::text`]) |
//! | [`process`] | Per-file pipeline and the batch driver |
//! | [`config`] | JSON config file + CLI merge into resolved [`config::Settings`] |
//! | [`exif`] | JPEG APP1/Exif carry-over across the re-encode |
//! | [`report`] | CLI output formatting — per-file lines and the run summary |
//!
//! # Design Decisions
//!
//! ## Non-Clipping Centerline Band
//!
//! The watermark is a single horizontal band of whole text copies, centered
//! both ways, with every copy kept fully inside the configured margins. When
//! not even one copy fits, the image is skipped (and says so) rather than
//! drawing a clipped fragment — partial glyphs at the canvas edge read as a
//! rendering bug, not a mark.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, glyph rasterization, and encoding all happen in-process via the
//! `image` and `ab_glyph` crates. No ImageMagick, no system font lookup: a
//! monospace face is embedded in the binary so the tool works on a bare
//! machine, and `--font` swaps in any TTF/OTF.
//!
//! ## Idempotent by Default
//!
//! Existing outputs are skipped unless `--overwrite` is given, and the
//! existence check runs before the source file is even opened. Re-running
//! after a partial batch only does the remaining work.

pub mod config;
pub mod exif;
pub mod process;
pub mod report;
pub mod walk;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
