//! Tile geometry for the watermark band.
//!
//! Pure integer math, no I/O: given an image's dimensions and the measured
//! text box, work out how many whole copies of the text fit side by side
//! inside the margins and where each copy is drawn so the block is centered.
//!
//! The resolved layout never clips: every copy lies fully inside
//! `margin .. image_width - margin`. When not even a single copy fits, there
//! is no layout and the image is left unwatermarked. (An earlier variant of
//! this tool tiled from the center outward and clipped the outermost copies
//! at the canvas edge; that behavior was dropped — partial glyphs at the
//! edges look like an encoding bug, not a watermark.)

/// Resolved placement of the tiled text band on one image.
///
/// Invariant: `count * text_width + (count - 1) * gap <= image_width - 2 * margin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpec {
    /// Measured width of one copy of the text, in pixels.
    pub text_width: u32,
    /// Measured height of the text box, in pixels.
    pub text_height: u32,
    /// Horizontal spacing between adjacent copies.
    pub gap: u32,
    /// Number of whole copies drawn.
    pub count: u32,
    /// X of the leftmost copy; centers the whole block horizontally.
    pub start_x: i64,
    /// Y of every copy; centers the text box vertically.
    pub y: i64,
}

impl TileSpec {
    /// Compute the layout for an image, or `None` when nothing fits.
    ///
    /// Returns `None` when the text box is degenerate (zero-sized) or when a
    /// single copy is wider than the usable band between margins.
    pub fn resolve(
        image_width: u32,
        image_height: u32,
        text_width: u32,
        text_height: u32,
        gap: u32,
        margin: u32,
    ) -> Option<TileSpec> {
        if text_width == 0 || text_height == 0 {
            return None;
        }

        let usable = image_width as i64 - 2 * margin as i64;
        let tw = text_width as i64;
        let g = gap as i64;
        if usable < tw {
            return None;
        }

        // Initial estimate, then correct downward so the inequality holds
        // exactly. Each copy past the first costs text_width + gap.
        let mut count = (usable + g) / (tw + g);
        while count > 1 && count * tw + (count - 1) * g > usable {
            count -= 1;
        }
        if count < 1 {
            return None;
        }

        let total = count * tw + (count - 1) * g;
        Some(TileSpec {
            text_width,
            text_height,
            gap,
            count: count as u32,
            start_x: (image_width as i64 - total) / 2,
            y: (image_height as i64 - text_height as i64) / 2,
        })
    }

    /// Total width of the tiled block.
    pub fn total_width(&self) -> i64 {
        let tw = self.text_width as i64;
        let g = self.gap as i64;
        self.count as i64 * tw + (self.count as i64 - 1) * g
    }

    /// Draw origin of each copy, left to right.
    pub fn positions(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let step = self.text_width as i64 + self.gap as i64;
        (0..self.count as i64).map(move |i| (self.start_x + i * step, self.y))
    }
}
