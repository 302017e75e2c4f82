//! Font loading, text measurement, and glyph rasterization.
//!
//! One copy of the watermark string is measured as a whole (kerned advance
//! width, ascent-to-descent height) and then drawn glyph by glyph onto a
//! transparent RGBA layer. The optional stroke is built as a coverage mask:
//! the string is rasterized at every integer offset within the stroke
//! radius and the per-pixel coverages combined by max, so overlapping
//! offsets thicken the outline without stacking alpha. Fill and stroke are
//! resolved into a single source color per pixel before touching the layer,
//! which keeps the rendered alpha at the configured opacity everywhere.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a usable font: {0}")]
    Invalid(#[from] ab_glyph::InvalidFont),
}

/// Bundled fallback face. Loaded at most once per process.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// The bundled default font, used whenever no font path is configured or the
/// configured one fails to load.
pub fn embedded_font() -> FontArc {
    // The embedded face is validated by the font tests; failure here would
    // mean a corrupted build artifact.
    FontArc::try_from_slice(EMBEDDED_FONT_DATA).expect("embedded font is a valid TTF")
}

/// Load a font from a TTF/OTF file.
///
/// Errors are surfaced so the caller can warn and fall back to
/// [`embedded_font`]; a bad font path downgrades to a per-run warning, never
/// a fatal error.
pub fn load_font(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path)?;
    Ok(FontArc::try_from_vec(bytes)?)
}

/// Measure the tight box of `text` at `font_size` pixels.
///
/// Width is the kerned sum of glyph advances; height is ascent minus descent
/// for the scaled face. Empty or unrenderable text measures (0, 0), which the
/// caller treats as a skip.
pub fn measure(font: &FontArc, text: &str, font_size: f32) -> (u32, u32) {
    // Whitespace leaves no ink, so its tight box is empty even though the
    // advance width is not.
    if text.trim().is_empty() {
        return (0, 0);
    }
    let scaled = font.as_scaled(PxScale::from(font_size));

    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    let height = scaled.ascent() - scaled.descent();
    (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
}

/// Stroke settings for [`draw_text`].
#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub width: u32,
    pub color: Rgba<u8>,
}

/// Draw one copy of `text` onto `layer` with its box origin at `(x, y)`.
///
/// `(x, y)` is the top-left corner of the measured text box, matching the
/// coordinates produced by the tile layout. Pixels outside the layer are
/// discarded, though a resolved [`TileSpec`](super::layout::TileSpec) never
/// places any.
pub fn draw_text(
    layer: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    font: &FontArc,
    font_size: f32,
    fill: Rgba<u8>,
    stroke: Option<Stroke>,
) {
    let (width, height) = layer.dimensions();
    let mut fill_cov = Coverage::new(width, height);
    rasterize(&mut fill_cov, x, y, text, font, font_size);

    let stroke = stroke.filter(|s| s.width > 0);
    let stroke_cov = stroke.map(|s| {
        let mut cov = Coverage::new(width, height);
        let r = s.width as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if (dx != 0 || dy != 0) && dx * dx + dy * dy <= r * r {
                    rasterize(&mut cov, x + dx, y + dy, text, font, font_size);
                }
            }
        }
        cov
    });

    let Some((x0, y0, x1, y1)) = union_dirty(&fill_cov, stroke_cov.as_ref()) else {
        return;
    };
    let stroke_color = stroke.map(|s| s.color).unwrap_or(fill);

    for py in y0..=y1 {
        for px in x0..=x1 {
            let f = fill_cov.get(px, py);
            let s = stroke_cov.as_ref().map_or(0.0, |c| c.get(px, py));
            if f <= 0.0 && s <= 0.0 {
                continue;
            }

            // Fill sits on top of the stroke: interpolate by fill coverage
            // so anti-aliased fill edges shade into the outline. The summed
            // alpha never exceeds the larger of the two configured alphas.
            let fa = f * fill[3] as f32;
            let sa = (1.0 - f) * s * stroke_color[3] as f32;
            let a = (fa + sa).round() as u8;
            if a == 0 {
                continue;
            }

            let w = fa / (fa + sa);
            let mix = |fc: u8, sc: u8| -> u8 {
                (fc as f32 * w + sc as f32 * (1.0 - w)).round() as u8
            };
            let src = Rgba([
                mix(fill[0], stroke_color[0]),
                mix(fill[1], stroke_color[1]),
                mix(fill[2], stroke_color[2]),
                a,
            ]);
            let dst = layer.get_pixel(px, py);
            layer.put_pixel(px, py, blend_over(*dst, src));
        }
    }
}

/// Per-pixel glyph coverage for a string, max-combined so overlapping
/// rasterization passes thicken shapes without stacking.
struct Coverage {
    width: u32,
    data: Vec<f32>,
    /// Inclusive bounds of touched pixels, `None` while empty.
    dirty: Option<(u32, u32, u32, u32)>,
}

impl Coverage {
    fn new(width: u32, height: u32) -> Coverage {
        Coverage {
            width,
            data: vec![0.0; (width * height) as usize],
            dirty: None,
        }
    }

    fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    fn bump(&mut self, x: u32, y: u32, coverage: f32) {
        let cell = &mut self.data[(y * self.width + x) as usize];
        if coverage > *cell {
            *cell = coverage;
        }
        self.dirty = Some(match self.dirty {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
}

/// Combined dirty rectangle of the fill mask and the optional stroke mask.
fn union_dirty(fill: &Coverage, stroke: Option<&Coverage>) -> Option<(u32, u32, u32, u32)> {
    match (fill.dirty, stroke.and_then(|c| c.dirty)) {
        (Some((ax0, ay0, ax1, ay1)), Some((bx0, by0, bx1, by1))) => {
            Some((ax0.min(bx0), ay0.min(by0), ax1.max(bx1), ay1.max(by1)))
        }
        (Some(rect), None) | (None, Some(rect)) => Some(rect),
        (None, None) => None,
    }
}

/// Rasterize one pass of the string into a coverage mask.
fn rasterize(mask: &mut Coverage, x: i64, y: i64, text: &str, font: &FontArc, font_size: f32) {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);

    let baseline = y as f32 + scaled.ascent();
    let mut cursor = x as f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    let width = mask.width as i64;
    let height = (mask.data.len() as i64) / width.max(1);

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor += scaled.kern(prev, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let lx = px as i64 + bounds.min.x as i64;
                let ly = py as i64 + bounds.min.y as i64;
                if lx < 0 || ly < 0 || lx >= width || ly >= height {
                    return;
                }
                if coverage > 0.0 {
                    mask.bump(lx as u32, ly as u32, coverage.min(1.0));
                }
            });
        }

        cursor += scaled.h_advance(id);
        prev = Some(id);
    }
}

/// Porter-Duff "over": `top` composited onto `bottom`.
///
/// Shared by the glyph passes (anti-aliased edges overlapping the stroke) and
/// by the final layer-onto-image composite in the processing stage.
pub fn blend_over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let ta = top[3] as f32 / 255.0;
    let ba = bottom[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let v = (t * ta + b * ba * (1.0 - ta)) / out_a;
        (v * 255.0).clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_a * 255.0).round() as u8,
    ])
}
