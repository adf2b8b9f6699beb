//! Font resolution: an ordered chain of font providers.
//!
//! Each configured font file is a provider; the embedded 8×8 bitmap font is
//! the last one and always succeeds, so resolution never fails.

use super::calculations::bitmap_scale;
use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

/// Glyph source used to draw text.
pub enum Glyphs {
    /// A TrueType/OpenType font, rasterized at any size.
    Vector(FontVec),
    /// Built-in 8×8 bitmap glyphs, ASCII only.
    Bitmap,
}

impl Glyphs {
    /// Draw `text` with its top-left corner at `(x, y)`. Clipped to the canvas.
    pub fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: u32, color: Rgb<u8>) {
        match self {
            Glyphs::Vector(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size as f32), font, text);
            }
            Glyphs::Bitmap => draw_bitmap_text(canvas, text, x, y, bitmap_scale(size), color),
        }
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self, Glyphs::Bitmap)
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let cell = 8 * scale as i32;
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as i32 * cell;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..8i32 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = origin_x + col * scale as i32;
                let py = y + row as i32 * scale as i32;
                draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

/// One step in the font fallback chain.
pub trait FontProvider {
    /// Try to produce glyphs. `None` moves on to the next provider.
    fn load(&self) -> Option<Glyphs>;

    fn describe(&self) -> String;
}

/// A font file on disk.
pub struct FontFile(pub PathBuf);

impl FontProvider for FontFile {
    fn load(&self) -> Option<Glyphs> {
        let bytes = std::fs::read(&self.0).ok()?;
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(Glyphs::Vector(font)),
            Err(e) => {
                tracing::debug!(path = %self.0.display(), error = %e, "font file rejected");
                None
            }
        }
    }

    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// The embedded bitmap font.
pub struct BuiltinBitmap;

impl FontProvider for BuiltinBitmap {
    fn load(&self) -> Option<Glyphs> {
        Some(Glyphs::Bitmap)
    }

    fn describe(&self) -> String {
        "built-in 8x8 bitmap".to_string()
    }
}

/// Configured font files in order, then the built-in bitmap font.
pub fn font_chain(paths: &[PathBuf]) -> Vec<Box<dyn FontProvider>> {
    let mut chain: Vec<Box<dyn FontProvider>> = paths
        .iter()
        .map(|p| Box::new(FontFile(p.clone())) as Box<dyn FontProvider>)
        .collect();
    chain.push(Box::new(BuiltinBitmap));
    chain
}

/// A resolved font and where it came from.
pub struct ResolvedFont {
    pub glyphs: Glyphs,
    pub source: String,
}

/// Walk the chain; the first provider that loads successfully wins.
pub fn resolve_font(chain: &[Box<dyn FontProvider>]) -> ResolvedFont {
    for provider in chain {
        if let Some(glyphs) = provider.load() {
            return ResolvedFont {
                glyphs,
                source: provider.describe(),
            };
        }
    }
    ResolvedFont {
        glyphs: Glyphs::Bitmap,
        source: BuiltinBitmap.describe(),
    }
}

/// Resolve the configured font paths, logging when the fallback is used.
pub fn resolve_configured_font(paths: &[PathBuf]) -> ResolvedFont {
    let resolved = resolve_font(&font_chain(paths));
    if resolved.glyphs.is_bitmap() {
        tracing::warn!(
            candidates = paths.len(),
            "no font file could be loaded, using built-in bitmap font"
        );
    } else {
        tracing::debug!(font = %resolved.source, "font resolved");
    }
    resolved
}

/// True when `path` exists and parses as a font. Used by `check`.
pub fn font_loads(path: &Path) -> bool {
    FontFile(path.to_path_buf()).load().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_fall_back_to_bitmap() {
        let chain = font_chain(&[
            PathBuf::from("/nonexistent/a.ttf"),
            PathBuf::from("/nonexistent/b.ttf"),
        ]);
        assert_eq!(chain.len(), 3);
        let resolved = resolve_font(&chain);
        assert!(resolved.glyphs.is_bitmap());
        assert_eq!(resolved.source, "built-in 8x8 bitmap");
    }

    #[test]
    fn garbage_font_file_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bogus = tmp.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        assert!(!font_loads(&bogus));
        assert!(resolve_font(&font_chain(&[bogus])).glyphs.is_bitmap());
    }

    #[test]
    fn empty_chain_still_resolves() {
        assert!(resolve_font(&[]).glyphs.is_bitmap());
    }

    #[test]
    fn bitmap_text_marks_pixels() {
        let mut canvas = RgbImage::new(64, 16);
        Glyphs::Bitmap.draw(&mut canvas, "A", 0, 0, 15, Rgb([255, 255, 255]));
        assert!(canvas.pixels().any(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn bitmap_text_outside_canvas_is_clipped() {
        let mut canvas = RgbImage::new(16, 16);
        Glyphs::Bitmap.draw(&mut canvas, "Hello", 100, 100, 60, Rgb([255, 255, 255]));
        assert!(canvas.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn non_ascii_draws_placeholder() {
        let mut canvas = RgbImage::new(32, 16);
        Glyphs::Bitmap.draw(&mut canvas, "你", 0, 0, 15, Rgb([255, 0, 0]));
        assert!(canvas.pixels().any(|p| p.0 == [255, 0, 0]));
    }
}
