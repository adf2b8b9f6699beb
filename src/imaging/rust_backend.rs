//! Pure Rust quote compositor.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Background decode | `image` crate (pure Rust decoders) |
//! | Fill + crop | `image::DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Dark overlay | per-pixel [`darken`] |
//! | Text | `imageproc::drawing::draw_text_mut` (`ab_glyph` font) or `font8x8` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{ImageRenderer, RenderError};
use super::backgrounds::{BackgroundProvider, background_chain, compose_background};
use super::calculations::{block_top, darken, line_height, wrap_text};
use super::fonts::{ResolvedFont, resolve_configured_font};
use super::params::{CANVAS_SIZE, CompositorSettings};
use crate::config::ImageConfig;
use crate::naming::temp_filename;
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

/// Renders quote images with the `image`/`imageproc` stack.
///
/// The font is resolved once at construction. The background is picked per
/// render, so consecutive images differ when several photos are available.
pub struct RustCompositor {
    settings: CompositorSettings,
    font: ResolvedFont,
    backgrounds: Vec<Box<dyn BackgroundProvider>>,
    work_dir: PathBuf,
}

impl RustCompositor {
    pub fn new(
        settings: CompositorSettings,
        font: ResolvedFont,
        backgrounds: Vec<Box<dyn BackgroundProvider>>,
        work_dir: &Path,
    ) -> Self {
        Self {
            settings,
            font,
            backgrounds,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Build from configuration: configured font chain and background directory.
    pub fn from_config(config: &ImageConfig, work_dir: &Path) -> Self {
        let settings = CompositorSettings::from_config(config);
        let backgrounds = background_chain(&config.background_dir, settings.fallback_color);
        Self::new(
            settings,
            resolve_configured_font(&config.font_paths),
            backgrounds,
            work_dir,
        )
    }

    pub fn font_source(&self) -> &str {
        &self.font.source
    }

    /// Draw the full composite in memory.
    pub fn compose(&self, text: &str) -> RgbImage {
        let mut canvas = compose_background(&self.backgrounds, CANVAS_SIZE);
        apply_overlay(&mut canvas, self.settings.overlay_alpha);

        let layout = &self.settings.layout;
        let lines = wrap_text(text, layout.wrap_width);
        let advance = line_height(layout.font_size);
        let mut y = block_top(lines.len(), advance, CANVAS_SIZE);
        let x = layout.margin_x as i32;
        for line in &lines {
            let offset = layout.shadow_offset;
            self.font.glyphs.draw(
                &mut canvas,
                line,
                x + offset,
                y + offset,
                layout.font_size,
                layout.shadow_color,
            );
            self.font
                .glyphs
                .draw(&mut canvas, line, x, y, layout.font_size, layout.color);
            y += advance as i32;
        }

        let mark = &self.settings.watermark;
        if !mark.text.is_empty() {
            self.font
                .glyphs
                .draw(&mut canvas, &mark.text, mark.x, mark.y, mark.size, mark.color);
        }
        canvas
    }
}

fn apply_overlay(canvas: &mut RgbImage, alpha: u8) {
    if alpha == 0 {
        return;
    }
    for pixel in canvas.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = darken(*channel, alpha);
        }
    }
}

/// Encode and save, dispatching on the file extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), RenderError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    match ext.as_str() {
        "jpg" | "jpeg" => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
            img.write_with_encoder(encoder)
                .map_err(|e| RenderError::Encode(format!("JPEG encode failed: {e}")))
        }
        "png" => {
            let encoder = image::codecs::png::PngEncoder::new(writer);
            img.write_with_encoder(encoder)
                .map_err(|e| RenderError::Encode(format!("PNG encode failed: {e}")))
        }
        other => Err(RenderError::Encode(format!(
            "Unsupported output format: {other}"
        ))),
    }
}

impl ImageRenderer for RustCompositor {
    fn render(&self, text: &str, target_filename: &str) -> Result<PathBuf, RenderError> {
        let canvas = self.compose(text);
        std::fs::create_dir_all(&self.work_dir)?;
        let path = self.work_dir.join(temp_filename(target_filename));
        if let Err(e) = save_image(&DynamicImage::ImageRgb8(canvas), &path, self.settings.quality.value()) {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        tracing::debug!(path = %path.display(), "image rendered");
        Ok(path)
    }
}
