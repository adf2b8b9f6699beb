//! Settings for one composite.
//!
//! These structs describe *what* the image should look like. The
//! [`rust_backend`](super::rust_backend) decides how to draw it.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`TextLayout`]: Font size, wrap width, left margin and shadow offset for the quote.
//! - [`Watermark`]: Fixed-position signature text.
//! - [`CompositorSettings`]: Everything above plus overlay and fallback color.

use crate::config::ImageConfig;
use image::Rgb;

/// Width and height of every composited image.
pub const CANVAS_SIZE: u32 = 1080;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    /// Characters per line.
    pub wrap_width: usize,
    pub margin_x: u32,
    /// Offset of the black shadow copy, in pixels, both axes.
    pub shadow_offset: i32,
    pub color: Rgb<u8>,
    pub shadow_color: Rgb<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub size: u32,
    pub color: Rgb<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositorSettings {
    pub layout: TextLayout,
    pub watermark: Watermark,
    pub overlay_alpha: u8,
    pub fallback_color: Rgb<u8>,
    pub quality: Quality,
}

impl CompositorSettings {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            layout: TextLayout {
                font_size: config.font_size,
                wrap_width: config.wrap_width,
                margin_x: config.margin_x,
                shadow_offset: 2,
                color: Rgb([255, 255, 255]),
                shadow_color: Rgb([0, 0, 0]),
            },
            watermark: Watermark {
                text: config.watermark.clone(),
                x: config.watermark_position[0] as i32,
                y: config.watermark_position[1] as i32,
                size: config.watermark_size,
                color: Rgb([200, 200, 200]),
            },
            overlay_alpha: config.overlay_alpha,
            fallback_color: Rgb(config.fallback_color),
            quality: Quality::new(config.quality),
        }
    }
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}
