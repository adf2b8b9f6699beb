//! Quote image compositing in pure Rust.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Background** | `image` decode + `resize_to_fill`, or a solid canvas |
//! | **Overlay** | per-pixel darken ([`calculations::darken`]) |
//! | **Text** | `imageproc::drawing::draw_text_mut` with an `ab_glyph` font |
//! | **Fallback text** | `font8x8` bitmap glyphs, scaled up |
//! | **Encode** | `image` JPEG/PNG encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for wrapping and layout (unit testable)
//! - **Parameters**: Settings describing one composite
//! - **Providers**: Ordered font and background fallback chains
//! - **Backend**: [`ImageRenderer`] trait + [`RustCompositor`]

pub mod backend;
pub mod backgrounds;
pub mod calculations;
pub mod fonts;
mod params;
pub mod rust_backend;

pub use backend::{ImageRenderer, RenderError};
pub use params::{CANVAS_SIZE, CompositorSettings, Quality, TextLayout, Watermark};
pub use rust_backend::RustCompositor;
