//! Image renderer trait and shared error type.
//!
//! The orchestrator only ever sees [`ImageRenderer`]. The production
//! implementation is [`RustCompositor`](super::rust_backend::RustCompositor);
//! tests swap in a recording mock.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Turns quote text into a square image file.
pub trait ImageRenderer {
    /// Composite `text` and write it to a draft file derived from
    /// `target_filename`. Returns the path that was written.
    ///
    /// Missing backgrounds or fonts never fail a render; only an unwritable
    /// output path does.
    fn render(&self, text: &str, target_filename: &str) -> Result<PathBuf, RenderError>;
}
