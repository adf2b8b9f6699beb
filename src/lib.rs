//! # Daily Vibes
//!
//! A content pipeline for a quote-of-the-day site. Each run asks a
//! text-generation service for a batch of short inspirational quotes, renders
//! every quote onto a square image, stores the pair, and can then freeze the
//! published library into a static site.
//!
//! # Architecture: Generate, then Freeze
//!
//! ```text
//! generate   provider → drafts → image + row (per quote)   (content library grows)
//! freeze     content library  →  build/                     (static HTML site)
//! ```
//!
//! The two halves only share the database. `publish` runs one after the other.
//!
//! Within a generation run each quote is its own unit of work: a quote that
//! fails validation, rendering or persistence is logged and skipped, and the
//! rest of the batch continues. A persisted quote always has its image in
//! place; an image whose row could not be written is removed again.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`provider`] | Blocking HTTP clients for OpenAI-compatible and Gemini endpoints |
//! | [`generator`] | Prompt construction, fence stripping, JSON parsing, retry policy |
//! | [`imaging`] | Quote image compositing: background, overlay, wrapped text, watermark |
//! | [`gateway`] | Validate-place-insert unit of work with compensating cleanup |
//! | [`store`] | `QuoteStore` trait and its SQLite implementation |
//! | [`assets`] | Local directory and object-storage homes for rendered images |
//! | [`pipeline`] | One generation run and its summary |
//! | [`freeze`] | Static site build from published content, using Maud |
//! | [`remediate`] | Rewrites non-local image urls to local assets |
//! | [`config`] | `daily-vibes.toml` loading, merging with stock defaults, validation |
//! | [`logging`] | `tracing` subscriber setup: stdout plus optional daily log file |
//! | [`naming`] | Asset filename convention |
//! | [`types`] | Categories, drafts and records shared across modules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Traits at Every External Boundary
//!
//! The text service ([`provider::TextProvider`]), the renderer
//! ([`imaging::ImageRenderer`]), the store ([`store::QuoteStore`]) and the
//! asset sink ([`assets::AssetSink`]) are traits. The pipeline is generic over
//! all of them, so its failure handling is tested with mocks and no network.
//!
//! ## Rendering Never Fails on Missing Assets
//!
//! Fonts and backgrounds are ordered provider chains whose last entry cannot
//! fail: an embedded bitmap font and a solid color. A fresh checkout with no
//! fonts and no photos still produces valid images.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decode, resize and encode,
//! and `imageproc` with `ab_glyph` for text. No system libraries.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Templates are Rust
//! code, checked at compile time, and every interpolation is escaped, which
//! matters when the text comes from a language model.

pub mod assets;
pub mod config;
pub mod freeze;
pub mod gateway;
pub mod generator;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod remediate;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
