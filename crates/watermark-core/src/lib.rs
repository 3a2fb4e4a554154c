//! Watermark Core - shared watermark model
//!
//! This crate provides the types both compositors consume:
//! - Watermark sources (text with a font, or a decoded image)
//! - Placement descriptors (position, opacity, rotation, tiling mode)
//! - Font resolution with a deterministic built-in fallback
//! - The watermarked result handed back to callers
//!
//! # Example
//!
//! ```ignore
//! use watermark_core::{Placement, SystemFonts, TilingMode, WatermarkDescriptor};
//!
//! let source = WatermarkDescriptor::text("CONFIDENTIAL").resolve(&SystemFonts::default())?;
//! let placement = Placement::new(0.5, 0.5, 0.4, 30.0, TilingMode::SingleAnchored);
//! placement.check_source(&source)?;
//! ```

mod font;
mod output;
mod placement;
mod source;

pub use font::{FixedFont, FontProvider, FontRef, SystemFonts, TrueTypeFont, DEFAULT_FONT_PATHS};
pub use output::{basename, OutputNaming, WatermarkedResult, MIME_PDF, MIME_PNG};
pub use placement::{Placement, TilingMode};
pub use source::{
    Color, ImageWatermark, TextWatermark, WatermarkDescriptor, WatermarkSource,
    DEFAULT_TEXT_SIZE, MAX_TEXT_SIZE,
};

use thiserror::Error;

/// Errors that can occur while watermarking a document
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Invalid watermark: {0}")]
    InvalidWatermark(String),

    #[error("Failed to decode source: {0}")]
    Decode(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Watermark mode {mode:?} is not supported for {source_kind} watermarks")]
    UnsupportedWatermarkMode {
        mode: TilingMode,
        source_kind: &'static str,
    },

    #[error("Failed to watermark page {page}: {reason}")]
    PageMerge { page: usize, reason: String },

    #[error("Failed to encode output: {0}")]
    Encode(String),
}

/// Result type for watermark operations
pub type Result<T> = std::result::Result<T, WatermarkError>;
