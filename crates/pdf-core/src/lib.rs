//! PDF Core - PDF watermark compositor
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Reading page boxes and inherited resources
//! - Embedding TrueType fonts and alpha-masked images
//! - Drawing a per-page overlay form and merging it onto each page
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::DocumentCompositor;
//! use watermark_core::{OutputNaming, Placement, SystemFonts, WatermarkDescriptor};
//!
//! let source = WatermarkDescriptor::text("DRAFT").resolve(&SystemFonts::default())?;
//! let result = DocumentCompositor::default().apply_watermark(
//!     &pdf_bytes,
//!     "report.pdf",
//!     &source,
//!     &Placement::diagonal(0.3),
//!     OutputNaming::Template,
//! )?;
//! std::fs::write(&result.suggested_filename, &result.bytes)?;
//! ```

mod compositor;
mod document;
mod font;
mod surface;
mod text;
mod xobject;

pub use compositor::{DocumentCompositor, DocumentOptions};
pub use document::{PageBox, PdfDocument};
pub use font::{FontData, StandardFont};
pub use surface::{DrawingSurface, Matrix};
pub use text::{encode_literal, generate_text_operators};
pub use xobject::{generate_image_operators, ImageXObject};

use thiserror::Error;
use watermark_core::WatermarkError;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Failed to subset font: {0}")]
    FontSubsetError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

impl From<PdfError> for WatermarkError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::OpenError(msg) | PdfError::ParseError(msg) => {
                WatermarkError::UnsupportedDocument(msg)
            }
            PdfError::LopdfError(e) => WatermarkError::UnsupportedDocument(e.to_string()),
            PdfError::FontParseError(msg)
            | PdfError::FontSubsetError(msg)
            | PdfError::ImageError(msg) => WatermarkError::InvalidWatermark(msg),
            PdfError::SaveError(msg) => WatermarkError::Encode(msg),
            PdfError::IoError(e) => WatermarkError::Encode(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: WatermarkError = PdfError::OpenError("bad header".to_string()).into();
        assert!(matches!(err, WatermarkError::UnsupportedDocument(_)));

        let err: WatermarkError = PdfError::SaveError("disk full".to_string()).into();
        assert!(matches!(err, WatermarkError::Encode(_)));

        let err: WatermarkError = PdfError::FontParseError("no cmap".to_string()).into();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));

        let err: WatermarkError = PdfError::FontSubsetError("missing glyf".to_string()).into();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PdfError::ParseError("MediaBox is not an array".to_string());
        assert_eq!(err.to_string(), "PDF parsing error: MediaBox is not an array");
    }
}
