//! Template - watermark templates, quick requests and dispatch
//!
//! This crate provides:
//! - Template JSON types and parsing (`WatermarkTemplate`)
//! - User defaults for quick watermarking (`WatermarkSettings`)
//! - One-shot requests (`QuickRequest`)
//! - Routing to the raster or PDF compositor (`Watermarker`)
//!
//! # Example
//!
//! ```ignore
//! use template::{parse_template, Watermarker};
//!
//! let template = parse_template(r#"{"name": "Draft", "type": "TEXT", "text": "DRAFT"}"#)?;
//! let watermarker = Watermarker::default();
//! let result = watermarker.apply_template(
//!     &template,
//!     Path::new("templates"),
//!     &pdf_bytes,
//!     "report.pdf",
//!     None,
//!     Some(0.3),
//! )?;
//! std::fs::write(&result.suggested_filename, &result.bytes)?;
//! ```

mod dispatch;
pub mod parser;
mod schema;

pub use dispatch::{DocumentKind, Watermarker};
pub use parser::{load_template, parse_settings, parse_template};
pub use schema::*;

use thiserror::Error;
use watermark_core::WatermarkError;

/// Errors that can occur while loading or applying templates
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to parse template: {0}")]
    ParseError(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Watermark(#[from] WatermarkError),
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_error_passes_through() {
        let err: TemplateError = WatermarkError::EmptyDocument.into();
        assert_eq!(err.to_string(), WatermarkError::EmptyDocument.to_string());
    }

    #[test]
    fn test_invalid_template_display() {
        let err = TemplateError::InvalidTemplate("Text is required for text watermark".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid template: Text is required for text watermark"
        );
    }
}
