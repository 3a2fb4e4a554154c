//! Watermarked output and its suggested file name

use serde::Serialize;

pub const MIME_PNG: &str = "image/png";
pub const MIME_PDF: &str = "application/pdf";

/// Bytes produced by a compositor, owned by the caller
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkedResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub suggested_filename: String,
}

/// File name prefix for the pipeline that produced the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputNaming {
    /// `watermarked_<name>`
    Template,
    /// `quick_watermarked_<name>`
    Quick,
}

impl OutputNaming {
    pub fn prefix(self) -> &'static str {
        match self {
            OutputNaming::Template => "watermarked_",
            OutputNaming::Quick => "quick_watermarked_",
        }
    }

    /// Suggested name for an output derived from `original_name`
    pub fn file_name(self, original_name: &str) -> String {
        format!("{}{}", self.prefix(), basename(original_name))
    }
}

/// Last path component, accepting both `/` and `\` separators
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
