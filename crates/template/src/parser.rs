//! Template and settings JSON parsing

use crate::{Result, TemplateError, WatermarkSettings, WatermarkTemplate};
use std::path::Path;

/// Parse and validate a template from a JSON string
pub fn parse_template(json: &str) -> Result<WatermarkTemplate> {
    let template: WatermarkTemplate =
        serde_json::from_str(json).map_err(|e| TemplateError::ParseError(e.to_string()))?;
    template.validate()?;
    Ok(template)
}

/// Read a template file
///
/// # Returns
/// The template and the directory its image path is relative to
pub fn load_template(path: &Path) -> Result<(WatermarkTemplate, &Path)> {
    let json = std::fs::read_to_string(path)?;
    let template = parse_template(&json)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((template, base_dir))
}

/// Parse user settings; missing fields take their defaults
pub fn parse_settings(json: &str) -> Result<WatermarkSettings> {
    Ok(serde_json::from_str(json)?)
}
