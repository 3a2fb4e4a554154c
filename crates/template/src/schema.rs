//! Template, settings and quick request types

use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use watermark_core::{Color, Placement, TilingMode, WatermarkDescriptor, MAX_TEXT_SIZE};

/// Embedded JSON Schema for watermark templates
/// This schema can be used by IDEs and validators for template authoring
pub const TEMPLATE_SCHEMA: &str = include_str!("../data/template-schema.json");

/// Longest template name, in characters
pub const MAX_NAME_LENGTH: usize = 100;
/// Longest watermark text, in characters
pub const MAX_TEXT_LENGTH: usize = 200;

/// Kind of watermark a template produces
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatermarkKind {
    #[default]
    #[serde(alias = "text")]
    Text,
    #[serde(alias = "image")]
    Image,
}

/// Reusable watermark definition
///
/// Text templates are tiled diagonally across the document, image templates
/// are scattered on a grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkTemplate {
    /// Display name
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: WatermarkKind,

    /// Watermark text (text templates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Watermark image path, relative to the template's directory (image templates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Text size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Text fill color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl WatermarkTemplate {
    /// Create a text template
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: WatermarkKind::Text,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Create an image template
    pub fn image(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: WatermarkKind::Image,
            image: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Check the template is usable
    ///
    /// Text templates need text and image templates need an image. Fields
    /// belonging to the other kind are ignored. Length limits match
    /// [`TEMPLATE_SCHEMA`].
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Template name is required".to_string(),
            ));
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(TemplateError::InvalidTemplate(format!(
                "Template name is longer than {MAX_NAME_LENGTH} characters"
            )));
        }

        match self.kind {
            WatermarkKind::Text if is_blank(&self.text) => {
                return Err(TemplateError::InvalidTemplate(
                    "Text is required for text watermark".to_string(),
                ))
            }
            WatermarkKind::Image if is_blank(&self.image) => {
                return Err(TemplateError::InvalidTemplate(
                    "Image is required for image watermark".to_string(),
                ))
            }
            _ => {}
        }

        if let (WatermarkKind::Text, Some(text)) = (self.kind, &self.text) {
            if text.chars().count() > MAX_TEXT_LENGTH {
                return Err(TemplateError::InvalidTemplate(format!(
                    "Text is longer than {MAX_TEXT_LENGTH} characters"
                )));
            }
        }

        match self.font_size {
            Some(size) if !size.is_finite() || size <= 0.0 || size > MAX_TEXT_SIZE => {
                Err(TemplateError::InvalidTemplate(format!(
                    "fontSize must be in (0, {MAX_TEXT_SIZE}], got {size}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Tiling mode for documents watermarked with this template
    pub fn mode(&self) -> TilingMode {
        match self.kind {
            WatermarkKind::Text => TilingMode::DiagonalTiled,
            WatermarkKind::Image => TilingMode::GridScattered,
        }
    }

    /// Placement used when applying this template
    pub fn placement(&self, opacity: f32) -> Placement {
        Placement::new(0.0, 0.0, opacity, 0.0, self.mode())
    }

    /// Watermark descriptor for a text template
    ///
    /// Image templates are turned into descriptors once their image has been loaded.
    pub(crate) fn text_descriptor(&self) -> WatermarkDescriptor {
        WatermarkDescriptor {
            text: self.text.clone(),
            size_pt: self.font_size,
            color: self.color,
            ..WatermarkDescriptor::default()
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Per-user defaults for quick watermarking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkSettings {
    pub default_opacity: f32,
    pub default_position_x: f32,
    pub default_position_y: f32,
    pub default_rotation: f32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            default_opacity: 0.5,
            default_position_x: 0.0,
            default_position_y: 0.0,
            default_rotation: 0.0,
        }
    }
}

/// One-shot watermark request
///
/// Exactly one of `text` and `image_bytes` must be set. Placement fields
/// left out fall back to [`WatermarkSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuickRequest {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(skip)]
    pub image_bytes: Option<Vec<u8>>,

    #[serde(default)]
    pub position_x: Option<f32>,

    #[serde(default)]
    pub position_y: Option<f32>,

    #[serde(default)]
    pub opacity: Option<f32>,

    #[serde(default)]
    pub rotation: Option<f32>,
}

impl QuickRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            image_bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, position_x: f32, position_y: f32) -> Self {
        self.position_x = Some(position_x);
        self.position_y = Some(position_y);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Single-anchored placement, missing fields taken from `settings`
    pub fn placement(&self, settings: &WatermarkSettings) -> Placement {
        Placement::new(
            self.position_x.unwrap_or(settings.default_position_x),
            self.position_y.unwrap_or(settings.default_position_y),
            self.opacity.unwrap_or(settings.default_opacity),
            self.rotation.unwrap_or(settings.default_rotation),
            TilingMode::SingleAnchored,
        )
    }

    pub(crate) fn into_descriptor(self) -> WatermarkDescriptor {
        WatermarkDescriptor {
            text: self.text,
            image_bytes: self.image_bytes,
            ..WatermarkDescriptor::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_validation() {
        assert!(WatermarkTemplate::text("Draft", "DRAFT").validate().is_ok());
        assert!(WatermarkTemplate::image("Logo", "logo.png").validate().is_ok());

        let missing_text = WatermarkTemplate {
            name: "Draft".to_string(),
            kind: WatermarkKind::Text,
            image: Some("logo.png".to_string()),
            ..WatermarkTemplate::default()
        };
        assert!(matches!(
            missing_text.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));

        let blank_image = WatermarkTemplate::image("Logo", "  ");
        assert!(blank_image.validate().is_err());

        let unnamed = WatermarkTemplate::text("", "DRAFT");
        assert!(unnamed.validate().is_err());

        let bad_size = WatermarkTemplate::text("Draft", "DRAFT").with_font_size(0.0);
        assert!(bad_size.validate().is_err());

        let huge_size = WatermarkTemplate::text("Draft", "DRAFT").with_font_size(1e9);
        assert!(huge_size.validate().is_err());
        let max_size = WatermarkTemplate::text("Draft", "DRAFT").with_font_size(MAX_TEXT_SIZE);
        assert!(max_size.validate().is_ok());
    }

    #[test]
    fn test_template_length_limits() {
        let name = "n".repeat(MAX_NAME_LENGTH);
        let text = "\u{0E01}".repeat(MAX_TEXT_LENGTH);
        assert!(WatermarkTemplate::text(name.clone(), text.clone()).validate().is_ok());

        let long_name = WatermarkTemplate::text(format!("{name}n"), "DRAFT");
        assert!(matches!(
            long_name.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));

        let long_text = WatermarkTemplate::text("Draft", format!("{text}x"));
        assert!(matches!(
            long_text.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));

        // Text on an image template is ignored
        let mut image = WatermarkTemplate::image("Logo", "logo.png");
        image.text = Some("x".repeat(MAX_TEXT_LENGTH + 1));
        assert!(image.validate().is_ok());
    }

    #[test]
    fn test_template_mode() {
        assert_eq!(
            WatermarkTemplate::text("a", "b").placement(0.3).mode(),
            TilingMode::DiagonalTiled
        );
        let grid = WatermarkTemplate::image("a", "b.png").placement(0.3);
        assert_eq!(grid.mode(), TilingMode::GridScattered);
        assert_eq!(grid.opacity(), 0.3);
    }

    #[test]
    fn test_text_descriptor_ignores_image_path() {
        let mut template = WatermarkTemplate::text("Draft", "DRAFT").with_font_size(48.0);
        template.image = Some("stale.png".to_string());

        let descriptor = template.text_descriptor();
        assert_eq!(descriptor.text.as_deref(), Some("DRAFT"));
        assert_eq!(descriptor.size_pt, Some(48.0));
        assert!(descriptor.image_bytes.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: WatermarkSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, WatermarkSettings::default());
        assert_eq!(settings.default_opacity, 0.5);

        let settings: WatermarkSettings =
            serde_json::from_str(r#"{"defaultPositionX": 0.25, "defaultRotation": 15}"#).unwrap();
        assert_eq!(settings.default_position_x, 0.25);
        assert_eq!(settings.default_rotation, 15.0);
        assert_eq!(settings.default_opacity, 0.5);
    }

    #[test]
    fn test_quick_request_falls_back_to_settings() {
        let settings = WatermarkSettings {
            default_opacity: 0.7,
            default_position_x: 0.1,
            default_position_y: 0.9,
            default_rotation: 30.0,
        };

        let placement = QuickRequest::text("DRAFT").placement(&settings);
        assert_eq!(placement.mode(), TilingMode::SingleAnchored);
        assert_eq!(placement.opacity(), 0.7);
        assert_eq!(placement.position_x(), 0.1);
        assert_eq!(placement.position_y(), 0.9);
        assert_eq!(placement.rotation_degrees(), 30.0);

        let placement = QuickRequest::text("DRAFT")
            .at(0.5, 0.5)
            .with_opacity(0.2)
            .with_rotation(-90.0)
            .placement(&settings);
        assert_eq!(placement.position_x(), 0.5);
        assert_eq!(placement.opacity(), 0.2);
        assert_eq!(placement.rotation_degrees(), 270.0);
    }

    #[test]
    fn test_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(TEMPLATE_SCHEMA).unwrap();
        assert_eq!(schema["title"], "Watermark Template");
        assert_eq!(schema["properties"]["type"]["enum"][0], "TEXT");
        assert_eq!(schema["properties"]["name"]["maxLength"], MAX_NAME_LENGTH);
        assert_eq!(schema["properties"]["text"]["maxLength"], MAX_TEXT_LENGTH);
        assert_eq!(schema["properties"]["fontSize"]["maximum"], MAX_TEXT_SIZE as u64);
    }
}
