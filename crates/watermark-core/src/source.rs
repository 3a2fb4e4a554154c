//! Watermark sources and their resolution from caller descriptors

use crate::font::{FontProvider, FontRef};
use crate::{Result, WatermarkError};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default text size (points in documents, pixels in raster images)
pub const DEFAULT_TEXT_SIZE: f32 = 36.0;
/// Largest accepted text size
pub const MAX_TEXT_SIZE: f32 = 1000.0;

/// RGB color (values 0 - 255)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Create a new RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to 0.0 - 1.0 (PDF color operators)
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Text watermark: a string rendered with a resolved font
#[derive(Debug, Clone)]
pub struct TextWatermark {
    content: String,
    font: FontRef,
    size_pt: f32,
    color: Option<Color>,
}

impl TextWatermark {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn font(&self) -> &FontRef {
        &self.font
    }

    pub fn size_pt(&self) -> f32 {
        self.size_pt
    }

    /// Fill color, falling back to the pipeline's default
    pub fn color_or(&self, default: Color) -> Color {
        self.color.unwrap_or(default)
    }
}

/// Image watermark: the encoded asset plus its decoded RGBA pixels
#[derive(Clone)]
pub struct ImageWatermark {
    encoded: Vec<u8>,
    pixels: RgbaImage,
}

impl ImageWatermark {
    /// Decode an image asset (PNG or JPEG)
    pub fn decode(encoded: Vec<u8>) -> Result<Self> {
        let pixels = image::load_from_memory(&encoded)
            .map_err(|e| {
                WatermarkError::InvalidWatermark(format!("watermark image is unreadable: {e}"))
            })?
            .to_rgba8();

        Ok(Self { encoded, pixels })
    }

    /// The asset bytes exactly as supplied
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Decoded pixels in RGBA8
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl fmt::Debug for ImageWatermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageWatermark")
            .field("encoded_len", &self.encoded.len())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// A validated watermark: exactly one of text or image
#[derive(Debug, Clone)]
pub enum WatermarkSource {
    Text(TextWatermark),
    Image(ImageWatermark),
}

impl WatermarkSource {
    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            WatermarkSource::Text(_) => "text",
            WatermarkSource::Image(_) => "image",
        }
    }
}

/// Unvalidated watermark request as supplied by a caller
///
/// Text and image are mutually exclusive. An empty string or an empty
/// byte buffer counts as not supplied.
#[derive(Debug, Clone, Default)]
pub struct WatermarkDescriptor {
    pub text: Option<String>,
    pub image_bytes: Option<Vec<u8>>,
    /// Font for text watermarks; resolved through the provider when absent
    pub font: Option<FontRef>,
    pub size_pt: Option<f32>,
    pub color: Option<Color>,
}

impl WatermarkDescriptor {
    /// Descriptor for a text watermark
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Descriptor for an image watermark
    pub fn image(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            image_bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    pub fn with_font(mut self, font: FontRef) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_size(mut self, size_pt: f32) -> Self {
        self.size_pt = Some(size_pt);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Validate the descriptor and build a watermark source
    ///
    /// # Errors
    /// `InvalidWatermark` when both or neither of text and image are set,
    /// when the text size is outside `(0, MAX_TEXT_SIZE]`, or when the image
    /// cannot be decoded.
    pub fn resolve(self, fonts: &dyn FontProvider) -> Result<WatermarkSource> {
        let text = self.text.filter(|t| !t.is_empty());
        let image = self.image_bytes.filter(|b| !b.is_empty());

        match (text, image) {
            (Some(_), Some(_)) => Err(WatermarkError::InvalidWatermark(
                "provide either text or an image watermark, not both".to_string(),
            )),
            (None, None) => Err(WatermarkError::InvalidWatermark(
                "either watermark text or an image must be provided".to_string(),
            )),
            (Some(content), None) => {
                let size_pt = self.size_pt.unwrap_or(DEFAULT_TEXT_SIZE);
                if !size_pt.is_finite() || size_pt <= 0.0 || size_pt > MAX_TEXT_SIZE {
                    return Err(WatermarkError::InvalidWatermark(format!(
                        "text size must be in (0, {MAX_TEXT_SIZE}], got {size_pt}"
                    )));
                }

                let font = self.font.unwrap_or_else(|| fonts.resolve_font());
                Ok(WatermarkSource::Text(TextWatermark {
                    content,
                    font,
                    size_pt,
                    color: self.color,
                }))
            }
            (None, Some(bytes)) => ImageWatermark::decode(bytes).map(WatermarkSource::Image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FixedFont;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_resolve_text() {
        let source = WatermarkDescriptor::text("DRAFT")
            .resolve(&FixedFont::builtin())
            .unwrap();

        match source {
            WatermarkSource::Text(text) => {
                assert_eq!(text.content(), "DRAFT");
                assert_eq!(text.size_pt(), DEFAULT_TEXT_SIZE);
                assert!(matches!(text.font(), FontRef::Builtin));
                assert_eq!(text.color_or(Color::WHITE), Color::WHITE);
            }
            WatermarkSource::Image(_) => panic!("expected a text watermark"),
        }
    }

    #[test]
    fn test_resolve_image() {
        let source = WatermarkDescriptor::image(png_bytes(50, 40))
            .resolve(&FixedFont::builtin())
            .unwrap();

        match source {
            WatermarkSource::Image(image) => {
                assert_eq!(image.width(), 50);
                assert_eq!(image.height(), 40);
                assert!(!image.encoded().is_empty());
            }
            WatermarkSource::Text(_) => panic!("expected an image watermark"),
        }
    }

    #[test]
    fn test_both_text_and_image_rejected() {
        let descriptor = WatermarkDescriptor {
            text: Some("DRAFT".to_string()),
            image_bytes: Some(png_bytes(4, 4)),
            ..WatermarkDescriptor::default()
        };

        let err = descriptor.resolve(&FixedFont::builtin()).unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));
    }

    #[test]
    fn test_neither_text_nor_image_rejected() {
        let err = WatermarkDescriptor::default()
            .resolve(&FixedFont::builtin())
            .unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));
    }

    #[test]
    fn test_empty_text_counts_as_missing() {
        let err = WatermarkDescriptor::text("")
            .resolve(&FixedFont::builtin())
            .unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));

        // Empty text alongside an image is just an image watermark
        let descriptor = WatermarkDescriptor {
            text: Some(String::new()),
            image_bytes: Some(png_bytes(4, 4)),
            ..WatermarkDescriptor::default()
        };
        let source = descriptor.resolve(&FixedFont::builtin()).unwrap();
        assert_eq!(source.kind_name(), "image");
    }

    #[test]
    fn test_undecodable_image_rejected() {
        let err = WatermarkDescriptor::image(vec![1, 2, 3, 4])
            .resolve(&FixedFont::builtin())
            .unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));
    }

    #[test]
    fn test_invalid_text_size_rejected() {
        let err = WatermarkDescriptor::text("DRAFT")
            .with_size(0.0)
            .resolve(&FixedFont::builtin())
            .unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidWatermark(_)));
    }

    #[test]
    fn test_text_size_upper_bound() {
        let fonts = FixedFont::builtin();
        assert!(WatermarkDescriptor::text("DRAFT")
            .with_size(MAX_TEXT_SIZE)
            .resolve(&fonts)
            .is_ok());

        for size in [1e9, f32::INFINITY, f32::NAN] {
            let err = WatermarkDescriptor::text("DRAFT")
                .with_size(size)
                .resolve(&fonts)
                .unwrap_err();
            assert!(matches!(err, WatermarkError::InvalidWatermark(_)), "size {size}");
        }
    }

    #[test]
    fn test_explicit_font_wins_over_provider() {
        let provider = FixedFont::builtin();
        let source = WatermarkDescriptor::text("A")
            .with_font(FontRef::Builtin)
            .with_size(12.0)
            .with_color(Color::rgb(255, 0, 0))
            .resolve(&provider)
            .unwrap();

        let WatermarkSource::Text(text) = source else {
            panic!("expected a text watermark");
        };
        assert_eq!(text.size_pt(), 12.0);
        assert_eq!(text.color_or(Color::BLACK), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_color_to_unit() {
        assert_eq!(Color::WHITE.to_unit(), (1.0, 1.0, 1.0));
        assert_eq!(Color::BLACK.to_unit(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_image_debug_omits_bytes() {
        let image = ImageWatermark::decode(png_bytes(3, 2)).unwrap();
        let debug = format!("{image:?}");
        assert!(debug.contains("width: 3"));
        assert!(debug.contains("height: 2"));
    }
}
