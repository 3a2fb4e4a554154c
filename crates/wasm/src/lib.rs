//! WASM bindings for rswatermark
//!
//! This crate provides a JavaScript-friendly API for:
//! - Applying watermark templates to images and PDFs
//! - One-shot (quick) watermarks with explicit placement
//! - Loading a TrueType font for text watermarks
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { Watermarker } from 'rswatermark-wasm';
//!
//! await init();
//!
//! const watermarker = new Watermarker();
//! watermarker.loadFont(fontBytes);
//!
//! const templateJson = JSON.stringify({ name: "Draft", type: "TEXT", text: "DRAFT" });
//! const output = watermarker.applyTemplate(templateJson, pdfBytes, "report.pdf", 0.3);
//! download(output.bytes, output.mimeType, output.fileName);
//! ```

use template::{parse_template, QuickRequest, WatermarkSettings};
use wasm_bindgen::prelude::*;
use watermark_core::{FontRef, TrueTypeFont, WatermarkedResult};

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// JSON Schema describing the template format
#[wasm_bindgen(js_name = templateSchema)]
pub fn template_schema() -> String {
    template::TEMPLATE_SCHEMA.to_string()
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Watermarked file returned to JavaScript
#[wasm_bindgen]
pub struct WatermarkOutput {
    inner: WatermarkedResult,
}

#[wasm_bindgen]
impl WatermarkOutput {
    /// Output file bytes (Uint8Array)
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.inner.bytes.as_slice())
    }

    /// `image/png` or `application/pdf`
    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.mime_type.clone()
    }

    /// Suggested download name
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.inner.suggested_filename.clone()
    }

    /// `{ mimeType, suggestedFilename }` as a plain object
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner).map_err(to_js_error)
    }
}

/// Watermarks images and PDFs in the browser
///
/// There is no filesystem to search for fonts, so text is drawn with the
/// built-in font until `loadFont` is called.
#[wasm_bindgen]
pub struct Watermarker {
    inner: template::Watermarker,
    settings: WatermarkSettings,
}

#[wasm_bindgen]
impl Watermarker {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Watermarker {
        let settings = WatermarkSettings::default();
        Watermarker {
            inner: template::Watermarker::with_font(FontRef::Builtin).with_settings(settings),
            settings,
        }
    }

    /// Use a TrueType font for text watermarks
    ///
    /// @param data - TTF file bytes (Uint8Array)
    #[wasm_bindgen(js_name = loadFont)]
    pub fn load_font(&mut self, data: &[u8]) -> Result<(), JsValue> {
        let font = TrueTypeFont::from_bytes("WatermarkFont", data.to_vec()).map_err(to_js_error)?;
        self.inner = template::Watermarker::with_font(FontRef::truetype(font))
            .with_settings(self.settings);
        Ok(())
    }

    /// Replace the defaults used by `applyQuick`
    ///
    /// @param settings - `{ defaultOpacity, defaultPositionX, defaultPositionY, defaultRotation }`
    #[wasm_bindgen(js_name = setSettings)]
    pub fn set_settings(&mut self, settings: JsValue) -> Result<(), JsValue> {
        let settings: WatermarkSettings = serde_wasm_bindgen::from_value(settings)?;
        self.settings = settings;
        self.inner = self.inner.clone().with_settings(settings);
        Ok(())
    }

    /// Apply a watermark template
    ///
    /// @param templateJson - Template JSON string
    /// @param fileBytes - Image or PDF bytes (Uint8Array)
    /// @param fileName - Original file name; `.pdf` selects the PDF pipeline
    /// @param opacity - Opacity in [0, 1], settings default when omitted
    /// @param imageBytes - Watermark image for IMAGE templates
    #[wasm_bindgen(js_name = applyTemplate)]
    pub fn apply_template(
        &self,
        template_json: &str,
        file_bytes: &[u8],
        file_name: &str,
        opacity: Option<f32>,
        image_bytes: Option<Vec<u8>>,
    ) -> Result<WatermarkOutput, JsValue> {
        let template = parse_template(template_json).map_err(to_js_error)?;
        let inner = self
            .inner
            .apply_template_with_image(&template, image_bytes, file_bytes, file_name, None, opacity)
            .map_err(to_js_error)?;
        Ok(WatermarkOutput { inner })
    }

    /// Apply a one-shot watermark at an explicit position
    ///
    /// @param fileBytes - Image or PDF bytes (Uint8Array)
    /// @param fileName - Original file name; `.pdf` selects the PDF pipeline
    /// @param text - Watermark text (exclusive with imageBytes)
    /// @param imageBytes - Watermark image (exclusive with text)
    /// @param x - Horizontal position in [0, 1]
    /// @param y - Vertical position in [0, 1]
    /// @param opacity - Opacity in [0, 1]
    /// @param rotation - Rotation in degrees, counter-clockwise
    #[wasm_bindgen(js_name = applyQuick)]
    #[allow(clippy::too_many_arguments)]
    pub fn apply_quick(
        &self,
        file_bytes: &[u8],
        file_name: &str,
        text: Option<String>,
        image_bytes: Option<Vec<u8>>,
        x: Option<f32>,
        y: Option<f32>,
        opacity: Option<f32>,
        rotation: Option<f32>,
    ) -> Result<WatermarkOutput, JsValue> {
        let request = QuickRequest {
            text,
            image_bytes,
            position_x: x,
            position_y: y,
            opacity,
            rotation,
        };
        let inner = self
            .inner
            .apply_quick(request, file_bytes, file_name, None)
            .map_err(to_js_error)?;
        Ok(WatermarkOutput { inner })
    }
}

impl Default for Watermarker {
    fn default() -> Self {
        Self::new()
    }
}
