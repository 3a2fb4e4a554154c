//! Routing of watermark requests to the raster or document compositor

use crate::{
    QuickRequest, Result, TemplateError, WatermarkKind, WatermarkSettings, WatermarkTemplate,
};
use image_core::{RasterCompositor, RasterOptions};
use log::debug;
use pdf_core::{DocumentCompositor, DocumentOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use watermark_core::{
    basename, FontProvider, FontRef, OutputNaming, Placement, SystemFonts, WatermarkDescriptor,
    WatermarkedResult,
};

/// Kind of file being watermarked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// `.pdf` (any case) is a PDF, anything else is treated as an image
    pub fn from_filename(name: &str) -> Self {
        let name = basename(name);
        match name.rsplit_once('.') {
            Some((_, ext)) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
            _ => DocumentKind::Image,
        }
    }
}

/// Entry point for watermarking files
///
/// Resolves the text font once and reuses it for every request.
#[derive(Debug, Clone)]
pub struct Watermarker {
    font: FontRef,
    settings: WatermarkSettings,
    raster: RasterCompositor,
    document: DocumentCompositor,
}

impl Default for Watermarker {
    fn default() -> Self {
        Self::new(&SystemFonts::default())
    }
}

impl FontProvider for Watermarker {
    fn resolve_font(&self) -> FontRef {
        self.font.clone()
    }
}

impl Watermarker {
    /// Create a watermarker using the first font `fonts` resolves
    pub fn new(fonts: &dyn FontProvider) -> Self {
        Self::with_font(fonts.resolve_font())
    }

    pub fn with_font(font: FontRef) -> Self {
        Self {
            font,
            settings: WatermarkSettings::default(),
            raster: RasterCompositor::default(),
            document: DocumentCompositor::default(),
        }
    }

    pub fn with_settings(mut self, settings: WatermarkSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_raster_options(mut self, options: RasterOptions) -> Self {
        self.raster = RasterCompositor::new(options);
        self
    }

    pub fn with_document_options(mut self, options: DocumentOptions) -> Self {
        self.document = DocumentCompositor::new(options);
        self
    }

    pub fn font(&self) -> &FontRef {
        &self.font
    }

    pub fn settings(&self) -> &WatermarkSettings {
        &self.settings
    }

    /// Watermark a file with an arbitrary descriptor and placement
    ///
    /// # Arguments
    /// * `source` - File bytes
    /// * `file_name` - Uploaded file name
    /// * `kind` - File kind; inferred from `file_name` when `None`
    /// * `descriptor` - Text or image watermark
    /// * `placement` - Position, opacity, rotation and tiling mode
    /// * `naming` - Output file name convention
    pub fn apply(
        &self,
        source: &[u8],
        file_name: &str,
        kind: Option<DocumentKind>,
        descriptor: WatermarkDescriptor,
        placement: &Placement,
        naming: OutputNaming,
    ) -> Result<WatermarkedResult> {
        let watermark = descriptor.resolve(self)?;
        let kind = kind.unwrap_or_else(|| DocumentKind::from_filename(file_name));
        debug!("Dispatching {} as {:?}", basename(file_name), kind);

        let result = match kind {
            DocumentKind::Image => self
                .raster
                .apply_watermark(source, file_name, &watermark, placement, naming),
            DocumentKind::Pdf => self
                .document
                .apply_watermark(source, file_name, &watermark, placement, naming),
        };
        Ok(result?)
    }

    /// Watermark a file with a template, reading its image from `base_dir`
    ///
    /// # Arguments
    /// * `template` - Template to apply
    /// * `base_dir` - Directory the template's image path is relative to
    /// * `source` - File bytes
    /// * `file_name` - Uploaded file name
    /// * `kind` - File kind; inferred from `file_name` when `None`
    /// * `opacity` - Opacity; the settings default when `None`
    pub fn apply_template(
        &self,
        template: &WatermarkTemplate,
        base_dir: &Path,
        source: &[u8],
        file_name: &str,
        kind: Option<DocumentKind>,
        opacity: Option<f32>,
    ) -> Result<WatermarkedResult> {
        template.validate()?;

        let image_bytes = match (template.kind, template.image.as_deref()) {
            (WatermarkKind::Image, Some(path)) => {
                let path = base_dir.join(path);
                debug!("Loading template image {}", path.display());
                Some(std::fs::read(path)?)
            }
            _ => None,
        };

        self.apply_template_with_image(template, image_bytes, source, file_name, kind, opacity)
    }

    /// Watermark a file with a template whose image bytes are already loaded
    ///
    /// `image_bytes` is ignored for text templates.
    pub fn apply_template_with_image(
        &self,
        template: &WatermarkTemplate,
        image_bytes: Option<Vec<u8>>,
        source: &[u8],
        file_name: &str,
        kind: Option<DocumentKind>,
        opacity: Option<f32>,
    ) -> Result<WatermarkedResult> {
        let descriptor = match template.kind {
            WatermarkKind::Text => {
                template.validate()?;
                template.text_descriptor()
            }
            WatermarkKind::Image => match image_bytes {
                Some(bytes) => WatermarkDescriptor::image(bytes),
                None => {
                    return Err(TemplateError::InvalidTemplate(
                        "Image is required for image watermark".to_string(),
                    ))
                }
            },
        };

        let placement = template.placement(opacity.unwrap_or(self.settings.default_opacity));
        debug!("Applying template '{}' ({:?})", template.name, placement.mode());
        self.apply(
            source,
            file_name,
            kind,
            descriptor,
            &placement,
            OutputNaming::Template,
        )
    }

    /// Watermark a file with a one-shot request
    pub fn apply_quick(
        &self,
        request: QuickRequest,
        source: &[u8],
        file_name: &str,
        kind: Option<DocumentKind>,
    ) -> Result<WatermarkedResult> {
        let placement = request.placement(&self.settings);
        self.apply(
            source,
            file_name,
            kind,
            request.into_descriptor(),
            &placement,
            OutputNaming::Quick,
        )
    }
}
