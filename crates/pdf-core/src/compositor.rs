//! Per-page watermark compositor for PDF documents

use crate::document::PdfDocument;
use crate::font::{FontData, StandardFont};
use crate::surface::DrawingSurface;
use crate::text::encode_literal;
use crate::xobject::ImageXObject;
use crate::{PdfError, Result as PdfResult};
use log::debug;
use lopdf::{dictionary, Document, Object, ObjectId};
use watermark_core::{
    Color, FontRef, OutputNaming, Placement, Result, TextWatermark, TilingMode, WatermarkError,
    WatermarkSource, WatermarkedResult, MIME_PDF,
};

/// Tiles per row and column in grid mode
const GRID_SIZE: u32 = 4;
/// Angle of the diagonal text strokes
const DIAGONAL_ANGLE: f32 = 45.0;
/// Resource name prefix of the per-page overlay form
const OVERLAY_PREFIX: &str = "WmOverlay";

/// Document compositor configuration (sizes in points)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentOptions {
    /// Edge length of each stamp in grid mode
    pub grid_stamp_size: f32,
    /// Edge length of the image stamp in single-anchored mode
    pub anchored_stamp_size: f32,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            grid_stamp_size: 50.0,
            anchored_stamp_size: 100.0,
        }
    }
}

/// Objects written once per document and referenced from every page overlay
struct SharedObjects {
    ext_gstate: ObjectId,
    mark: SharedMark,
}

enum SharedMark {
    Text {
        font: ObjectId,
        shown: String,
        size: f32,
        color: Color,
    },
    Image {
        image: ObjectId,
    },
}

/// Watermarks every page of a PDF document
#[derive(Debug, Clone, Default)]
pub struct DocumentCompositor {
    options: DocumentOptions,
}

impl DocumentCompositor {
    pub fn new(options: DocumentOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    /// Apply a watermark to every page of a PDF document
    ///
    /// # Arguments
    /// * `source` - PDF file bytes
    /// * `original_name` - Uploaded file name, used for the suggested name
    /// * `watermark` - Resolved watermark
    /// * `placement` - Position, opacity, rotation and tiling mode
    /// * `naming` - Output file name convention
    ///
    /// # Errors
    /// Any page failing to merge aborts the whole call with `PageMerge`.
    pub fn apply_watermark(
        &self,
        source: &[u8],
        original_name: &str,
        watermark: &WatermarkSource,
        placement: &Placement,
        naming: OutputNaming,
    ) -> Result<WatermarkedResult> {
        placement.check_source(watermark)?;

        let mut document = PdfDocument::open_from_bytes(source)?;
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(WatermarkError::EmptyDocument);
        }
        debug!(
            "Watermarking {} page(s) with {} watermark ({:?})",
            page_count,
            watermark.kind_name(),
            placement.mode()
        );

        let shared = embed_shared(document.inner_mut(), watermark, placement.opacity())?;

        for (index, page_id) in document.page_ids().into_iter().enumerate() {
            self.watermark_page(&mut document, page_id, &shared, placement)
                .map_err(|e| WatermarkError::PageMerge {
                    page: index + 1,
                    reason: e.to_string(),
                })?;
        }

        let merged_count = document.page_count();
        if merged_count != page_count {
            return Err(WatermarkError::Encode(format!(
                "page count changed from {page_count} to {merged_count}"
            )));
        }

        let bytes = document
            .to_bytes()
            .map_err(|e| WatermarkError::Encode(e.to_string()))?;

        Ok(WatermarkedResult {
            bytes,
            mime_type: MIME_PDF.to_string(),
            suggested_filename: naming.file_name(original_name),
        })
    }

    fn watermark_page(
        &self,
        document: &mut PdfDocument,
        page_id: ObjectId,
        shared: &SharedObjects,
        placement: &Placement,
    ) -> PdfResult<()> {
        let page_box = document.page_box(page_id)?;
        let mut surface = DrawingSurface::new(page_box);
        surface.set_graphics_state(shared.ext_gstate);

        match (placement.mode(), &shared.mark) {
            (TilingMode::DiagonalTiled, SharedMark::Text { .. }) => {
                draw_diagonal(&mut surface, &shared.mark);
            }
            (TilingMode::GridScattered, SharedMark::Image { image }) => {
                self.draw_grid(&mut surface, *image);
            }
            (TilingMode::SingleAnchored, mark) => {
                self.draw_anchored(&mut surface, mark, placement);
            }
            // Combinations are checked before any page is touched
            _ => {
                return Err(PdfError::ParseError(format!(
                    "{:?} cannot draw this watermark",
                    placement.mode()
                )))
            }
        }

        let form_id = surface.finish(document.inner_mut());
        document.overlay_form(page_id, form_id, OVERLAY_PREFIX)?;
        Ok(())
    }

    fn draw_grid(&self, surface: &mut DrawingSurface, image: ObjectId) {
        let size = self.options.grid_stamp_size;
        let cell_w = surface.width() / GRID_SIZE as f32;
        let cell_h = surface.height() / GRID_SIZE as f32;

        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                surface.scoped(|s| {
                    s.translate(cell_w * x as f32, cell_h * y as f32);
                    s.draw_image(image, size, size);
                });
            }
        }
    }

    fn draw_anchored(&self, surface: &mut DrawingSurface, mark: &SharedMark, placement: &Placement) {
        let x = placement.position_x() * surface.width();
        let y = placement.position_y() * surface.height();
        let size = self.options.anchored_stamp_size;

        surface.scoped(|s| {
            s.translate(x, y);
            s.rotate(placement.rotation_degrees());
            draw_mark(s, mark, size);
        });
    }
}

/// Rising strokes start on the bottom edge, falling strokes on the top edge
fn draw_diagonal(surface: &mut DrawingSurface, mark: &SharedMark) {
    let spacing = surface.width().min(surface.height()) / 4.0;
    if spacing <= 0.0 || !spacing.is_finite() {
        return;
    }

    let height = surface.height();
    let strokes = ((surface.width() + height) / spacing).ceil() as usize;
    for k in 0..strokes {
        let offset = k as f32 * spacing;
        surface.scoped(|s| {
            s.translate(offset, 0.0);
            s.rotate(DIAGONAL_ANGLE);
            draw_mark(s, mark, 0.0);
        });
        surface.scoped(|s| {
            s.translate(offset, height);
            s.rotate(-DIAGONAL_ANGLE);
            draw_mark(s, mark, 0.0);
        });
    }
}

fn draw_mark(surface: &mut DrawingSurface, mark: &SharedMark, image_size: f32) {
    match mark {
        SharedMark::Text {
            font,
            shown,
            size,
            color,
        } => {
            surface.set_fill_color(*color);
            surface.show_text(*font, *size, shown);
        }
        SharedMark::Image { image } => surface.draw_image(*image, image_size, image_size),
    }
}

fn embed_shared(doc: &mut Document, watermark: &WatermarkSource, opacity: f32) -> Result<SharedObjects> {
    let ext_gstate = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    });

    let mark = match watermark {
        WatermarkSource::Text(text) => embed_text(doc, text)?,
        WatermarkSource::Image(image) => {
            let xobject = ImageXObject::from_watermark(image)?;
            SharedMark::Image {
                image: xobject.embed(doc),
            }
        }
    };

    Ok(SharedObjects { ext_gstate, mark })
}

fn embed_text(doc: &mut Document, text: &TextWatermark) -> PdfResult<SharedMark> {
    let (font, shown) = match text.font() {
        FontRef::TrueType(truetype) => {
            let mut data = FontData::new(truetype)?;
            data.add_chars(text.content());
            let shown = data.encode_text_hex(text.content());
            (data.embed(doc)?, shown)
        }
        FontRef::Builtin => (
            doc.add_object(StandardFont::Helvetica.to_dictionary()),
            encode_literal(text.content()),
        ),
    };

    Ok(SharedMark::Text {
        font,
        shown,
        size: text.size_pt(),
        color: text.color_or(Color::BLACK),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageBox;
    use watermark_core::{FixedFont, WatermarkDescriptor};

    fn text_mark(doc: &mut Document) -> SharedMark {
        let source = WatermarkDescriptor::text("DRAFT")
            .resolve(&FixedFont::builtin())
            .unwrap();
        match source {
            WatermarkSource::Text(text) => embed_text(doc, &text).unwrap(),
            WatermarkSource::Image(_) => unreachable!(),
        }
    }

    #[test]
    fn test_diagonal_stroke_count() {
        let mut doc = Document::with_version("1.5");
        let mark = text_mark(&mut doc);
        let mut surface = DrawingSurface::new(PageBox::new(0.0, 0.0, 612.0, 792.0));

        draw_diagonal(&mut surface, &mark);

        // ceil(1404 / 153) strokes in each direction
        assert_eq!(surface.content().matches(" Tj\n").count(), 20);
        assert!(surface.transform().is_identity());
    }

    #[test]
    fn test_diagonal_skips_degenerate_page() {
        let mut doc = Document::with_version("1.5");
        let mark = text_mark(&mut doc);
        let mut surface = DrawingSurface::new(PageBox::new(0.0, 0.0, 0.0, 500.0));

        draw_diagonal(&mut surface, &mark);
        assert_eq!(surface.content().matches("Tj").count(), 0);
    }

    #[test]
    fn test_builtin_text_uses_helvetica() {
        let mut doc = Document::with_version("1.5");
        let SharedMark::Text { font, shown, size, color } = text_mark(&mut doc) else {
            panic!("expected text mark");
        };
        assert_eq!(shown, "(DRAFT)");
        assert_eq!(size, 36.0);
        assert_eq!(color, Color::BLACK);

        let dict = doc.get_object(font).unwrap().as_dict().unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    #[test]
    fn test_anchored_image_stamp() {
        let compositor = DocumentCompositor::default();
        let mark = SharedMark::Image { image: (9, 0) };
        let mut surface = DrawingSurface::new(PageBox::new(0.0, 0.0, 200.0, 100.0));
        let placement = Placement::new(0.5, 0.25, 1.0, 90.0, TilingMode::SingleAnchored);

        compositor.draw_anchored(&mut surface, &mark, &placement);

        let content = surface.content();
        assert!(content.contains("1 0 0 1 100 25 cm\n"));
        assert!(content.contains("0 1 -1 0 0 0 cm\n"));
        assert!(content.contains("100 0 0 100 0 0 cm\n/WmImage Do"));
    }
}
