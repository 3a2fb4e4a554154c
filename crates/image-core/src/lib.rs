//! Image Core - raster watermark compositor
//!
//! Decodes a raster image, draws the watermark on a transparent overlay of
//! the same size, composites the overlay over the source and encodes PNG.
//!
//! # Example
//!
//! ```ignore
//! use image_core::RasterCompositor;
//! use watermark_core::{OutputNaming, Placement, SystemFonts, WatermarkDescriptor};
//!
//! let source = WatermarkDescriptor::text("DRAFT").resolve(&SystemFonts::default())?;
//! let result = RasterCompositor::default().apply_watermark(
//!     &photo_bytes,
//!     "photo.jpg",
//!     &source,
//!     &Placement::diagonal(0.4),
//!     OutputNaming::Template,
//! )?;
//! assert_eq!(result.suggested_filename, "watermarked_photo.jpg");
//! ```

pub mod bitmap;
pub mod compose;
pub mod rotate;
pub mod text;

use compose::{composite_over, opacity_to_alpha, overlay_at, scale_alpha, set_alpha};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use log::debug;
use rotate::rotate_expand;
use std::io::Cursor;
use watermark_core::{
    Color, ImageWatermark, OutputNaming, Placement, Result, TextWatermark, TilingMode,
    WatermarkError, WatermarkSource, WatermarkedResult, MIME_PNG,
};

/// Tiles per row and column in grid mode
const GRID_SIZE: u32 = 4;
/// Grid stamp size as a fraction of the canvas
const GRID_STAMP_FRACTION: f64 = 0.2;
/// Offset applied to odd grid rows and columns, as a fraction of the canvas
const GRID_JITTER_FRACTION: f64 = 0.05;
/// Angle of the diagonal text strokes
const DIAGONAL_ANGLE: f32 = 45.0;

/// Size of an image watermark in single-anchored mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageScale {
    /// Resize to this fraction of the canvas width and height
    CanvasFraction(f32),
    /// Keep the decoded size
    Native,
}

impl Default for ImageScale {
    fn default() -> Self {
        ImageScale::CanvasFraction(0.5)
    }
}

/// Raster compositor configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterOptions {
    pub anchored_image_scale: ImageScale,
}

impl RasterOptions {
    pub fn with_anchored_image_scale(mut self, scale: ImageScale) -> Self {
        self.anchored_image_scale = scale;
        self
    }
}

/// Watermarks raster images
#[derive(Debug, Clone, Default)]
pub struct RasterCompositor {
    options: RasterOptions,
}

impl RasterCompositor {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Apply a watermark to an encoded raster image
    ///
    /// # Arguments
    /// * `source` - Encoded image (PNG or JPEG)
    /// * `original_name` - Uploaded file name, used for the suggested name
    /// * `watermark` - Resolved watermark
    /// * `placement` - Position, opacity, rotation and tiling mode
    /// * `naming` - Output file name convention
    ///
    /// # Returns
    /// A PNG encoding of the watermarked image
    pub fn apply_watermark(
        &self,
        source: &[u8],
        original_name: &str,
        watermark: &WatermarkSource,
        placement: &Placement,
        naming: OutputNaming,
    ) -> Result<WatermarkedResult> {
        placement.check_source(watermark)?;

        let mut canvas = image::load_from_memory(source)
            .map_err(|e| WatermarkError::Decode(e.to_string()))?
            .to_rgba8();
        debug!(
            "Watermarking {}x{} image with {} watermark ({:?})",
            canvas.width(),
            canvas.height(),
            watermark.kind_name(),
            placement.mode()
        );

        let overlay = self.render_overlay(canvas.width(), canvas.height(), watermark, placement)?;
        composite_over(&mut canvas, &overlay);

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| WatermarkError::Encode(e.to_string()))?;

        Ok(WatermarkedResult {
            bytes,
            mime_type: MIME_PNG.to_string(),
            suggested_filename: naming.file_name(original_name),
        })
    }

    /// Draw the watermark on a transparent canvas of the given size
    pub fn render_overlay(
        &self,
        width: u32,
        height: u32,
        watermark: &WatermarkSource,
        placement: &Placement,
    ) -> Result<RgbaImage> {
        let mut overlay = RgbaImage::new(width, height);
        match (placement.mode(), watermark) {
            (TilingMode::SingleAnchored, WatermarkSource::Text(text)) => {
                let sprite = text_sprite(text, placement.opacity())?;
                paste_anchored(&mut overlay, &sprite, placement);
            }
            (TilingMode::SingleAnchored, WatermarkSource::Image(image)) => {
                let mut sprite = self.anchored_image(image, width, height);
                scale_alpha(&mut sprite, placement.opacity());
                paste_anchored(&mut overlay, &sprite, placement);
            }
            (TilingMode::DiagonalTiled, WatermarkSource::Text(text)) => {
                draw_diagonal(&mut overlay, &text_sprite(text, placement.opacity())?);
            }
            (TilingMode::GridScattered, WatermarkSource::Image(image)) => {
                draw_grid(&mut overlay, image, placement.opacity());
            }
            (mode, source) => {
                return Err(WatermarkError::UnsupportedWatermarkMode {
                    mode,
                    source_kind: source.kind_name(),
                })
            }
        }

        Ok(overlay)
    }

    fn anchored_image(&self, image: &ImageWatermark, width: u32, height: u32) -> RgbaImage {
        match self.options.anchored_image_scale {
            ImageScale::Native => image.pixels().clone(),
            ImageScale::CanvasFraction(fraction) => {
                let target_w = ((width as f32 * fraction).floor() as u32).max(1);
                let target_h = ((height as f32 * fraction).floor() as u32).max(1);
                imageops::resize(image.pixels(), target_w, target_h, FilterType::Triangle)
            }
        }
    }
}

fn text_sprite(text: &TextWatermark, opacity: f32) -> Result<RgbaImage> {
    text::render_text(text, text.color_or(Color::WHITE), opacity_to_alpha(opacity))
}

/// Anchor against the free space left by the unrotated sprite, then paste
/// the rotated sprite's top-left corner there
fn paste_anchored(overlay: &mut RgbaImage, sprite: &RgbaImage, placement: &Placement) {
    let free_w = overlay.width() as f64 - sprite.width() as f64;
    let free_h = overlay.height() as f64 - sprite.height() as f64;
    let x = (placement.position_x() as f64 * free_w).floor() as i64;
    let y = (placement.position_y() as f64 * free_h).floor() as i64;

    let rotated = rotate_expand(sprite, placement.rotation_degrees());
    overlay_at(overlay, &rotated, x, y);
}

pub(crate) fn diagonal_spacing(width: u32, height: u32) -> u32 {
    (width.min(height) / 4).max(1)
}

/// Two families of 45 degree strokes: rising ones hanging from the top edge
/// and falling ones standing on the bottom edge
fn draw_diagonal(overlay: &mut RgbaImage, sprite: &RgbaImage) {
    let (width, height) = overlay.dimensions();
    let spacing = diagonal_spacing(width, height);

    let rising = rotate_expand(sprite, DIAGONAL_ANGLE);
    let falling = rotate_expand(sprite, -DIAGONAL_ANGLE);
    let falling_y = height as i64 - falling.height() as i64;

    let mut strokes = 0;
    for i in (-(height as i64)..width as i64).step_by(spacing as usize) {
        overlay_at(overlay, &rising, i, 0);
        overlay_at(overlay, &falling, i, falling_y);
        strokes += 1;
    }
    debug!("Drew {} diagonal strokes per direction, spacing {}", strokes, spacing);
}

/// Top-left corner of grid cell `(x, y)`
pub(crate) fn grid_cell(width: u32, height: u32, x: u32, y: u32) -> (i64, i64) {
    let (w, h) = (width as f64, height as f64);
    let cell_x = (w / GRID_SIZE as f64 * x as f64).floor() + (w * GRID_JITTER_FRACTION * (x % 2) as f64).floor();
    let cell_y = (h / GRID_SIZE as f64 * y as f64).floor() + (h * GRID_JITTER_FRACTION * (y % 2) as f64).floor();
    (cell_x as i64, cell_y as i64)
}

fn draw_grid(overlay: &mut RgbaImage, image: &ImageWatermark, opacity: f32) {
    let (width, height) = overlay.dimensions();
    let stamp_w = ((width as f64 * GRID_STAMP_FRACTION).floor() as u32).max(1);
    let stamp_h = ((height as f64 * GRID_STAMP_FRACTION).floor() as u32).max(1);

    let mut stamp = imageops::resize(image.pixels(), stamp_w, stamp_h, FilterType::Triangle);
    set_alpha(&mut stamp, opacity_to_alpha(opacity));

    for x in 0..GRID_SIZE {
        for y in 0..GRID_SIZE {
            let (cell_x, cell_y) = grid_cell(width, height, x, y);
            overlay_at(overlay, &stamp, cell_x, cell_y);
        }
    }
}
