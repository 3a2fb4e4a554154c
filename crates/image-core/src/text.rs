//! Text watermark rendering to RGBA sprites

use crate::bitmap;
use crate::compose::blend_over;
use ab_glyph::{Font, FontRef as GlyphFont, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use log::warn;
use watermark_core::{Color, FontRef, Result, TextWatermark, WatermarkError};

/// Longest side, in pixels, of a text sprite
pub const MAX_SPRITE_SIDE: u32 = 8192;

/// Render the watermark text onto a tight transparent sprite
///
/// # Arguments
/// * `text` - Resolved text watermark; its size is taken as pixels
/// * `color` - Fill color
/// * `alpha` - Fill alpha, multiplied by glyph coverage
///
/// # Errors
/// `InvalidWatermark` when the sprite would exceed [`MAX_SPRITE_SIDE`]
pub fn render_text(text: &TextWatermark, color: Color, alpha: u8) -> Result<RgbaImage> {
    if let FontRef::TrueType(font) = text.font() {
        match GlyphFont::try_from_slice(font.data()) {
            Ok(glyphs) => {
                let (width, height, baseline) = outline_metrics(&glyphs, text)?;
                let sprite = RgbaImage::new(width, height);
                return Ok(render_outline(sprite, &glyphs, text, baseline, color, alpha));
            }
            Err(e) => warn!(
                "Font {} could not be rasterized ({}), using the built-in font",
                font.name(),
                e
            ),
        }
    }

    render_bitmap(text, color, alpha)
}

fn too_large(text: &TextWatermark) -> WatermarkError {
    WatermarkError::InvalidWatermark(format!(
        "text of {} characters at size {} exceeds {MAX_SPRITE_SIDE}px",
        text.content().chars().count(),
        text.size_pt()
    ))
}

/// Round a float extent up to whole pixels within [`MAX_SPRITE_SIDE`]
fn sprite_side(extent: f32) -> Option<u32> {
    let extent = extent.ceil();
    (extent.is_finite() && extent <= MAX_SPRITE_SIDE as f32).then(|| (extent as u32).max(1))
}

/// Sprite width, height and baseline for an outline font
fn outline_metrics(font: &GlyphFont<'_>, text: &TextWatermark) -> Result<(u32, u32, f32)> {
    let scaled = font.as_scaled(PxScale::from(text.size_pt()));

    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.content().chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    let ascent = scaled.ascent();
    let height = ascent - scaled.descent();

    match (sprite_side(width), sprite_side(height)) {
        (Some(width), Some(height)) => Ok((width, height, ascent)),
        _ => Err(too_large(text)),
    }
}

fn render_outline(
    mut sprite: RgbaImage,
    font: &GlyphFont<'_>,
    text: &TextWatermark,
    baseline: f32,
    color: Color,
    alpha: u8,
) -> RgbaImage {
    let (width, height) = sprite.dimensions();
    let scale = PxScale::from(text.size_pt());
    let scaled = font.as_scaled(scale);

    let mut cursor_x = 0.0f32;
    let mut prev: Option<GlyphId> = None;

    for c in text.content().chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor_x += scaled.kern(prev, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i64 + bounds.min.x as i64;
                let y = py as i64 + bounds.min.y as i64;
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    return;
                }

                let a = (coverage.clamp(0.0, 1.0) * alpha as f32) as u8;
                let pixel = sprite.get_pixel_mut(x as u32, y as u32);
                *pixel = blend_over(*pixel, Rgba([color.r, color.g, color.b, a]));
            });
        }

        cursor_x += scaled.h_advance(id);
        prev = Some(id);
    }

    sprite
}

fn render_bitmap(text: &TextWatermark, color: Color, alpha: u8) -> Result<RgbaImage> {
    let scale = bitmap::scale_for(text.size_pt());
    let (width, height) = bitmap::measure(text.content(), scale)
        .filter(|&(w, h)| w <= MAX_SPRITE_SIDE && h <= MAX_SPRITE_SIDE)
        .ok_or_else(|| too_large(text))?;

    let mut sprite = RgbaImage::new(width, height);
    let fill = Rgba([color.r, color.g, color.b, alpha]);
    bitmap::for_each_pixel(text.content(), scale, |x, y| {
        sprite.put_pixel(x, y, fill);
    });

    Ok(sprite)
}
