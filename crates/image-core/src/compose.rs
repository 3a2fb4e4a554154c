//! Straight-alpha compositing helpers

use image::{Rgba, RgbaImage};

/// Convert an opacity in `[0, 1]` to an 8-bit alpha, rounding down
pub fn opacity_to_alpha(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).floor() as u8
}

/// Porter-Duff "over" of `src` onto `dst` with straight (non-premultiplied) alpha
///
/// A fully transparent `src` leaves `dst` untouched and a fully opaque one
/// replaces it, both bit-exact.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }

    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let channel = |s: u8, d: u8| -> u8 {
        let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Blend `sprite` onto `canvas` with its top-left corner at `(x, y)`
///
/// Parts of the sprite outside the canvas are clipped.
pub fn overlay_at(canvas: &mut RgbaImage, sprite: &RgbaImage, x: i64, y: i64) {
    let canvas_w = canvas.width() as i64;
    let canvas_h = canvas.height() as i64;

    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = x.saturating_add(sprite.width() as i64).min(canvas_w);
    let y_end = y.saturating_add(sprite.height() as i64).min(canvas_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src = *sprite.get_pixel((tx - x) as u32, (ty - y) as u32);
            let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
            *dst = blend_over(*dst, src);
        }
    }
}

/// Composite a full-size overlay onto the canvas
pub fn composite_over(canvas: &mut RgbaImage, overlay: &RgbaImage) {
    overlay_at(canvas, overlay, 0, 0);
}

/// Multiply every pixel's alpha by `opacity`, rounding down
pub fn scale_alpha(image: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for pixel in image.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * opacity).floor() as u8;
    }
}

/// Replace every pixel's alpha
pub fn set_alpha(image: &mut RgbaImage, alpha: u8) {
    for pixel in image.pixels_mut() {
        pixel[3] = alpha;
    }
}
