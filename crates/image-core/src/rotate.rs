//! Rotation with bounding-box expansion

use image::{imageops, Rgba, RgbaImage};

/// Rotate counter-clockwise by `degrees`, growing the canvas so no corner is cut
///
/// Quarter turns are exact pixel permutations. Other angles sample the
/// source with nearest-neighbour inverse mapping; uncovered pixels are
/// transparent.
pub fn rotate_expand(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let degrees = degrees.rem_euclid(360.0);

    if degrees == 0.0 || degrees >= 360.0 {
        return image.clone();
    }
    if degrees == 90.0 {
        return imageops::rotate270(image);
    }
    if degrees == 180.0 {
        return imageops::rotate180(image);
    }
    if degrees == 270.0 {
        return imageops::rotate90(image);
    }

    let (src_w, src_h) = (image.width() as f64, image.height() as f64);
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = radians.sin_cos();

    // Shave float noise so exact extents do not round up a pixel
    let extent = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    let dst_w = extent(src_w * cos.abs() + src_h * sin.abs());
    let dst_h = extent(src_w * sin.abs() + src_h * cos.abs());

    let mut rotated = RgbaImage::from_pixel(dst_w, dst_h, Rgba([0, 0, 0, 0]));
    let (dst_cx, dst_cy) = (dst_w as f64 / 2.0, dst_h as f64 / 2.0);
    let (src_cx, src_cy) = (src_w / 2.0, src_h / 2.0);

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f64 + 0.5 - dst_cx;
            let ry = dy as f64 + 0.5 - dst_cy;

            // y points down, so a visual counter-clockwise turn inverts as below
            let sx = rx * cos - ry * sin + src_cx;
            let sy = rx * sin + ry * cos + src_cy;

            if sx >= 0.0 && sy >= 0.0 && sx < src_w && sy < src_h {
                let pixel = *image.get_pixel(sx as u32, sy as u32);
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}
