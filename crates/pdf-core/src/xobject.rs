//! Image XObjects for PDF documents

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use watermark_core::ImageWatermark;

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("Image data too short".to_string()));
    }

    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }

    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }

    Err(PdfError::ImageError("Unknown image format".to_string()))
}

/// Number of color components declared in a JPEG's SOF segment
fn jpeg_components(data: &[u8]) -> Result<u8> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15, except DHT, JPG and DAC
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            return Ok(data[i + 9]);
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError("Could not parse JPEG info".to_string()))
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// PDF filter ("DCTDecode" for JPEG, "FlateDecode" otherwise)
    pub filter: String,
    /// Encoded image data
    pub data: Vec<u8>,
    /// Soft mask carrying the alpha channel, if any pixel is not opaque
    pub smask: Option<Box<ImageXObject>>,
}

impl ImageXObject {
    /// Build an XObject for a watermark image
    ///
    /// Grayscale and RGB JPEGs pass through unchanged with DCTDecode. Everything
    /// else is written as Flate-compressed RGB with the alpha channel in a
    /// DeviceGray soft mask.
    pub fn from_watermark(image: &ImageWatermark) -> Result<Self> {
        if let Ok(ImageFormat::Jpeg) = detect_format(image.encoded()) {
            let components = jpeg_components(image.encoded())?;
            let color_space = match components {
                1 => "DeviceGray",
                3 => "DeviceRGB",
                _ => return Self::from_rgba(image),
            };

            return Ok(Self {
                width: image.width(),
                height: image.height(),
                color_space: color_space.to_string(),
                bits_per_component: 8,
                filter: "DCTDecode".to_string(),
                data: image.encoded().to_vec(),
                smask: None,
            });
        }

        Self::from_rgba(image)
    }

    /// Build an XObject from decoded RGBA pixels
    fn from_rgba(image: &ImageWatermark) -> Result<Self> {
        let pixels = image.pixels();
        let count = (pixels.width() * pixels.height()) as usize;

        let mut rgb = Vec::with_capacity(count * 3);
        let mut alpha = Vec::with_capacity(count);
        for pixel in pixels.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel[3]);
        }

        let smask = if alpha.iter().any(|&a| a != u8::MAX) {
            Some(Box::new(Self {
                width: pixels.width(),
                height: pixels.height(),
                color_space: "DeviceGray".to_string(),
                bits_per_component: 8,
                filter: "FlateDecode".to_string(),
                data: deflate(&alpha)?,
                smask: None,
            }))
        } else {
            None
        };

        Ok(Self {
            width: pixels.width(),
            height: pixels.height(),
            color_space: "DeviceRGB".to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&rgb)?,
            smask,
        })
    }

    /// Convert to lopdf Stream object, without the soft mask reference
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));

        Stream::new(dict, self.data.clone())
    }

    /// Add the image (and its soft mask) to the document
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut stream = self.to_pdf_stream();
        if let Some(smask) = &self.smask {
            let smask_id = doc.add_object(smask.to_pdf_stream());
            stream.dict.set("SMask", Object::Reference(smask_id));
        }
        doc.add_object(stream)
    }
}

/// Generate operators drawing an image XObject into the unit square
/// scaled to `width` x `height` at `(x, y)`
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x` - X coordinate in points
/// * `y` - Y coordinate in points (from bottom, PDF coordinates)
/// * `width` - Image width in points
/// * `height` - Image height in points
pub fn generate_image_operators(image_name: &str, x: f32, y: f32, width: f32, height: f32) -> String {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat as Encoding, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn watermark_from(bytes: Vec<u8>) -> ImageWatermark {
        ImageWatermark::decode(bytes).unwrap()
    }

    fn png_watermark(image: &RgbaImage) -> ImageWatermark {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), Encoding::Png)
            .unwrap();
        watermark_from(buffer)
    }

    #[test]
    fn test_detect_jpeg() {
        let jpeg_header = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_format(&jpeg_header).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let png_header = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(detect_format(&[0u8; 8]).is_err());
        assert!(detect_format(&[0xFF, 0xD8]).is_err());
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("Im1", 100.0, 200.0, 50.0, 75.0);
        assert_eq!(ops, "q\n50 0 0 75 100 200 cm\n/Im1 Do\nQ\n");
    }

    #[test]
    fn test_translucent_png_gets_soft_mask() {
        let mut image = RgbaImage::from_pixel(4, 3, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 10]));

        let xobject = ImageXObject::from_watermark(&png_watermark(&image)).unwrap();
        assert_eq!(xobject.width, 4);
        assert_eq!(xobject.height, 3);
        assert_eq!(xobject.filter, "FlateDecode");

        let smask = xobject.smask.as_ref().unwrap();
        assert_eq!(smask.color_space, "DeviceGray");

        let mut doc = Document::with_version("1.5");
        let id = xobject.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_opaque_png_has_no_soft_mask() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        let xobject = ImageXObject::from_watermark(&png_watermark(&image)).unwrap();
        assert!(xobject.smask.is_none());
        assert_eq!(xobject.color_space, "DeviceRGB");
    }

    #[test]
    fn test_jpeg_passes_through() {
        let image = RgbImage::from_pixel(8, 6, Rgb([10, 200, 30]));
        let mut jpeg = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut jpeg), Encoding::Jpeg)
            .unwrap();

        let xobject = ImageXObject::from_watermark(&watermark_from(jpeg.clone())).unwrap();
        assert_eq!(xobject.filter, "DCTDecode");
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.data, jpeg);
        assert!(xobject.smask.is_none());
    }
}
