//! Drawing surface producing a page overlay form

use crate::document::PageBox;
use crate::text::generate_text_operators;
use crate::xobject::generate_image_operators;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use watermark_core::Color;

const FONT_RESOURCE: &str = "WmFont";
const IMAGE_RESOURCE: &str = "WmImage";
const ALPHA_RESOURCE: &str = "WmAlpha";

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// Counter-clockwise rotation in y-up space
    pub fn rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Matrix([cos, sin, -sin, cos, 0.0, 0.0])
    }

    /// `self` applied first, then `next`
    pub fn then(self, next: Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = next.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    pub fn is_identity(&self) -> bool {
        self.0
            .iter()
            .zip(Matrix::IDENTITY.0.iter())
            .all(|(v, i)| (v - i).abs() < 1e-5)
    }

    fn to_operator(self) -> String {
        let parts: Vec<String> = self.0.iter().map(|v| format_number(*v)).collect();
        format!("{} cm\n", parts.join(" "))
    }
}

/// Compact number formatting for content streams
fn format_number(value: f32) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Vector drawing surface for one page
///
/// Coordinates are page-box-local: `(0, 0)` is the lower-left corner of the
/// page box and y grows upwards. The surface keeps the transform it has
/// applied so far; [`DrawingSurface::scoped`] saves and restores it together
/// with the PDF graphics state.
pub struct DrawingSurface {
    page_box: PageBox,
    content: String,
    transform: Matrix,
    saved: Vec<Matrix>,
    fonts: Dictionary,
    xobjects: Dictionary,
    ext_gstates: Dictionary,
}

impl DrawingSurface {
    pub fn new(page_box: PageBox) -> Self {
        let origin = Matrix::translate(page_box.llx, page_box.lly);
        Self {
            page_box,
            content: origin.to_operator(),
            transform: Matrix::IDENTITY,
            saved: Vec::new(),
            fonts: Dictionary::new(),
            xobjects: Dictionary::new(),
            ext_gstates: Dictionary::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.page_box.width()
    }

    pub fn height(&self) -> f32 {
        self.page_box.height()
    }

    /// Transform applied on top of the page-box origin
    pub fn transform(&self) -> Matrix {
        self.transform
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Content stream operators drawn so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Run `draw` inside a saved graphics state
    pub fn scoped<R>(&mut self, draw: impl FnOnce(&mut Self) -> R) -> R {
        self.content.push_str("q\n");
        self.saved.push(self.transform);

        let result = draw(self);

        self.content.push_str("Q\n");
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
        result
    }

    fn concat(&mut self, matrix: Matrix) {
        self.content.push_str(&matrix.to_operator());
        self.transform = matrix.then(self.transform);
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.concat(Matrix::translate(x, y));
    }

    /// Rotate counter-clockwise by `degrees`
    pub fn rotate(&mut self, degrees: f32) {
        if degrees != 0.0 {
            self.concat(Matrix::rotate(degrees));
        }
    }

    /// Apply an ExtGState (fill and stroke alpha)
    pub fn set_graphics_state(&mut self, ext_gstate_id: ObjectId) {
        self.ext_gstates.set(ALPHA_RESOURCE, ext_gstate_id);
        self.content.push_str(&format!("/{ALPHA_RESOURCE} gs\n"));
    }

    pub fn set_fill_color(&mut self, color: Color) {
        let (r, g, b) = color.to_unit();
        self.content.push_str(&format!(
            "{} {} {} rg\n",
            format_number(r),
            format_number(g),
            format_number(b)
        ));
    }

    /// Show text with its baseline start at the current origin
    ///
    /// # Arguments
    /// * `font_id` - Font dictionary object
    /// * `font_size` - Size in points
    /// * `shown` - String operand already encoded for the font
    pub fn show_text(&mut self, font_id: ObjectId, font_size: f32, shown: &str) {
        self.fonts.set(FONT_RESOURCE, font_id);
        self.content
            .push_str(&generate_text_operators(FONT_RESOURCE, font_size, shown));
    }

    /// Draw an image XObject with its lower-left corner at the current origin
    pub fn draw_image(&mut self, image_id: ObjectId, width: f32, height: f32) {
        self.xobjects.set(IMAGE_RESOURCE, image_id);
        self.content.push_str(&generate_image_operators(
            IMAGE_RESOURCE,
            0.0,
            0.0,
            width,
            height,
        ));
    }

    /// Store the drawing as a form XObject with its own resources
    ///
    /// # Returns
    /// The form's object ID
    pub fn finish(self, doc: &mut Document) -> ObjectId {
        let mut resources = Dictionary::new();
        if !self.fonts.is_empty() {
            resources.set("Font", Object::Dictionary(self.fonts));
        }
        if !self.xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(self.xobjects));
        }
        if !self.ext_gstates.is_empty() {
            resources.set("ExtGState", Object::Dictionary(self.ext_gstates));
        }

        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => self.page_box.to_object(),
            "Resources" => resources,
        };
        doc.add_object(Stream::new(dict, self.content.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn letter() -> PageBox {
        PageBox::new(0.0, 0.0, 612.0, 792.0)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.70710677), "0.7071");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(153.5), "153.5");
    }

    #[test]
    fn test_matrix_composition() {
        let m = Matrix::rotate(90.0).then(Matrix::translate(10.0, 20.0));
        let (x, y) = m.apply(1.0, 0.0);
        assert!((x - 10.0).abs() < 1e-5);
        assert!((y - 21.0).abs() < 1e-5);

        let back = Matrix::rotate(45.0).then(Matrix::rotate(-45.0));
        assert!(back.is_identity());
    }

    #[test]
    fn test_scoped_restores_transform() {
        let mut surface = DrawingSurface::new(letter());

        surface.scoped(|s| {
            s.translate(100.0, 0.0);
            s.rotate(45.0);
            assert!(!s.transform().is_identity());
            assert_eq!(s.depth(), 1);
        });

        assert!(surface.transform().is_identity());
        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.content().matches("q\n").count(), 1);
        assert_eq!(surface.content().matches("Q\n").count(), 1);
    }

    #[test]
    fn test_origin_translation() {
        let surface = DrawingSurface::new(PageBox::new(18.0, 36.0, 630.0, 828.0));
        assert!(surface.content().starts_with("1 0 0 1 18 36 cm\n"));
        assert_eq!(surface.width(), 612.0);
        assert_eq!(surface.height(), 792.0);
    }

    #[test]
    fn test_finish_builds_form() {
        let mut doc = Document::with_version("1.5");
        let gs_id = doc.add_object(dictionary! { "Type" => "ExtGState", "ca" => 0.5 });
        let font_id = doc.add_object(dictionary! { "Type" => "Font" });

        let mut surface = DrawingSurface::new(letter());
        surface.set_graphics_state(gs_id);
        surface.set_fill_color(Color::BLACK);
        surface.show_text(font_id, 36.0, "(DRAFT)");

        let form_id = surface.finish(&mut doc);
        let form = doc.get_object(form_id).unwrap().as_stream().unwrap();

        assert_eq!(form.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        let resources = form.dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"WmFont"));
        assert!(resources.get(b"ExtGState").unwrap().as_dict().unwrap().has(b"WmAlpha"));
        assert!(resources.get(b"XObject").is_err());

        let content = String::from_utf8(form.content.clone()).unwrap();
        assert!(content.contains("/WmAlpha gs\n0 0 0 rg\n"));
        assert!(content.contains("/WmFont 36 Tf"));
    }
}
