//! Font handling for PDF documents

use crate::{PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeSet;
use subsetter::GlyphRemapper;
use watermark_core::TrueTypeFont;

/// Borrowed TrueType font prepared for embedding as a Type0/CIDFontType2 font
///
/// Only the glyphs of added characters are embedded. They are renumbered
/// densely from 1 (0 stays `.notdef`), and text is shown with Identity-H
/// encoding as 2-byte new glyph IDs.
pub struct FontData<'a> {
    /// Base font name
    pub name: String,
    ttf_data: &'a [u8],
    face: ttf_parser::Face<'a>,
    /// Characters used (for the widths and ToUnicode tables)
    pub used_chars: BTreeSet<char>,
    remapper: GlyphRemapper,
}

impl<'a> FontData<'a> {
    /// Parse a resolved TrueType font
    pub fn new(font: &'a TrueTypeFont) -> Result<Self> {
        let face = ttf_parser::Face::parse(font.data(), 0)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        Ok(Self {
            name: pdf_font_name(font.name()),
            ttf_data: font.data(),
            face,
            used_chars: BTreeSet::new(),
            remapper: GlyphRemapper::new(),
        })
    }

    /// Add characters to the used set (for subsetting)
    pub fn add_chars(&mut self, text: &str) {
        for c in text.chars() {
            if self.used_chars.insert(c) {
                if let Some(gid) = self.glyph_id(c) {
                    self.remapper.remap(gid);
                }
            }
        }
    }

    /// Get glyph ID for a character in the original font
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face.glyph_index(c).map(|id| id.0)
    }

    /// Glyph ID of a character in the subset, `.notdef` when never added
    pub fn subset_glyph_id(&self, c: char) -> u16 {
        self.glyph_id(c)
            .and_then(|gid| self.remapper.get(gid))
            .unwrap_or(0)
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    /// Advance of an original glyph in PDF glyph space (1/1000 em)
    fn glyph_width(&self, gid: u16) -> i64 {
        let advance = self
            .face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .unwrap_or(0) as i64;
        advance * 1000 / self.units_per_em().max(1) as i64
    }

    /// Encode text as hex string for PDF Tj operator
    ///
    /// Characters must have been added with [`FontData::add_chars`] first.
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');
        for c in text.chars() {
            result.push_str(&format!("{:04X}", self.subset_glyph_id(c)));
        }
        result.push('>');
        result
    }

    /// Single-face TrueType program holding only the used glyphs
    pub fn create_subset(&self) -> Result<Vec<u8>> {
        subsetter::subset(self.ttf_data, 0, &self.remapper)
            .map_err(|e| PdfError::FontSubsetError(format!("{e:?}")))
    }

    /// Write the font objects into the document
    ///
    /// # Returns
    /// The Type0 font dictionary, ready to be referenced from a Font resource
    pub fn embed(&self, doc: &mut Document) -> Result<ObjectId> {
        let font_name = Object::Name(self.name.clone().into_bytes());

        let program = self.create_subset()?;
        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => program.len() as i64 },
            program,
        ));

        let units_per_em = self.units_per_em().max(1) as i64;
        let scale = |v: i16| v as i64 * 1000 / units_per_em;
        let bbox = self.face.global_bounding_box();
        let ascent = scale(self.face.ascender());
        let descent = scale(self.face.descender());

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => font_name.clone(),
            "Flags" => 4,
            "FontBBox" => vec![
                scale(bbox.x_min).into(),
                scale(bbox.y_min).into(),
                scale(bbox.x_max).into(),
                scale(bbox.y_max).into(),
            ],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => ascent,
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => font_name.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "CIDToGIDMap" => "Identity",
            "W" => self.generate_widths_array(),
            "DW" => 1000,
        });

        let tounicode_id = doc.add_object(Stream::new(
            dictionary! {},
            self.generate_tounicode_cmap().into_bytes(),
        ));

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => font_name,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![cid_font_id.into()],
            "ToUnicode" => tounicode_id,
        }))
    }

    /// Used characters that have a glyph, as `(subset gid, original gid, char)`
    fn mapped_chars(&self) -> Vec<(u16, u16, char)> {
        let mut mapped: Vec<(u16, u16, char)> = self
            .used_chars
            .iter()
            .filter_map(|&c| {
                let gid = self.glyph_id(c)?;
                Some((self.remapper.get(gid)?, gid, c))
            })
            .collect();
        mapped.sort();
        mapped
    }

    /// Generate /W array for glyph widths: `[gid [width] gid [width] ...]`
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut mapped = self.mapped_chars();
        mapped.dedup_by_key(|(new_gid, _, _)| *new_gid);

        let mut widths = Vec::with_capacity(mapped.len() * 2);
        for (new_gid, gid, _) in mapped {
            widths.push((new_gid as i64).into());
            widths.push(Object::Array(vec![self.glyph_width(gid).into()]));
        }
        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        let mapped = self.mapped_chars();

        // At most 100 entries per bfchar block
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, _, c) in chunk {
                let mut units = [0u16; 2];
                let hex: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");

        cmap
    }
}

/// PDF names may not contain whitespace or delimiters
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "WatermarkFont".to_string()
    } else {
        cleaned
    }
}

/// One of the standard 14 fonts, referenced by name and never embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
        }
    }

    /// Simple Type1 font dictionary with WinAnsi encoding
    pub fn to_dictionary(self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    #[test]
    fn test_pdf_font_name() {
        assert_eq!(pdf_font_name("DejaVu Sans"), "DejaVuSans");
        assert_eq!(pdf_font_name("(/)"), "WatermarkFont");
    }

    #[test]
    fn test_standard_font_dictionary() {
        let dict = StandardFont::Helvetica.to_dictionary();
        assert_eq!(
            dict.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"Helvetica"
        );
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
    }

    #[test]
    fn test_embed_truetype_when_available() {
        // Only runs where the font is installed
        if !Path::new(SYSTEM_FONT).is_file() {
            return;
        }
        let font = TrueTypeFont::from_file(Path::new(SYSTEM_FONT)).unwrap();
        let mut data = FontData::new(&font).unwrap();
        data.add_chars("ABBA");

        // Glyphs are renumbered after .notdef in the order they were added
        assert_eq!(data.encode_text_hex("AB"), "<00010002>");
        assert_eq!(data.encode_text_hex("Z"), "<0000>");

        let mut doc = Document::with_version("1.5");
        let type0_id = data.embed(&mut doc).unwrap();

        let type0 = doc.get_object(type0_id).unwrap().as_dict().unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(
            type0.get(b"Encoding").unwrap().as_name().unwrap(),
            b"Identity-H"
        );
        assert_eq!(data.generate_widths_array().len(), 4);
        assert!(data.generate_tounicode_cmap().contains("<0001> <0041>"));
    }

    #[test]
    fn test_subset_is_smaller_than_font() {
        if !Path::new(SYSTEM_FONT).is_file() {
            return;
        }
        let font = TrueTypeFont::from_file(Path::new(SYSTEM_FONT)).unwrap();
        let mut data = FontData::new(&font).unwrap();
        data.add_chars("DRAFT");

        let subset = data.create_subset().unwrap();
        assert!(subset.len() < font.data().len() / 10);

        // The subset is a standalone font with the renumbered glyphs
        let face = ttf_parser::Face::parse(&subset, 0).unwrap();
        assert_eq!(face.number_of_glyphs(), 6);

        let mut doc = Document::with_version("1.5");
        data.embed(&mut doc).unwrap();
        let program = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| s.dict.has(b"Length1"))
            .unwrap();
        assert_eq!(program.content, subset);
    }
}
