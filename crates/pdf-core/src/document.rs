//! PDF document wrapper

use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Maximum depth followed when resolving inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A4 in points, used when no page box is found anywhere in the tree
const A4_WIDTH: f32 = 595.28;
const A4_HEIGHT: f32 = 841.89;

/// Page rectangle in PDF user space (points)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub fn new(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        // Normalize so the lower-left corner really is lower-left
        Self {
            llx: llx.min(urx),
            lly: lly.min(ury),
            urx: llx.max(urx),
            ury: lly.max(ury),
        }
    }

    pub fn a4() -> Self {
        Self::new(0.0, 0.0, A4_WIDTH, A4_HEIGHT)
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx),
            Object::Real(self.lly),
            Object::Real(self.urx),
            Object::Real(self.ury),
        ])
    }
}

/// PDF Document wrapper providing the page-level operations watermarking needs
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
}

impl PdfDocument {
    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object IDs in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Get the page box
    ///
    /// Uses the MediaBox, or the CropBox when no MediaBox is present,
    /// following the `Parent` chain for inherited values. Falls back to A4
    /// when neither is found anywhere.
    ///
    /// # Errors
    /// `ParseError` when a box is present but is not four numbers
    pub fn page_box(&self, page_id: ObjectId) -> Result<PageBox> {
        let media_box = match self.inherited_attribute(page_id, b"MediaBox")? {
            Some(media_box) => Some(media_box),
            None => self.inherited_attribute(page_id, b"CropBox")?,
        };

        match media_box {
            Some(array) => parse_page_box(&array),
            None => Ok(PageBox::a4()),
        }
    }

    /// Resources dictionary in effect for a page, including inherited ones
    pub fn effective_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        match self.inherited_attribute(page_id, b"Resources")? {
            Some(Object::Dictionary(dict)) => Ok(dict),
            Some(_) => Err(PdfError::ParseError(
                "Resources is not a dictionary".to_string(),
            )),
            None => Ok(Dictionary::new()),
        }
    }

    /// Look up a page attribute on the page or its ancestors, resolving references
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;

            if let Ok(value) = dict.get(key) {
                return self.resolve(value).map(Some);
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Follow a reference chain to the direct object
    fn resolve(&self, object: &Object) -> Result<Object> {
        let mut current = object;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Object::Reference(id) => current = self.inner.get_object(*id)?,
                direct => return Ok(direct.clone()),
            }
        }
        Err(PdfError::ParseError("Reference chain too deep".to_string()))
    }

    /// Name not yet used in the resource category `category` (e.g. `XObject`)
    pub fn unique_resource_name(
        &self,
        resources: &Dictionary,
        category: &[u8],
        prefix: &str,
    ) -> Result<String> {
        let existing = match resources.get(category) {
            Ok(object) => match self.resolve(object)? {
                Object::Dictionary(dict) => dict,
                _ => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };

        let mut n = 1;
        loop {
            let name = format!("{prefix}{n}");
            if !existing.has(name.as_bytes()) {
                return Ok(name);
            }
            n += 1;
        }
    }

    /// Draw a form XObject over a page's existing content
    ///
    /// The existing content streams are kept as they are and wrapped in a
    /// `q ... Q` pair so that state they leave behind cannot leak into the
    /// overlay. The form is registered in the page's resources under a name
    /// that does not clash with inherited resources.
    ///
    /// # Returns
    /// The resource name the form was registered under
    pub fn overlay_form(&mut self, page_id: ObjectId, form_id: ObjectId, prefix: &str) -> Result<String> {
        let existing = self.content_references(page_id)?;

        let mut resources = self.effective_resources(page_id)?;
        let name = self.unique_resource_name(&resources, b"XObject", prefix)?;

        let mut xobjects = match resources.get(b"XObject") {
            Ok(object) => match self.resolve(object)? {
                Object::Dictionary(dict) => dict,
                _ => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };
        xobjects.set(name.as_bytes(), Object::Reference(form_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let head_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let tail_id = self.inner.add_object(Stream::new(
            Dictionary::new(),
            format!("Q\nq\n/{name} Do\nQ\n").into_bytes(),
        ));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(head_id));
        contents.extend(existing.into_iter().map(Object::Reference));
        contents.push(Object::Reference(tail_id));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(name)
    }

    /// References to the page's content streams, in drawing order
    ///
    /// Direct streams are moved into indirect objects so they can sit in an array.
    fn content_references(&mut self, page_id: ObjectId) -> Result<Vec<ObjectId>> {
        let contents = {
            let page_dict = self
                .inner
                .get_object(page_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;
            match page_dict.get(b"Contents") {
                Ok(contents) => contents.clone(),
                Err(_) => return Ok(Vec::new()),
            }
        };

        let entries = match contents {
            Object::Reference(id) => match self.inner.get_object(id)? {
                Object::Stream(_) => return Ok(vec![id]),
                Object::Array(items) => items.clone(),
                _ => {
                    return Err(PdfError::ParseError(
                        "Contents is not a stream".to_string(),
                    ))
                }
            },
            Object::Array(items) => items,
            Object::Stream(stream) => return Ok(vec![self.inner.add_object(stream)]),
            _ => {
                return Err(PdfError::ParseError(
                    "Contents is not a stream".to_string(),
                ))
            }
        };

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Object::Reference(id) => match self.inner.get_object(id)? {
                    Object::Stream(_) => ids.push(id),
                    _ => {
                        return Err(PdfError::ParseError(
                            "Contents entry is not a stream".to_string(),
                        ))
                    }
                },
                Object::Stream(stream) => ids.push(self.inner.add_object(stream)),
                _ => {
                    return Err(PdfError::ParseError(
                        "Contents entry is not a stream".to_string(),
                    ))
                }
            }
        }

        Ok(ids)
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn parse_page_box(object: &Object) -> Result<PageBox> {
    let array = object
        .as_array()
        .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;

    let values: Vec<f32> = array.iter().filter_map(number).collect();
    if array.len() != 4 || values.len() != 4 {
        return Err(PdfError::ParseError(
            "MediaBox must hold four numbers".to_string(),
        ));
    }

    Ok(PageBox::new(values[0], values[1], values[2], values[3]))
}
