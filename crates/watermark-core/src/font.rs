//! Font resolution
//!
//! Text watermarks carry a [`FontRef`]. A [`FontProvider`] picks one when the
//! caller does not: [`SystemFonts`] probes well-known platform paths and falls
//! back to the built-in font, [`FixedFont`] always returns the same font.

use crate::{Result, WatermarkError};
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Platform font paths probed by [`SystemFonts::default`], in order
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Raw TrueType/OpenType font data validated at construction
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
}

impl TrueTypeFont {
    /// Load a font from bytes
    ///
    /// # Arguments
    /// * `name` - Display name, also used as the PDF base font name
    /// * `data` - TTF/OTF (or the first face of a TTC) bytes
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        ttf_parser::Face::parse(&data, 0).map_err(|e| {
            WatermarkError::InvalidWatermark(format!("font could not be parsed: {e}"))
        })?;

        Ok(Self {
            name: name.into(),
            data,
        })
    }

    /// Load a font file, naming it after the file stem
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            WatermarkError::InvalidWatermark(format!(
                "font file {} could not be read: {e}",
                path.display()
            ))
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Font")
            .to_string();

        Self::from_bytes(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Font used to render a text watermark
#[derive(Debug, Clone)]
pub enum FontRef {
    /// A parsed TrueType font, shared between renders
    TrueType(Arc<TrueTypeFont>),
    /// Built-in font: a bitmap font on rasters, standard Helvetica in PDFs
    Builtin,
}

impl FontRef {
    pub fn truetype(font: TrueTypeFont) -> Self {
        FontRef::TrueType(Arc::new(font))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FontRef::Builtin)
    }
}

/// Chooses the font for text watermarks that do not name one
pub trait FontProvider: Send + Sync {
    /// Resolve a font. Never fails: implementations fall back to
    /// [`FontRef::Builtin`].
    fn resolve_font(&self) -> FontRef;
}

/// Probes an ordered list of font files
#[derive(Debug, Clone)]
pub struct SystemFonts {
    candidates: Vec<PathBuf>,
}

impl SystemFonts {
    /// Probe the given paths instead of [`DEFAULT_FONT_PATHS`]
    pub fn with_candidates<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::with_candidates(DEFAULT_FONT_PATHS.iter().copied())
    }
}

impl FontProvider for SystemFonts {
    fn resolve_font(&self) -> FontRef {
        for path in &self.candidates {
            if !path.is_file() {
                continue;
            }
            match TrueTypeFont::from_file(path) {
                Ok(font) => {
                    debug!("Using font {}", path.display());
                    return FontRef::truetype(font);
                }
                Err(e) => warn!("Skipping font {}: {}", path.display(), e),
            }
        }

        warn!("No usable system font found, falling back to the built-in font");
        FontRef::Builtin
    }
}

/// Always resolves to the same font
#[derive(Debug, Clone)]
pub struct FixedFont(pub FontRef);

impl FixedFont {
    pub fn new(font: FontRef) -> Self {
        Self(font)
    }

    /// Pin the built-in font for reproducible output
    pub fn builtin() -> Self {
        Self(FontRef::Builtin)
    }
}

impl FontProvider for FixedFont {
    fn resolve_font(&self) -> FontRef {
        self.0.clone()
    }
}
