//! # Font Resolution
//!
//! Fonts are resolved explicitly for every render from the style sheet's
//! ordered candidate lists. Nothing is registered globally.
//!
//! A role with no candidates uses a built-in Helvetica face, which needs no
//! embedding. A role whose candidates all fail to load is an error; the
//! pipeline answers it by re-rendering with built-in faces.

pub mod metrics;

use std::collections::HashMap;
use std::sync::Arc;

pub use metrics::StandardFontMetrics;

use crate::error::FontError;
use crate::style::{FontRole, FontSet, FontSource};

/// The built-in PDF base fonts used by the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn for_role(role: FontRole) -> Self {
        match role {
            FontRole::Regular => Self::Helvetica,
            FontRole::Bold => Self::HelveticaBold,
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        // Basic Multilingual Plane covers Latin, Arabic and both
        // presentation-form blocks.
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// A TrueType font loaded from disk, embedded whole.
#[derive(Debug)]
pub struct CustomFont {
    pub family: String,
    pub data: Vec<u8>,
    pub metrics: CustomFontMetrics,
}

impl CustomFont {
    pub fn from_bytes(family: &str, data: Vec<u8>) -> Result<Self, FontError> {
        let metrics = CustomFontMetrics::from_font_data(&data).map_err(|e| FontError::Parse {
            family: family.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            family: family.to_string(),
            data,
            metrics,
        })
    }

    fn load(source: &FontSource) -> Result<Self, FontError> {
        let data = std::fs::read(&source.path).map_err(|e| FontError::Parse {
            family: source.family.clone(),
            reason: format!("{}: {e}", source.path.display()),
        })?;
        Self::from_bytes(&source.family, data)
    }
}

/// A font handle ready for measuring and drawing.
#[derive(Debug, Clone)]
pub enum ResolvedFont {
    Standard(StandardFont),
    Custom(Arc<CustomFont>),
}

impl ResolvedFont {
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        match self {
            ResolvedFont::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            ResolvedFont::Custom(font) => font.metrics.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        match self {
            ResolvedFont::Standard(std_font) => {
                std_font.metrics().measure_string(text, font_size, 0.0)
            }
            ResolvedFont::Custom(font) => text
                .chars()
                .map(|ch| font.metrics.char_width(ch, font_size))
                .sum(),
        }
    }

    pub fn family(&self) -> &str {
        match self {
            ResolvedFont::Standard(std_font) => std_font.pdf_name(),
            ResolvedFont::Custom(font) => &font.family,
        }
    }
}

/// Resolve the first loadable candidate, or `builtin` when there are none.
pub fn resolve(candidates: &[FontSource], builtin: StandardFont) -> Result<ResolvedFont, FontError> {
    if candidates.is_empty() {
        return Ok(ResolvedFont::Standard(builtin));
    }

    let mut tried = Vec::with_capacity(candidates.len());
    for source in candidates {
        match CustomFont::load(source) {
            Ok(font) => {
                tracing::debug!(family = %font.family, path = %source.path.display(), "font resolved");
                return Ok(ResolvedFont::Custom(Arc::new(font)));
            }
            Err(e) => {
                tracing::debug!(error = %e, "font candidate rejected");
                tried.push(source.path.display().to_string());
            }
        }
    }
    Err(FontError::Unavailable { tried })
}

/// Regular and bold faces for one render.
#[derive(Debug, Clone)]
pub struct FontContext {
    regular: ResolvedFont,
    bold: ResolvedFont,
}

impl FontContext {
    pub fn resolve(fonts: &FontSet) -> Result<Self, FontError> {
        Ok(Self {
            regular: resolve(&fonts.regular, StandardFont::Helvetica)?,
            bold: resolve(&fonts.bold, StandardFont::HelveticaBold)?,
        })
    }

    pub fn font(&self, role: FontRole) -> &ResolvedFont {
        match role {
            FontRole::Regular => &self.regular,
            FontRole::Bold => &self.bold,
        }
    }

    pub fn measure(&self, text: &str, role: FontRole, font_size: f64) -> f64 {
        self.font(role).measure(text, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_candidates_use_builtin() {
        let font = resolve(&[], StandardFont::HelveticaBold).unwrap();
        assert!(matches!(font, ResolvedFont::Standard(StandardFont::HelveticaBold)));
        assert_eq!(font.family(), "Helvetica-Bold");
    }

    #[test]
    fn test_missing_candidates_are_an_error() {
        let candidates = vec![
            FontSource::new("Cairo", "/nonexistent/Cairo-Regular.ttf"),
            FontSource::new("Amiri", "/nonexistent/Amiri-Regular.ttf"),
        ];
        match resolve(&candidates, StandardFont::Helvetica) {
            Err(FontError::Unavailable { tried }) => {
                assert_eq!(tried.len(), 2);
                assert!(tried[0].contains("Cairo-Regular.ttf"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let result = resolve(&[FontSource::new("Broken", &path)], StandardFont::Helvetica);
        assert!(matches!(result, Err(FontError::Unavailable { .. })));
    }

    #[test]
    fn test_from_bytes_reports_parse_error() {
        let err = CustomFont::from_bytes("Broken", vec![0; 16]).unwrap_err();
        assert!(matches!(err, FontError::Parse { ref family, .. } if family == "Broken"));
    }

    #[test]
    fn test_builtin_context_measures() {
        let ctx = FontContext::resolve(&FontSet::default()).unwrap();
        let regular = ctx.measure("Total", FontRole::Regular, 12.0);
        let bold = ctx.measure("Total", FontRole::Bold, 12.0);
        assert!(regular > 0.0);
        assert!(bold > regular);
    }
}
