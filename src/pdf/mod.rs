//! # PDF Page Sink
//!
//! The production [`PageSink`]: records draw calls into per-page content
//! streams and serializes a PDF 1.7 file on [`PageSink::finish`].
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Built-in Helvetica faces use simple Type1 references with WinAnsi
//! encoding. Resolved TrueType fonts are embedded whole as CIDFontType2 with
//! Identity-H encoding, producing 5 PDF objects per font: FontFile2,
//! FontDescriptor, CIDFont, ToUnicode CMap, and the root Type0 dictionary.
//! Arabic text reaches the sink as presentation-form codepoints, which the
//! font's cmap maps straight to glyphs.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::path::PathBuf;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::{FontError, RenderError};
use crate::font::{CustomFont, FontContext, ResolvedFont};
use crate::image_loader::{self, ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::ImageRef;
use crate::render::{PageSink, Rect};
use crate::style::{Color, FontRole, StyleSheet, TextStyle};

const FONT_ROLES: [FontRole; 2] = [FontRole::Regular, FontRole::Bold];

/// Renders into an in-memory PDF document.
pub struct PdfSink {
    page_width: f64,
    page_height: f64,
    fonts: FontContext,
    title: Option<String>,
    /// Uncompressed content stream per page.
    pages: Vec<String>,
    /// Image indices (`/ImN`) referenced by each page.
    page_images: Vec<Vec<usize>>,
    images: Vec<LoadedImage>,
    image_index: HashMap<PathBuf, usize>,
    /// Characters drawn per font role, for widths and ToUnicode.
    used_chars: HashMap<FontRole, HashSet<char>>,
}

/// Tracks allocated PDF objects during serialization.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        Self {
            objects: (0..3).map(|_| PdfObject { data: Vec::new() }).collect(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_extra: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {} /Filter /FlateDecode{} >>\nstream\n",
            compressed.len(),
            dict_extra
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfSink {
    /// Open a one-page document sized by `style`, resolving its fonts.
    pub fn new(style: &StyleSheet) -> Result<Self, RenderError> {
        let fonts = FontContext::resolve(&style.fonts)?;
        let (page_width, page_height) = style.page_size.dimensions();
        Ok(Self {
            page_width,
            page_height,
            fonts,
            title: None,
            pages: vec![String::new()],
            page_images: vec![Vec::new()],
            images: Vec::new(),
            image_index: HashMap::new(),
            used_chars: HashMap::new(),
        })
    }

    /// Set the document title written to the Info dictionary.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn stream(&mut self) -> &mut String {
        if self.pages.is_empty() {
            self.pages.push(String::new());
            self.page_images.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn encode_text(&self, text: &str, role: FontRole) -> String {
        match self.fonts.font(role) {
            ResolvedFont::Custom(font) => {
                let mut hex = String::from("<");
                for ch in text.chars() {
                    let gid = font.metrics.glyph_ids.get(&ch).copied().unwrap_or(0);
                    let _ = write!(hex, "{:04X}", gid);
                }
                hex.push('>');
                hex
            }
            ResolvedFont::Standard(_) => {
                let mut text_str = String::from("(");
                for ch in text.chars() {
                    let b = unicode_to_winansi(ch).unwrap_or(b'?');
                    match b {
                        b'\\' => text_str.push_str("\\\\"),
                        b'(' => text_str.push_str("\\("),
                        b')' => text_str.push_str("\\)"),
                        0x20..=0x7E => text_str.push(b as char),
                        _ => {
                            let _ = write!(text_str, "\\{:03o}", b);
                        }
                    }
                }
                text_str.push(')');
                text_str
            }
        }
    }

    fn load_image(&mut self, image: &ImageRef) -> Result<usize, RenderError> {
        if let Some(&idx) = self.image_index.get(&image.path) {
            return Ok(idx);
        }
        let loaded = image_loader::load_image(&image.path)?;
        let idx = self.images.len();
        self.images.push(loaded);
        self.image_index.insert(image.path.clone(), idx);
        Ok(idx)
    }

    fn write_font(&self, builder: &mut PdfBuilder, role: FontRole) -> Result<usize, FontError> {
        match self.fonts.font(role) {
            ResolvedFont::Standard(std_font) => Ok(builder.push(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    std_font.pdf_name()
                )
                .into_bytes(),
            )),
            ResolvedFont::Custom(font) => {
                let empty = HashSet::new();
                let used = self.used_chars.get(&role).unwrap_or(&empty);
                write_custom_font_objects(builder, font, role, used)
            }
        }
    }
}

impl PageSink for PdfSink {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        self.fonts.measure(text, style.font, style.size)
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        self.used_chars.entry(style.font).or_default().extend(text.chars());

        let encoded = self.encode_text(text, style.font);
        let font_name = font_resource_name(style.font);
        let pdf_y = self.page_height - y;
        let color = style.color;
        let _ = write!(
            self.stream(),
            "BT\n{:.3} {:.3} {:.3} rg\n/{} {:.1} Tf\n{:.2} {:.2} Td\n{} Tj\nET\n",
            color.r, color.g, color.b, font_name, style.size, x, pdf_y, encoded
        );
        Ok(())
    }

    fn draw_rect(&mut self, rect: Rect, fill: Option<Color>, stroke: Option<Color>) -> Result<(), RenderError> {
        let y = self.page_height - rect.y - rect.height;
        let op = match (fill, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => return Ok(()),
        };

        let stream = self.stream();
        stream.push_str("q\n");
        if let Some(bg) = fill {
            let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", bg.r, bg.g, bg.b);
        }
        if let Some(line) = stroke {
            let _ = writeln!(stream, "{:.3} {:.3} {:.3} RG\n0.5 w", line.r, line.g, line.b);
        }
        let _ = write!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} re\n{}\nQ\n",
            rect.x, y, rect.width, rect.height, op
        );
        Ok(())
    }

    fn draw_image(&mut self, rect: Rect, image: &ImageRef) -> Result<(), RenderError> {
        let idx = self.load_image(image)?;
        let y = self.page_height - rect.y - rect.height;
        let _ = write!(
            self.stream(),
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            rect.width, rect.height, rect.x, y, idx
        );
        if let Some(page) = self.page_images.last_mut() {
            if !page.contains(&idx) {
                page.push(idx);
            }
        }
        Ok(())
    }

    fn break_page(&mut self) -> Result<(), RenderError> {
        self.pages.push(String::new());
        self.page_images.push(Vec::new());
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, RenderError> {
        let mut builder = PdfBuilder::new();

        let mut font_ids = Vec::with_capacity(FONT_ROLES.len());
        for role in FONT_ROLES {
            font_ids.push(self.write_font(&mut builder, role)?);
        }
        let font_resources = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let image_ids: Vec<usize> = self
            .images
            .iter()
            .map(|image| write_image_xobject(&mut builder, image))
            .collect();

        let mut page_obj_ids = Vec::with_capacity(self.pages.len());
        for (page_idx, content) in self.pages.iter().enumerate() {
            let content_obj_id = builder.push_stream("", content.as_bytes());

            let xobjects = self.page_images[page_idx]
                .iter()
                .map(|&idx| format!("/Im{} {} 0 R", idx, image_ids[idx]))
                .collect::<Vec<_>>()
                .join(" ");
            let resources = if xobjects.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!("/Font << {} >> /XObject << {} >>", font_resources, xobjects)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                self.page_width, self.page_height, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = self.title {
            let _ = write!(info, "/Title {} ", pdf_text_string(title));
        }
        info.push_str("/Producer (fatura) /Creator (fatura) >>");
        let info_obj_id = builder.push(info.into_bytes());

        Ok(serialize(&builder, info_obj_id))
    }
}

fn font_resource_name(role: FontRole) -> &'static str {
    match role {
        FontRole::Regular => "F0",
        FontRole::Bold => "F1",
    }
}

/// Write a single image as one or two XObject PDF objects.
/// Returns the main XObject ID.
fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg { data, color_space } => {
            let color_space_str = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
            };
            let mut obj_data: Vec<u8> = Vec::new();
            let _ = write!(
                obj_data,
                "<< /Type /XObject /Subtype /Image \
                 /Width {} /Height {} \
                 /ColorSpace {} \
                 /BitsPerComponent 8 \
                 /Filter /DCTDecode \
                 /Length {} >>\nstream\n",
                image.width_px,
                image.height_px,
                color_space_str,
                data.len()
            );
            obj_data.extend_from_slice(data);
            obj_data.extend_from_slice(b"\nendstream");
            builder.push(obj_data)
        }

        ImagePixelData::Decoded { rgb, alpha } => {
            let dims = format!(
                " /Type /XObject /Subtype /Image /Width {} /Height {} /BitsPerComponent 8",
                image.width_px, image.height_px
            );
            let smask_ref = alpha
                .as_ref()
                .map(|alpha_data| {
                    let id = builder.push_stream(&format!("{dims} /ColorSpace /DeviceGray"), alpha_data);
                    format!(" /SMask {} 0 R", id)
                })
                .unwrap_or_default();
            builder.push_stream(&format!("{dims} /ColorSpace /DeviceRGB{smask_ref}"), rgb)
        }
    }
}

/// Write the 5 CIDFont PDF objects for an embedded TrueType font.
/// Returns the object ID of the Type0 root font dictionary.
fn write_custom_font_objects(
    builder: &mut PdfBuilder,
    font: &CustomFont,
    role: FontRole,
    used_chars: &HashSet<char>,
) -> Result<usize, FontError> {
    let face = ttf_parser::Face::parse(&font.data, 0).map_err(|e| FontError::Parse {
        family: font.family.clone(),
        reason: e.to_string(),
    })?;

    let metrics = &font.metrics;
    let units_per_em = metrics.units_per_em;
    let scale = 1000.0 / units_per_em as f64;

    let char_to_gid: HashMap<char, u16> = used_chars
        .iter()
        .filter_map(|ch| metrics.glyph_ids.get(ch).map(|&gid| (*ch, gid)))
        .collect();

    let pdf_font_name = sanitize_font_name(&font.family, role);

    // 1. FontFile2 stream, the whole TTF
    let fontfile2_id = builder.push_stream(&format!(" /Length1 {}", font.data.len()), &font.data);

    // 2. FontDescriptor
    let bbox = face.global_bounding_box();
    let bbox_str = format!(
        "[{} {} {} {}]",
        (bbox.x_min as f64 * scale) as i32,
        (bbox.y_min as f64 * scale) as i32,
        (bbox.x_max as f64 * scale) as i32,
        (bbox.y_max as f64 * scale) as i32,
    );
    let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
    let stem_v = match role {
        FontRole::Bold => 120,
        FontRole::Regular => 80,
    };
    let font_descriptor_id = builder.push(
        format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox {} /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            bbox_str,
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            stem_v,
            fontfile2_id,
        )
        .into_bytes(),
    );

    // 3. CIDFont dictionary (DescendantFont)
    let w_array = build_w_array(&char_to_gid, &face, units_per_em);
    let default_width = face
        .glyph_hor_advance(ttf_parser::GlyphId(0))
        .map(|adv| (adv as f64 * scale) as u32)
        .unwrap_or(1000);
    let cidfont_id = builder.push(
        format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        )
        .into_bytes(),
    );

    // 4. ToUnicode CMap
    let cmap_content = build_tounicode_cmap(&char_to_gid, &pdf_font_name);
    let tounicode_id = builder.push_stream("", cmap_content.as_bytes());

    // 5. Type0 font dictionary (the root, referenced by /Resources)
    Ok(builder.push(
        format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        )
        .into_bytes(),
    ))
}

/// Build the /W array for per-glyph widths in CIDFont.
/// Format: [gid [width] gid [width] ...]
fn build_w_array(char_to_gid: &HashMap<char, u16>, face: &ttf_parser::Face, units_per_em: u16) -> String {
    let scale = 1000.0 / units_per_em as f64;

    let mut gids: Vec<u16> = char_to_gid.values().copied().collect::<HashSet<_>>().into_iter().collect();
    gids.sort_unstable();

    let mut result = String::from("[");
    for gid in gids {
        let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
        let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale) as u32);
    }
    result.push_str(" ]");
    result
}

/// Build a ToUnicode CMap for text extraction/copy-paste support.
fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
    let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid.iter().map(|(&ch, &gid)| (gid, ch as u32)).collect();
    gid_to_unicode.sort_unstable();

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    // beginbfchar blocks hold at most 100 entries
    for chunk in gid_to_unicode.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, unicode) in chunk {
            let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Sanitize a font name for use as a PDF name object.
fn sanitize_font_name(family: &str, role: FontRole) -> String {
    let mut name: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        name = "CustomFont".to_string();
    }
    if role == FontRole::Bold {
        name.push_str("-Bold");
    }
    name
}

/// A PDF text string: literal for ASCII, UTF-16BE hex with BOM otherwise.
fn pdf_text_string(s: &str) -> String {
    if s.is_ascii() {
        format!("({})", escape_pdf_string(s))
    } else {
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252. Most codepoints in
/// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
/// contains special mappings for quotes, bullets and dashes.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x00D7 => Some(0xD7), // Multiplication sign
        _ => None,
    }
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_obj_id,
        xref_offset
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FontSource, StyleSheet};
    use std::io::Cursor;

    fn builtin_sink() -> PdfSink {
        PdfSink::new(&StyleSheet::royal().with_builtin_fonts()).unwrap()
    }

    fn contains(bytes: &[u8], needle: &str) -> bool {
        bytes.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let mut sink = builtin_sink();
        let bytes = sink.finish().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, "%%EOF"));
        assert!(contains(&bytes, "xref"));
        assert!(contains(&bytes, "trailer"));
        assert!(contains(&bytes, "/Count 1"));
    }

    #[test]
    fn test_page_breaks_add_pages() {
        let mut sink = builtin_sink();
        sink.break_page().unwrap();
        sink.break_page().unwrap();
        assert_eq!(sink.page_count(), 3);
        let bytes = sink.finish().unwrap();
        assert!(contains(&bytes, "/Count 3"));
        assert!(contains(&bytes, "/MediaBox [0 0 612.00 792.00]"));
    }

    #[test]
    fn test_builtin_fonts_are_type1() {
        let mut sink = builtin_sink();
        let style = TextStyle::new(12.0, FontRole::Bold, Color::BLACK);
        sink.draw_text(30.0, 50.0, "Total", &style).unwrap();
        let bytes = sink.finish().unwrap();

        assert!(contains(&bytes, "/BaseFont /Helvetica "));
        assert!(contains(&bytes, "/BaseFont /Helvetica-Bold"));
        assert!(contains(&bytes, "/Type1"));
        assert!(!contains(&bytes, "CIDFontType2"));
    }

    #[test]
    fn test_text_operators_flip_y() {
        let mut sink = builtin_sink();
        let style = TextStyle::new(12.0, FontRole::Bold, Color::BLACK);
        sink.draw_text(30.0, 50.0, "Total (5%)", &style).unwrap();
        let stream = &sink.pages[0];
        assert!(stream.contains("/F1 12.0 Tf"));
        assert!(stream.contains("30.00 742.00 Td"));
        assert!(stream.contains("(Total \\(5%\\)) Tj"));
    }

    #[test]
    fn test_non_latin_text_in_builtin_font_is_replaced() {
        let mut sink = builtin_sink();
        let style = TextStyle::new(10.0, FontRole::Regular, Color::BLACK);
        sink.draw_text(0.0, 10.0, "\u{FEE3}1", &style).unwrap();
        assert!(sink.pages[0].contains("(?1) Tj"));
    }

    #[test]
    fn test_rect_fill_and_stroke() {
        let mut sink = builtin_sink();
        sink.draw_rect(Rect::new(10.0, 20.0, 100.0, 30.0), Some(Color::WHITE), Some(Color::BLACK))
            .unwrap();
        let stream = &sink.pages[0];
        assert!(stream.contains("10.00 742.00 100.00 30.00 re\nB"));
        assert!(stream.contains("1.000 1.000 1.000 rg"));
    }

    #[test]
    fn test_image_embedded_once_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr-0.png");
        let img = image::GrayImage::from_fn(4, 4, |x, y| image::Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        std::fs::write(&path, buf.into_inner()).unwrap();

        let mut sink = builtin_sink();
        let image = ImageRef { path };
        sink.draw_image(Rect::new(0.0, 0.0, 144.0, 144.0), &image).unwrap();
        sink.break_page().unwrap();
        sink.draw_image(Rect::new(0.0, 0.0, 144.0, 144.0), &image).unwrap();
        assert_eq!(sink.images.len(), 1);
        assert!(sink.pages[1].contains("/Im0 Do"));

        let bytes = sink.finish().unwrap();
        assert!(contains(&bytes, "/Subtype /Image"));
        assert!(contains(&bytes, "/XObject << /Im0"));
    }

    #[test]
    fn test_missing_image_is_a_render_error() {
        let mut sink = builtin_sink();
        let err = sink
            .draw_image(
                Rect::new(0.0, 0.0, 10.0, 10.0),
                &ImageRef {
                    path: PathBuf::from("/nonexistent/qr.png"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }

    #[test]
    fn test_unloadable_font_is_a_font_error() {
        let mut style = StyleSheet::royal();
        style.fonts.regular = vec![FontSource::new("Cairo", "/nonexistent/Cairo.ttf")];
        assert!(matches!(PdfSink::new(&style), Err(RenderError::Font(_))));
    }

    #[test]
    fn test_arabic_title_is_utf16() {
        assert_eq!(pdf_text_string("Invoice"), "(Invoice)");
        assert_eq!(pdf_text_string("ب"), "<FEFF0628>");
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("Cairo", FontRole::Regular), "Cairo");
        assert_eq!(sanitize_font_name("Cairo", FontRole::Bold), "Cairo-Bold");
        assert_eq!(sanitize_font_name("Noto Naskh Arabic", FontRole::Regular), "NotoNaskhArabic");
        assert_eq!(sanitize_font_name("خط", FontRole::Regular), "CustomFont");
    }

    #[test]
    fn test_tounicode_cmap_format() {
        let mut char_to_gid = HashMap::new();
        char_to_gid.insert('A', 36u16);
        char_to_gid.insert('\u{FEE3}', 400u16);

        let cmap = build_tounicode_cmap(&char_to_gid, "Cairo");

        assert!(cmap.contains("begincmap"));
        assert!(cmap.contains("1 begincodespacerange\n<0000> <FFFF>"));
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0190> <FEE3>"));
        assert!(cmap.contains("/CMapName /Cairo-UTF16 def"));
    }

    #[test]
    fn test_winansi_mapping() {
        assert_eq!(unicode_to_winansi('A'), Some(b'A'));
        assert_eq!(unicode_to_winansi('é'), Some(0xE9));
        assert_eq!(unicode_to_winansi('€'), Some(0x80));
        assert_eq!(unicode_to_winansi('\u{0628}'), None);
    }
}
