//! # Style Sheets
//!
//! Everything visual about an invoice lives here: page geometry, fonts by
//! role, colors by role, column widths and QR parameters. The layout and
//! render stages read a [`StyleSheet`] and never hard-code a color.
//!
//! Shops used to keep one copy of the invoice code per look. Those looks
//! are now named presets of a single sheet.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use qrcode::EcLevel;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    #[default]
    Letter,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Which face of the font family a run is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontRole {
    #[default]
    Regular,
    Bold,
}

/// A TrueType file to try, in order, for one font role.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSource {
    pub family: String,
    pub path: PathBuf,
}

impl FontSource {
    pub fn new(family: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            family: family.to_string(),
            path: path.into(),
        }
    }
}

/// Ordered font candidates per role. Empty lists mean the built-in
/// Helvetica faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontSet {
    pub regular: Vec<FontSource>,
    pub bold: Vec<FontSource>,
}

impl FontSet {
    pub fn is_builtin(&self) -> bool {
        self.regular.is_empty() && self.bold.is_empty()
    }
}

/// Size, face and color of a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub font: FontRole,
    pub color: Color,
}

impl TextStyle {
    pub fn new(size: f64, font: FontRole, color: Color) -> Self {
        Self { size, font, color }
    }

    pub fn line_height(&self) -> f64 {
        self.size * 1.3
    }
}

/// Semantic role of free-standing text blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Footer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleStyle {
    pub background: Color,
    pub text: TextStyle,
    pub padding: f64,
}

/// Two-column label/value panels (customer details, totals summary).
#[derive(Debug, Clone, PartialEq)]
pub struct PanelStyle {
    pub label: TextStyle,
    pub value: TextStyle,
    /// Emphasized rows (grand total).
    pub emphasis: TextStyle,
    /// Background of the first row.
    pub highlight: Color,
    pub grid: Color,
    /// Label column width, value column width.
    pub columns: [f64; 2],
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub header_background: Color,
    pub header_text: TextStyle,
    pub cell: TextStyle,
    /// Alternating row backgrounds, starting with the first body row.
    pub row_backgrounds: [Color; 2],
    pub totals_background: Color,
    pub totals_text: TextStyle,
    pub grid: Color,
    /// Widths of name, quantity, unit price and line total, in that order.
    pub columns: [f64; 4],
    /// Draw the columns right to left (name column on the right).
    pub mirrored: bool,
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrStyle {
    pub error_correction: EcLevel,
    /// Pixels per QR module in the encoded image.
    pub module_px: u32,
    /// Quiet-zone width in modules.
    pub quiet_zone: u32,
    /// Drawn edge length in points.
    pub size: f64,
    pub caption: TextStyle,
}

/// The named looks available to shops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Royal,
    Emerald,
    Charcoal,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "royal" => Ok(Preset::Royal),
            "emerald" => Ok(Preset::Emerald),
            "charcoal" => Ok(Preset::Charcoal),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preset::Royal => "royal",
            Preset::Emerald => "emerald",
            Preset::Charcoal => "charcoal",
        })
    }
}

/// Complete visual configuration for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    pub preset: Preset,
    pub page_size: PageSize,
    pub margins: Edges,
    pub fonts: FontSet,
    pub title: TitleStyle,
    pub panel: PanelStyle,
    pub table: TableStyle,
    pub qr: QrStyle,
    pub footer: TextStyle,
    /// Vertical space between blocks.
    pub block_gap: f64,
}

struct Palette {
    primary: &'static str,
    accent: &'static str,
    value: &'static str,
    highlight: &'static str,
    grid: &'static str,
    stripe: &'static str,
    muted: &'static str,
}

const INCH: f64 = 72.0;

impl StyleSheet {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Royal => Self::royal(),
            Preset::Emerald => Self::emerald(),
            Preset::Charcoal => Self::charcoal(),
        }
    }

    /// Navy title bar, item name in the leftmost column.
    pub fn royal() -> Self {
        Self::build(
            Preset::Royal,
            &Palette {
                primary: "#0d47a1",
                accent: "#1565c0",
                value: "#424242",
                highlight: "#e3f2fd",
                grid: "#b0bec5",
                stripe: "#f5f5f5",
                muted: "#607d8b",
            },
            ("Cairo", "Cairo-Regular.ttf", "Cairo-Bold.ttf"),
            false,
            EcLevel::M,
        )
    }

    /// Green palette with the table mirrored for right-to-left reading.
    pub fn emerald() -> Self {
        Self::build(
            Preset::Emerald,
            &Palette {
                primary: "#1b5e20",
                accent: "#2e7d32",
                value: "#33691e",
                highlight: "#e8f5e9",
                grid: "#a5d6a7",
                stripe: "#f1f8e9",
                muted: "#558b2f",
            },
            ("Amiri", "Amiri-Regular.ttf", "Amiri-Bold.ttf"),
            true,
            EcLevel::Q,
        )
    }

    /// Dark grey palette, mirrored table, high error correction.
    pub fn charcoal() -> Self {
        Self::build(
            Preset::Charcoal,
            &Palette {
                primary: "#263238",
                accent: "#37474f",
                value: "#212121",
                highlight: "#eceff1",
                grid: "#90a4ae",
                stripe: "#fafafa",
                muted: "#455a64",
            },
            (
                "Noto Naskh Arabic",
                "NotoNaskhArabic-Regular.ttf",
                "NotoNaskhArabic-Bold.ttf",
            ),
            true,
            EcLevel::H,
        )
    }

    fn build(
        preset: Preset,
        palette: &Palette,
        (family, regular, bold): (&str, &str, &str),
        mirrored: bool,
        error_correction: EcLevel,
    ) -> Self {
        let primary = Color::hex(palette.primary);
        let value = Color::hex(palette.value);
        let grid = Color::hex(palette.grid);
        let muted = Color::hex(palette.muted);

        Self {
            preset,
            page_size: PageSize::Letter,
            margins: Edges::uniform(30.0),
            fonts: FontSet {
                regular: vec![FontSource::new(family, Path::new("fonts").join(regular))],
                bold: vec![FontSource::new(family, Path::new("fonts").join(bold))],
            },
            title: TitleStyle {
                background: primary,
                text: TextStyle::new(20.0, FontRole::Bold, Color::WHITE),
                padding: 10.0,
            },
            panel: PanelStyle {
                label: TextStyle::new(12.0, FontRole::Bold, primary),
                value: TextStyle::new(12.0, FontRole::Regular, value),
                emphasis: TextStyle::new(14.0, FontRole::Bold, primary),
                highlight: Color::hex(palette.highlight),
                grid,
                columns: [2.0 * INCH, 5.0 * INCH],
                padding: 6.0,
            },
            table: TableStyle {
                header_background: Color::hex(palette.accent),
                header_text: TextStyle::new(12.0, FontRole::Bold, Color::WHITE),
                cell: TextStyle::new(11.0, FontRole::Regular, value),
                row_backgrounds: [Color::WHITE, Color::hex(palette.stripe)],
                totals_background: Color::hex(palette.highlight),
                totals_text: TextStyle::new(12.0, FontRole::Bold, primary),
                grid,
                columns: [3.0 * INCH, 1.0 * INCH, 1.5 * INCH, 1.5 * INCH],
                mirrored,
                padding: 6.0,
            },
            qr: QrStyle {
                error_correction,
                module_px: 10,
                quiet_zone: 4,
                size: 2.0 * INCH,
                caption: TextStyle::new(10.0, FontRole::Bold, primary),
            },
            footer: TextStyle::new(12.0, FontRole::Bold, muted),
            block_gap: 14.0,
        }
    }

    /// Same look, with every font candidate dropped so the built-in faces
    /// are used.
    pub fn with_builtin_fonts(&self) -> Self {
        Self {
            fonts: FontSet::default(),
            ..self.clone()
        }
    }

    /// Look the preset's font files up in `dir` instead of `./fonts`.
    pub fn with_font_dir(mut self, dir: &Path) -> Self {
        for source in self.fonts.regular.iter_mut().chain(self.fonts.bold.iter_mut()) {
            if let Some(name) = source.path.file_name() {
                source.path = dir.join(name);
            }
        }
        self
    }

    /// Width available between the left and right margins.
    pub fn content_width(&self) -> f64 {
        self.page_size.dimensions().0 - self.margins.horizontal()
    }

    pub fn text_style(&self, role: TextRole) -> TextStyle {
        match role {
            TextRole::Footer => self.footer,
        }
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::royal()
    }
}
