//! Structured error types for the invoice pipeline.
//!
//! Each stage has its own error so callers can tell a bad order apart from
//! a rendering or delivery problem. [`FaturaError`] unifies them for the
//! public pipeline API.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed order input. Raised before any layout or rendering starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidOrderError {
    #[error("order has no items")]
    EmptyItems,
    #[error("item '{item}' has quantity {quantity}; quantity must be at least 1")]
    NonPositiveQuantity { item: String, quantity: i64 },
    #[error("item '{item}' has negative unit price {price}")]
    NegativePrice { item: String, price: Decimal },
    #[error("item '{0}' appears more than once")]
    DuplicateItem(String),
    #[error("coordinate ({lat}, {lng}) is out of range")]
    CoordinateOutOfRange { lat: f64, lng: f64 },
    #[error("totals overflow at item '{item}'")]
    AmountOverflow { item: String },
}

/// The shaping pass could not process a string. Never surfaced: callers
/// fall back to the unshaped text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapingError {
    #[error("line contains {0} bidi paragraphs, expected one")]
    UnexpectedParagraphs(usize),
    #[error("bidi levels cover {levels} of {chars} characters")]
    LevelMismatch { levels: usize, chars: usize },
}

/// A font resource could not be resolved or embedded.
#[derive(Debug, Clone, Error)]
pub enum FontError {
    #[error("none of the font candidates could be loaded: {}", .tried.join(", "))]
    Unavailable { tried: Vec<String> },
    #[error("failed to parse font '{family}': {reason}")]
    Parse { family: String, reason: String },
}

/// A failure inside the page sink while rendering a document.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("font error: {0}")]
    Font(#[from] FontError),
    #[error("image '{}' could not be embedded: {reason}", .path.display())]
    Image { path: PathBuf, reason: String },
}

/// QR encoding failure. Always non-fatal: the entry is omitted.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("qr encoding failed: {0}")]
    Encode(String),
    #[error("qr image could not be written: {0}")]
    Image(String),
    #[error("qr encoding timed out after {0:?}")]
    Timeout(Duration),
    #[error("qr workspace i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// A single call to the delivery transport failed.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(String),
    #[error("endpoint rejected the request ({status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Delivery of one of the two artifacts failed. Reported, never retried.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("summary message was not delivered: {0}")]
    Message(TransportError),
    #[error("invoice document was not delivered: {0}")]
    Document(TransportError),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("unknown style preset '{0}' (expected royal, emerald or charcoal)")]
    UnknownPreset(String),
}

/// The unified error type returned by the public pipeline functions.
#[derive(Debug, Error)]
pub enum FaturaError {
    /// Order JSON failed to parse.
    #[error("failed to parse order: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] InvalidOrderError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("workspace i/o: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for FaturaError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the order schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FaturaError::Parse { source: e, hint }
    }
}
