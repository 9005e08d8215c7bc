//! # Text Shaping
//!
//! Prepares strings for drawing with a renderer that knows nothing about
//! Arabic: letters are replaced by contextual presentation forms and each
//! line is reordered into visual order. The result is drawn left to right,
//! glyph by glyph.
//!
//! Shaping is not idempotent. Every string is shaped exactly once, right
//! before it is handed to a page sink.

pub mod bidi;
pub mod joining;

use unicode_bidi::{bidi_class, BidiClass};
use unicode_linebreak::{linebreaks, BreakOpportunity};
use unicode_script::{Script, UnicodeScript};

/// Shape `text` for display. Every paragraph separator (bidi class B:
/// `\n`, `\r`, U+0085, U+2029, ...) ends a line; lines are shaped
/// independently and the separators are kept in place.
///
/// Never fails: if a line cannot be reordered the original, unshaped line
/// is used and a warning is logged.
pub fn shape(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if bidi_class(ch) == BidiClass::B {
            out.push_str(&shape_line(&text[start..i]));
            out.push(ch);
            start = i + ch.len_utf8();
        }
    }
    out.push_str(&shape_line(&text[start..]));
    out
}

/// [`shape`] for optional fields; `None` maps to the empty string.
pub fn shape_opt(text: Option<&str>) -> String {
    text.map(shape).unwrap_or_default()
}

fn shape_line(line: &str) -> String {
    if !is_rtl(line) {
        return line.to_string();
    }

    let joined = joining::join(line);
    match bidi::reorder_visual(&joined) {
        Ok(visual) => visual,
        Err(e) => {
            tracing::warn!(error = %e, "text shaping failed, using unshaped text");
            line.to_string()
        }
    }
}

/// True if `text` contains any character from a right-to-left script or an
/// explicit RTL control.
pub fn is_rtl(text: &str) -> bool {
    text.chars().any(|ch| {
        matches!(
            ch.script(),
            Script::Arabic
                | Script::Hebrew
                | Script::Syriac
                | Script::Thaana
                | Script::Nko
                | Script::Samaritan
                | Script::Mandaic
        ) || matches!(ch, '\u{200F}' | '\u{202B}' | '\u{202E}' | '\u{2067}')
    })
}

/// Break already-shaped (visual order) text into lines no wider than
/// `max_width`, using UAX#14 opportunities.
///
/// For RTL text the logical start is at the right end of the visual string,
/// so lines are filled from the right. A single segment wider than
/// `max_width` gets a line of its own.
pub fn wrap_visual<F>(visual: &str, rtl: bool, max_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    if visual.is_empty() || measure(visual) <= max_width {
        return vec![visual.to_string()];
    }

    let mut segments = Vec::new();
    let mut start = 0;
    for (offset, opportunity) in linebreaks(visual) {
        if offset > start {
            segments.push(&visual[start..offset]);
            start = offset;
        }
        if opportunity == BreakOpportunity::Mandatory && offset == visual.len() {
            break;
        }
    }
    if start < visual.len() {
        segments.push(&visual[start..]);
    }
    if rtl {
        segments.reverse();
    }

    let assemble = |segs: &[&str]| -> String {
        if rtl {
            segs.iter().rev().copied().collect::<String>().trim().to_string()
        } else {
            segs.concat().trim().to_string()
        }
    };

    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for segment in segments {
        current.push(segment);
        if current.len() > 1 && measure(&assemble(&current)) > max_width {
            current.pop();
            lines.push(assemble(&current));
            current = vec![segment];
        }
    }
    if !current.is_empty() {
        lines.push(assemble(&current));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars_width(s: &str) -> f64 {
        s.chars().count() as f64
    }

    #[test]
    fn test_ltr_is_identity() {
        for s in ["Hello", "Total: 3,500", "07701234567", "a\nb"] {
            assert_eq!(shape(s), s);
        }
    }

    #[test]
    fn test_empty_and_none() {
        assert_eq!(shape(""), "");
        assert_eq!(shape_opt(None), "");
        assert_eq!(shape_opt(Some("x")), "x");
    }

    #[test]
    fn test_currency_suffix_number_stays_ltr() {
        // dal and ain take isolated forms; the number keeps its digit order.
        assert_eq!(shape("3,500 د.ع"), "\u{FEC9}.\u{FEA9} 3,500");
    }

    #[test]
    fn test_word_is_joined_and_reversed() {
        // logical: meem-hah-meem-dal
        let shaped: Vec<u32> = shape("محمد").chars().map(|c| c as u32).collect();
        assert_eq!(shaped, vec![0xFEAA, 0xFEE4, 0xFEA4, 0xFEE3]);
    }

    #[test]
    fn test_lines_shaped_independently() {
        let shaped = shape("ب\nHello");
        assert_eq!(shaped, "\u{FE8F}\nHello");
    }

    #[test]
    fn test_every_paragraph_separator_splits_lines() {
        // alef-seen-meem: meem final, seen initial, alef isolated
        let first = "\u{FEE2}\u{FEB3}\u{FE8D}";
        for sep in ['\r', '\u{85}', '\u{2029}'] {
            let shaped = shape(&format!("اسم{sep}علي"));
            assert_eq!(shaped, format!("{first}{sep}{}", shape("علي")));
        }
        assert_eq!(shape("اسم\r\nعلي"), format!("{first}\r\n{}", shape("علي")));
    }

    #[test]
    fn test_is_rtl() {
        assert!(is_rtl("سعر"));
        assert!(is_rtl("Total د.ع"));
        assert!(!is_rtl("Total"));
        assert!(!is_rtl(""));
    }

    #[test]
    fn test_wrap_ltr_fills_from_left() {
        let lines = wrap_visual("one two three", false, 8.0, chars_width);
        assert_eq!(lines, vec!["one two", "three"]);
    }

    #[test]
    fn test_wrap_rtl_fills_from_right() {
        // Visual "C B A" reads A, B, C from the right.
        let lines = wrap_visual("ccc bbb aaa", true, 8.0, chars_width);
        assert_eq!(lines, vec!["bbb aaa", "ccc"]);
    }

    #[test]
    fn test_wrap_fits_single_line() {
        assert_eq!(wrap_visual("short", false, 100.0, chars_width), vec!["short"]);
    }

    #[test]
    fn test_wrap_oversized_word_kept_whole() {
        let lines = wrap_visual("abcdefghij x", false, 4.0, chars_width);
        assert_eq!(lines, vec!["abcdefghij", "x"]);
    }
}
