//! # BiDi Reordering
//!
//! Turns one logical line into visual order using UAX#9 via `unicode-bidi`.
//! The paragraph level comes from the first strong character, so a line
//! that starts with a price but contains Arabic is still treated as RTL.
//!
//! Reordering is rule L2 applied over chars, followed by mirroring of
//! paired punctuation inside RTL runs (rule L4).

use unicode_bidi::{BidiInfo, Level};

use crate::error::ShapingError;

/// Reorder a single line (no paragraph separators) into visual order.
pub fn reorder_visual(line: &str) -> Result<String, ShapingError> {
    if line.is_empty() {
        return Ok(String::new());
    }

    let bidi_info = BidiInfo::new(line, None);
    if bidi_info.paragraphs.len() != 1 {
        return Err(ShapingError::UnexpectedParagraphs(bidi_info.paragraphs.len()));
    }
    let paragraph = &bidi_info.paragraphs[0];

    // Per-char levels with the line-level rules (L1) applied, so trailing
    // whitespace settles at the paragraph level.
    let levels = bidi_info.reordered_levels_per_char(paragraph, paragraph.range.clone());

    let mut chars: Vec<char> = line.chars().collect();
    if levels.len() != chars.len() {
        return Err(ShapingError::LevelMismatch {
            levels: levels.len(),
            chars: chars.len(),
        });
    }

    for (ch, level) in chars.iter_mut().zip(&levels) {
        if level.is_rtl() {
            *ch = mirror(*ch);
        }
    }

    reorder_by_levels(&mut chars, &levels);
    Ok(chars.into_iter().collect())
}

/// Rule L2: from the highest level down to the lowest odd level, reverse
/// every contiguous run at that level or higher.
fn reorder_by_levels<T>(items: &mut [T], levels: &[Level]) {
    if items.is_empty() || levels.is_empty() {
        return;
    }

    let min_level = levels.iter().copied().min().unwrap_or(Level::ltr());
    let max_level = levels.iter().copied().max().unwrap_or(Level::ltr());

    if max_level == Level::ltr() {
        return;
    }

    let min_odd = if min_level.is_rtl() {
        min_level
    } else {
        Level::rtl()
    };

    let level_at = |i: usize| levels.get(i).copied().unwrap_or(Level::ltr());

    let mut current_level = max_level;
    while current_level >= min_odd {
        let mut i = 0;
        while i < items.len() {
            if level_at(i) >= current_level {
                let start = i;
                while i < items.len() && level_at(i) >= current_level {
                    i += 1;
                }
                items[start..i].reverse();
            } else {
                i += 1;
            }
        }
        if current_level.number() == 0 {
            break;
        }
        current_level = Level::new(current_level.number() - 1).unwrap_or(Level::ltr());
    }
}

/// Bidi_Mirrored glyph pairs that occur in invoice text.
fn mirror(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '‹' => '›',
        '›' => '‹',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ltr_unchanged() {
        assert_eq!(reorder_visual("Total: 3,500").unwrap(), "Total: 3,500");
    }

    #[test]
    fn test_pure_rtl_reversed() {
        assert_eq!(reorder_visual("ابت").unwrap(), "تبا");
    }

    #[test]
    fn test_numbers_stay_ltr_inside_rtl() {
        // Paragraph is RTL (first strong char is Arabic); digits keep their order.
        assert_eq!(reorder_visual("3,500 د.ع").unwrap(), "ع.د 3,500");
        assert_eq!(reorder_visual("سعر 120").unwrap(), "120 رعس");
    }

    #[test]
    fn test_latin_run_inside_rtl() {
        assert_eq!(reorder_visual("اب cd تث").unwrap(), "ثت cd با");
    }

    #[test]
    fn test_brackets_mirrored_in_rtl() {
        assert_eq!(reorder_visual("ا(ب)").unwrap(), "(ب)ا");
    }

    #[test]
    fn test_multiple_paragraphs_rejected() {
        assert_eq!(
            reorder_visual("اب\u{2029}تث"),
            Err(ShapingError::UnexpectedParagraphs(2))
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(reorder_visual("").unwrap(), "");
    }
}
