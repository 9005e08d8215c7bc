//! # Arabic Contextual Joining
//!
//! Replaces Arabic letters with their positional presentation forms
//! (isolated, final, initial, medial) from the Arabic Presentation Forms
//! blocks, and fuses lam + alef into the mandatory ligature.
//!
//! The output is still in logical order. It is meant for drawing with fonts
//! that map presentation-form codepoints directly, with no OpenType
//! shaping step in between.

/// How a character participates in cursive joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Joins on both sides (beh, seen, lam, ...).
    Dual,
    /// Joins only to the preceding letter (alef, dal, reh, waw, ...).
    Right,
    /// Forces joining on both sides without a form of its own (tatweel, ZWJ).
    Causing,
    /// Combining marks; skipped when looking for neighbours.
    Transparent,
    /// Breaks the chain.
    NonJoining,
}

impl Joining {
    fn connects_forward(self) -> bool {
        matches!(self, Joining::Dual | Joining::Causing)
    }

    fn connects_backward(self) -> bool {
        matches!(self, Joining::Dual | Joining::Right | Joining::Causing)
    }
}

const LAM: char = '\u{0644}';
const HAMZA: char = '\u{0621}';
const HAMZA_ISOLATED: char = '\u{FE80}';

/// (letter, joining type, isolated form). The remaining forms follow the
/// isolated one contiguously: final = +1, initial = +2, medial = +3.
const LETTERS: &[(char, Joining, u32)] = &[
    ('\u{0622}', Joining::Right, 0xFE81),
    ('\u{0623}', Joining::Right, 0xFE83),
    ('\u{0624}', Joining::Right, 0xFE85),
    ('\u{0625}', Joining::Right, 0xFE87),
    ('\u{0626}', Joining::Dual, 0xFE89),
    ('\u{0627}', Joining::Right, 0xFE8D),
    ('\u{0628}', Joining::Dual, 0xFE8F),
    ('\u{0629}', Joining::Right, 0xFE93),
    ('\u{062A}', Joining::Dual, 0xFE95),
    ('\u{062B}', Joining::Dual, 0xFE99),
    ('\u{062C}', Joining::Dual, 0xFE9D),
    ('\u{062D}', Joining::Dual, 0xFEA1),
    ('\u{062E}', Joining::Dual, 0xFEA5),
    ('\u{062F}', Joining::Right, 0xFEA9),
    ('\u{0630}', Joining::Right, 0xFEAB),
    ('\u{0631}', Joining::Right, 0xFEAD),
    ('\u{0632}', Joining::Right, 0xFEAF),
    ('\u{0633}', Joining::Dual, 0xFEB1),
    ('\u{0634}', Joining::Dual, 0xFEB5),
    ('\u{0635}', Joining::Dual, 0xFEB9),
    ('\u{0636}', Joining::Dual, 0xFEBD),
    ('\u{0637}', Joining::Dual, 0xFEC1),
    ('\u{0638}', Joining::Dual, 0xFEC5),
    ('\u{0639}', Joining::Dual, 0xFEC9),
    ('\u{063A}', Joining::Dual, 0xFECD),
    ('\u{0641}', Joining::Dual, 0xFED1),
    ('\u{0642}', Joining::Dual, 0xFED5),
    ('\u{0643}', Joining::Dual, 0xFED9),
    ('\u{0644}', Joining::Dual, 0xFEDD),
    ('\u{0645}', Joining::Dual, 0xFEE1),
    ('\u{0646}', Joining::Dual, 0xFEE5),
    ('\u{0647}', Joining::Dual, 0xFEE9),
    ('\u{0648}', Joining::Right, 0xFEED),
    ('\u{0649}', Joining::Right, 0xFEEF),
    ('\u{064A}', Joining::Dual, 0xFEF1),
    ('\u{0671}', Joining::Right, 0xFB50),
    ('\u{067E}', Joining::Dual, 0xFB56),
    ('\u{0686}', Joining::Dual, 0xFB7A),
    ('\u{0698}', Joining::Right, 0xFB8A),
    ('\u{06A9}', Joining::Dual, 0xFB8E),
    ('\u{06AF}', Joining::Dual, 0xFB92),
    ('\u{06CC}', Joining::Dual, 0xFBFC),
];

/// Alef variant → (isolated ligature, final ligature) when preceded by lam.
fn lam_alef_ligature(alef: char) -> Option<(char, char)> {
    match alef {
        '\u{0622}' => Some(('\u{FEF5}', '\u{FEF6}')),
        '\u{0623}' => Some(('\u{FEF7}', '\u{FEF8}')),
        '\u{0625}' => Some(('\u{FEF9}', '\u{FEFA}')),
        '\u{0627}' => Some(('\u{FEFB}', '\u{FEFC}')),
        _ => None,
    }
}

fn letter(ch: char) -> Option<(Joining, u32)> {
    LETTERS
        .binary_search_by_key(&ch, |&(c, _, _)| c)
        .ok()
        .map(|idx| (LETTERS[idx].1, LETTERS[idx].2))
}

fn joining_type(ch: char) -> Joining {
    if let Some((joining, _)) = letter(ch) {
        return joining;
    }
    match ch {
        '\u{0640}' | '\u{200D}' => Joining::Causing,
        '\u{0610}'..='\u{061A}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06DC}'
        | '\u{06DF}'..='\u{06E4}'
        | '\u{06E7}'
        | '\u{06E8}'
        | '\u{06EA}'..='\u{06ED}' => Joining::Transparent,
        _ => Joining::NonJoining,
    }
}

/// Index of the nearest non-transparent char before `i`.
fn prev_joining(chars: &[char], i: usize) -> Option<Joining> {
    chars[..i]
        .iter()
        .rev()
        .map(|&c| joining_type(c))
        .find(|j| *j != Joining::Transparent)
}

/// Index of the nearest non-transparent char after `i`.
fn next_index(chars: &[char], i: usize) -> Option<usize> {
    (i + 1..chars.len()).find(|&j| joining_type(chars[j]) != Joining::Transparent)
}

/// Substitute contextual presentation forms. Non-Arabic text passes through
/// unchanged.
pub fn join(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == HAMZA {
            out.push(HAMZA_ISOLATED);
            i += 1;
            continue;
        }

        let Some((joining, isolated)) = letter(ch) else {
            out.push(ch);
            i += 1;
            continue;
        };

        let joins_prev = prev_joining(&chars, i).is_some_and(Joining::connects_forward);
        let next = next_index(&chars, i);

        if ch == LAM {
            if let Some((lig_isolated, lig_final)) = next.and_then(|n| lam_alef_ligature(chars[n])) {
                out.push(if joins_prev { lig_final } else { lig_isolated });
                // Keep any marks that sat between lam and alef.
                if let Some(n) = next {
                    out.extend(&chars[i + 1..n]);
                    i = n + 1;
                }
                continue;
            }
        }

        let joins_next = joining == Joining::Dual
            && next.is_some_and(|n| joining_type(chars[n]).connects_backward());

        let offset = match (joins_prev, joins_next) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        out.push(char::from_u32(isolated + offset).unwrap_or(ch));
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codepoints(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    #[test]
    fn test_table_is_sorted() {
        assert!(LETTERS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_latin_passthrough() {
        assert_eq!(join("Invoice #12, total 3,500"), "Invoice #12, total 3,500");
        assert_eq!(join(""), "");
    }

    #[test]
    fn test_dual_joining_positions() {
        // meem-hah-meem-dal
        assert_eq!(codepoints(&join("محمد")), vec![0xFEE3, 0xFEA4, 0xFEE4, 0xFEAA]);
    }

    #[test]
    fn test_isolated_letter() {
        assert_eq!(codepoints(&join("ب")), vec![0xFE8F]);
    }

    #[test]
    fn test_right_joining_breaks_chain() {
        // dal never connects forward, so the following beh starts a new chain.
        assert_eq!(codepoints(&join("دب")), vec![0xFEA9, 0xFE8F]);
    }

    #[test]
    fn test_lam_alef_ligature() {
        // seen (initial), lam-alef (final ligature), meem (isolated)
        assert_eq!(codepoints(&join("سلام")), vec![0xFEB3, 0xFEFC, 0xFEE1]);
        // word-initial lam-alef uses the isolated ligature
        assert_eq!(codepoints(&join("لا")), vec![0xFEFB]);
    }

    #[test]
    fn test_marks_are_transparent() {
        // beh + fatha + teh: the mark must not break the join.
        let joined = codepoints(&join("بَت"));
        assert_eq!(joined, vec![0xFE91, 0x064E, 0xFE96]);
    }

    #[test]
    fn test_words_join_independently() {
        let joined = codepoints(&join("من في"));
        assert_eq!(joined, vec![0xFEE3, 0xFEE6, 0x20, 0xFED3, 0xFEF2]);
    }

    #[test]
    fn test_tatweel_causes_joining() {
        assert_eq!(codepoints(&join("بـ")), vec![0xFE91, 0x0640]);
    }

    #[test]
    fn test_hamza_isolated() {
        assert_eq!(codepoints(&join("ء")), vec![0xFE80]);
    }
}
