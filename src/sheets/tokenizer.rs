//! Separator recognition for sheet text lines.
//!
//! Lines are scanned left to right. At each position the rules in
//! [`SEPARATOR_RULES`] are tried in order and the first match wins, so longer
//! tokens must appear before shorter ones sharing a prefix.

use super::DurationClass;

/// Extra context a rule needs besides its literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    None,
    /// The literal must end the line or be followed by a space.
    AtEndOrBeforeSpace,
    /// The character before the literal must not be a space.
    NotPrecededBySpace,
}

/// A single tokenizer rule: literal text, guard, and the duration it encodes.
#[derive(Debug, Clone, Copy)]
pub struct SeparatorRule {
    pub literal: &'static str,
    pub class: DurationClass,
    guard: Guard,
}

/// Ordered separator rules. Order is significant.
pub const SEPARATOR_RULES: &[SeparatorRule] = &[
    SeparatorRule {
        literal: "...... ",
        class: DurationClass::Quadruple,
        guard: Guard::None,
    },
    SeparatorRule {
        literal: ".... ",
        class: DurationClass::Whole,
        guard: Guard::None,
    },
    SeparatorRule {
        literal: "... ",
        class: DurationClass::Whole,
        guard: Guard::None,
    },
    SeparatorRule {
        literal: "...",
        class: DurationClass::Whole,
        guard: Guard::AtEndOrBeforeSpace,
    },
    SeparatorRule {
        literal: " - ",
        class: DurationClass::Quarter,
        guard: Guard::None,
    },
    SeparatorRule {
        literal: ", ",
        class: DurationClass::Half,
        guard: Guard::None,
    },
    SeparatorRule {
        literal: "-",
        class: DurationClass::Sixteenth,
        guard: Guard::NotPrecededBySpace,
    },
    SeparatorRule {
        literal: " ",
        class: DurationClass::Eighth,
        guard: Guard::None,
    },
];

/// A recognized separator within a line, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub start: usize,
    pub end: usize,
    pub literal: &'static str,
    pub class: DurationClass,
}

impl SeparatorRule {
    fn matches(&self, chars: &[char], pos: usize) -> bool {
        let len = self.literal.chars().count();
        if pos + len > chars.len() {
            return false;
        }
        if !self.literal.chars().zip(&chars[pos..pos + len]).all(|(a, &b)| a == b) {
            return false;
        }
        match self.guard {
            Guard::None => true,
            Guard::AtEndOrBeforeSpace => matches!(chars.get(pos + len), None | Some(' ')),
            Guard::NotPrecededBySpace => pos == 0 || chars[pos - 1] != ' ',
        }
    }
}

/// Returns the separator starting at `pos`, if any.
///
/// # Arguments
///
/// * `chars` - The line as a character slice
/// * `pos` - Character offset to test
pub fn separator_at(chars: &[char], pos: usize) -> Option<Separator> {
    if pos >= chars.len() {
        return None;
    }
    SEPARATOR_RULES
        .iter()
        .find(|rule| rule.matches(chars, pos))
        .map(|rule| Separator {
            start: pos,
            end: pos + rule.literal.chars().count(),
            literal: rule.literal,
            class: rule.class,
        })
}

/// Scans a whole line and returns its separators in order.
///
/// Characters that start no separator are skipped one at a time; they
/// belong to the current chord.
pub fn find_separators(chars: &[char]) -> Vec<Separator> {
    let mut separators = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        match separator_at(chars, pos) {
            Some(sep) => {
                pos = sep.end;
                separators.push(sep);
            }
            None => pos += 1,
        }
    }

    separators
}

/// Flags the characters of every out-of-range marker in a line.
///
/// A marker is a `:` directly followed by an ASCII letter, digit or
/// punctuation character. Both characters are flagged.
pub fn out_of_range_mask(chars: &[char]) -> Vec<bool> {
    let mut mask = vec![false; chars.len()];
    for i in 0..chars.len().saturating_sub(1) {
        let next = chars[i + 1];
        if chars[i] == ':' && (next.is_ascii_alphanumeric() || next.is_ascii_punctuation()) {
            mask[i] = true;
            mask[i + 1] = true;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn literals(s: &str) -> Vec<&'static str> {
        find_separators(&chars(s)).iter().map(|s| s.literal).collect()
    }

    #[test]
    fn test_four_dots_not_split() {
        let seps = find_separators(&chars("A.... B"));
        assert_eq!(seps.len(), 1);
        assert_eq!(seps[0].literal, ".... ");
        assert_eq!((seps[0].start, seps[0].end), (1, 6));
        assert_eq!(seps[0].class, DurationClass::Whole);
    }

    #[test]
    fn test_six_dots_longest_first() {
        assert_eq!(literals("a...... b"), vec!["...... "]);
        assert_eq!(
            separator_at(&chars("...... "), 0).map(|s| s.class),
            Some(DurationClass::Quadruple)
        );
    }

    #[test]
    fn test_five_dots_skip_one() {
        // The first dot belongs to the chord; the remaining four form the token.
        let seps = find_separators(&chars("a..... b"));
        assert_eq!(seps.len(), 1);
        assert_eq!(seps[0].literal, ".... ");
        assert_eq!(seps[0].start, 2);
    }

    #[test]
    fn test_bare_three_dots() {
        assert_eq!(literals("ab..."), vec!["..."]);
        assert!(literals("ab...c").is_empty());
        assert!(literals("ab....c").is_empty());
        assert_eq!(literals("ab... c"), vec!["... "]);
    }

    #[test]
    fn test_spaced_dash_beats_single_space() {
        assert_eq!(literals("a - b"), vec![" - "]);
    }

    #[test]
    fn test_dash_after_space_is_not_a_separator() {
        // " -x": the space matches first, then the dash is preceded by a space.
        assert_eq!(literals("a -x"), vec![" "]);
        assert_eq!(literals("a-b"), vec!["-"]);
        assert_eq!(literals("-a"), vec!["-"]);
    }

    #[test]
    fn test_comma_and_space() {
        assert_eq!(literals("a, b c"), vec![", ", " "]);
    }

    #[test]
    fn test_no_separators() {
        assert!(find_separators(&chars("[tyu]")).is_empty());
        assert!(find_separators(&[]).is_empty());
        assert!(separator_at(&chars("a"), 5).is_none());
    }

    #[test]
    fn test_out_of_range_mask() {
        let mask = out_of_range_mask(&chars("C:4 D"));
        assert_eq!(mask, vec![false, true, true, false, false]);

        let mask = out_of_range_mask(&chars("a: b:"));
        assert!(mask.iter().all(|m| !m));

        let mask = out_of_range_mask(&chars("::"));
        assert_eq!(mask, vec![true, true]);
    }
}
