//! Text folding and collation helpers shared by the sort adapters.
//!
//! Collation here is locale-neutral: text is case folded, then transliterated
//! to ASCII with `deunicode` so accented letters sort next to their base
//! letters. The folded original breaks ties, keeping the order total.

use std::cmp::Ordering;

use deunicode::deunicode;

/// Characters that render as nothing (or as plain space) and must not make a
/// value count as non-empty.
pub const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', // zero width space
    '\u{FEFF}', // byte order mark
    '\u{2060}', // word joiner
    '\u{00A0}', // no-break space
];

/// Folds case for caseless comparison.
///
/// Goes beyond `to_lowercase` for the common full-folding cases (`ß` → `ss`,
/// final sigma).
pub fn casefold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'ß' | 'ẞ' => folded.push_str("ss"),
            'ς' => folded.push('σ'),
            _ => folded.extend(c.to_lowercase()),
        }
    }
    folded
}

/// Removes invisible characters and trims surrounding whitespace.
pub fn clean_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Caseless, accent-insensitive comparison key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CollationKey {
    primary: String,
    secondary: String,
}

impl CollationKey {
    /// Builds the collation key of `text`.
    pub fn new(text: &str) -> Self {
        let secondary = casefold(text);
        let primary = casefold(&deunicode(&secondary));
        CollationKey { primary, secondary }
    }

    /// Returns the folded ASCII form used as the primary comparison.
    pub fn primary(&self) -> &str {
        &self.primary
    }
}

/// One run of a [`NaturalKey`]: digits compare by value, text by collation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalChunk {
    /// A run of ASCII digits, stored without leading zeros.
    Number { digits: String, width: usize },
    /// A run of anything else.
    Text(String),
}

impl Ord for NaturalChunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                NaturalChunk::Number { digits: a, width: wa },
                NaturalChunk::Number { digits: b, width: wb },
            ) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| wa.cmp(wb)),
            (NaturalChunk::Text(a), NaturalChunk::Text(b)) => a.cmp(b),
            // digits sort before letters
            (NaturalChunk::Number { .. }, NaturalChunk::Text(_)) => Ordering::Less,
            (NaturalChunk::Text(_), NaturalChunk::Number { .. }) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NaturalChunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Natural (alphanumeric) sort key: `"Track 2" < "Track 10"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NaturalKey {
    chunks: Vec<NaturalChunk>,
    tiebreak: String,
}

impl NaturalKey {
    /// Builds the natural sort key of `text`.
    pub fn new(text: &str) -> Self {
        let collation = CollationKey::new(text);
        let mut chunks = Vec::new();
        let mut digits = String::new();
        let mut other = String::new();

        for c in collation.primary.chars() {
            if c.is_ascii_digit() {
                if !other.is_empty() {
                    chunks.push(NaturalChunk::Text(std::mem::take(&mut other)));
                }
                digits.push(c);
            } else {
                if !digits.is_empty() {
                    chunks.push(number_chunk(std::mem::take(&mut digits)));
                }
                other.push(c);
            }
        }
        if !digits.is_empty() {
            chunks.push(number_chunk(digits));
        }
        if !other.is_empty() {
            chunks.push(NaturalChunk::Text(other));
        }

        NaturalKey {
            chunks,
            tiebreak: collation.secondary,
        }
    }

    /// Returns the chunks of this key.
    pub fn chunks(&self) -> &[NaturalChunk] {
        &self.chunks
    }
}

fn number_chunk(raw: String) -> NaturalChunk {
    let width = raw.len();
    let trimmed = raw.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };
    NaturalChunk::Number {
        digits: digits.to_string(),
        width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casefold_handles_full_folding() {
        assert_eq!(casefold("Straße"), "strasse");
        assert_eq!(casefold("ΣΊΣΥΦΟΣ"), casefold("σίσυφος"));
        assert_eq!(casefold("ABC"), "abc");
    }

    #[test]
    fn clean_invisible_strips_zero_width_and_nbsp() {
        assert_eq!(clean_invisible("\u{200B}\u{FEFF}\u{2060}\u{00A0}  "), "");
        assert_eq!(clean_invisible(" \u{200B}abc\u{00A0}"), "abc");
    }

    #[test]
    fn collation_is_case_and_accent_insensitive_first() {
        let mut words = vec!["zebra", "Émile", "apple", "eagle"];
        words.sort_by_key(|w| CollationKey::new(w));
        assert_eq!(words, vec!["apple", "eagle", "Émile", "zebra"]);
    }

    #[test]
    fn collation_breaks_ties_deterministically() {
        let plain = CollationKey::new("resume");
        let accented = CollationKey::new("résumé");
        assert_eq!(plain.primary(), accented.primary());
        assert_ne!(plain, accented);
    }

    #[test]
    fn natural_orders_digit_runs_by_value() {
        let mut tracks = vec!["Track 10", "Track 2", "track 1", "Track 02b"];
        tracks.sort_by_key(|t| NaturalKey::new(t));
        assert_eq!(tracks, vec!["track 1", "Track 2", "Track 02b", "Track 10"]);
    }

    #[test]
    fn natural_handles_huge_numbers_and_leading_zeros() {
        let big = NaturalKey::new("99999999999999999999999");
        let small = NaturalKey::new("100");
        assert!(small < big);
        assert!(NaturalKey::new("7") < NaturalKey::new("007"));
        assert!(NaturalKey::new("007") < NaturalKey::new("8"));
    }

    #[test]
    fn natural_digits_before_text() {
        assert!(NaturalKey::new("9") < NaturalKey::new("a"));
        assert!(NaturalKey::new("") < NaturalKey::new("0"));
    }
}
