use crate::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// A contiguous range of lowercase first-letter prefixes, e.g. `"a-e"`.
///
/// Every shard store covers exactly one key range; any lowercase letter
/// belongs to exactly one range of the canonical partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start: u8,
    end: u8,
}

impl KeyRange {
    pub(crate) const fn of(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Parses a range of the form `"x-y"` with `x ≤ y`, both single
    /// lowercase ASCII letters.
    pub fn parse(range: &str) -> Result<Self, Error> {
        let invalid = || {
            Error::Invalid(format!(
                "invalid key range '{range}', expected format start-end"
            ))
        };

        let (start, end) = range.split_once('-').ok_or_else(invalid)?;
        let (start, end) = match (start.as_bytes(), end.as_bytes()) {
            ([s], [e]) => (*s, *e),
            _ => return Err(invalid()),
        };

        if !start.is_ascii_lowercase() || !end.is_ascii_lowercase() || start > end {
            return Err(invalid());
        }

        Ok(Self { start, end })
    }

    /// First letter of the range, inclusive.
    pub fn start(&self) -> char {
        self.start as char
    }

    /// Last letter of the range, inclusive.
    pub fn end(&self) -> char {
        self.end as char
    }

    /// Whether the range covers the given character, case-insensitively.
    pub fn contains(&self, ch: char) -> bool {
        let ch = ch.to_ascii_lowercase();
        ch >= self.start as char && ch <= self.end as char
    }

    /// Whether two ranges share at least one letter.
    pub fn overlaps(&self, other: &KeyRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Every letter covered by the range, in order.
    pub fn letters(&self) -> impl Iterator<Item = char> {
        (self.start..=self.end).map(|b| b as char)
    }

    /// Derives the shard store identifier, e.g. `db_a_e` for `a-e`.
    pub fn store_id(&self) -> String {
        format!("db_{}_{}", self.start(), self.end())
    }
}

impl Display for KeyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}

impl FromStr for KeyRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyRange::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_range() {
        let range = KeyRange::parse("a-e").unwrap();
        assert_eq!(range.start(), 'a');
        assert_eq!(range.end(), 'e');
        assert_eq!(range.to_string(), "a-e");
    }

    #[test]
    fn parses_single_letter_range() {
        let range = KeyRange::parse("k-k").unwrap();
        assert_eq!(range.letters().collect::<String>(), "k");
    }

    #[test]
    fn rejects_malformed_ranges() {
        for input in ["", "a", "ae", "a-", "-e", "e-a", "A-E", "a-e-k", "ab-cd"] {
            assert!(KeyRange::parse(input).is_err(), "accepted '{input}'");
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        let range = KeyRange::parse("f-j").unwrap();
        assert!(range.contains('f'));
        assert!(range.contains('H'));
        assert!(range.contains('j'));
        assert!(!range.contains('k'));
        assert!(!range.contains('e'));
    }

    #[test]
    fn overlap_detection() {
        let a_e = KeyRange::parse("a-e").unwrap();
        let b_g = KeyRange::parse("b-g").unwrap();
        let f_j = KeyRange::parse("f-j").unwrap();
        let a_z = KeyRange::parse("a-z").unwrap();

        assert!(a_e.overlaps(&b_g));
        assert!(b_g.overlaps(&f_j));
        assert!(!a_e.overlaps(&f_j));
        // A superset intersects every range it spans.
        assert!(a_z.overlaps(&f_j));
        assert!(f_j.overlaps(&a_z));
    }

    #[test]
    fn store_id_replaces_dash_with_underscore() {
        assert_eq!(KeyRange::parse("q-u").unwrap().store_id(), "db_q_u");
    }
}
