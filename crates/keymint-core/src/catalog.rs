use crate::key_range::KeyRange;

const LOWERS: [char; 23] = [
    'a', 'b', 'c', 'd', 'e', //
    'f', 'g', 'h', 'j', //
    'k', 'm', 'n', //
    'p', 'q', 'r', 's', 't', //
    'u', 'v', 'w', 'x', 'y', 'z',
];

const UPPERS: [char; 23] = [
    'A', 'B', 'C', 'D', 'E', //
    'F', 'G', 'H', 'J', //
    'K', 'M', 'N', //
    'P', 'Q', 'R', 'S', 'T', //
    'U', 'V', 'W', 'X', 'Y', 'Z',
];

const DIGITS: [char; 9] = ['1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Single source of truth for alphabet membership and the shard
/// partition.
///
/// The canonical alphabet omits the ambiguous glyphs `i`, `l`, `o`
/// (and their uppercase mirrors) plus the digit `0`. The five key
/// ranges span `a..z` as an index into which letters fall where; the
/// excluded letters simply never appear as prefixes.
#[derive(Debug, Clone, Copy)]
pub struct Catalog;

impl Catalog {
    /// The catalog used for URL short keys.
    pub fn url_keys() -> Self {
        Self
    }

    pub fn lowers(&self) -> &'static [char] {
        &LOWERS
    }

    pub fn uppers(&self) -> &'static [char] {
        &UPPERS
    }

    pub fn digits(&self) -> &'static [char] {
        &DIGITS
    }

    /// The canonical shard partition.
    ///
    /// The width argument is currently ignored; the partition is always
    /// the five ranges below.
    // TODO: make the partition configurable instead of hardcoded
    pub fn shards(&self, _width: usize) -> Vec<KeyRange> {
        vec![
            KeyRange::of(b'a', b'e'),
            KeyRange::of(b'f', b'j'),
            KeyRange::of(b'k', b'p'),
            KeyRange::of(b'q', b'u'),
            KeyRange::of(b'v', b'z'),
        ]
    }

    /// The canonical lowercase letters covered by a range, in order.
    ///
    /// Letters excluded from the alphabet are skipped even when the
    /// range spans them (`k-p` yields `k m n p`).
    pub fn letters_in(&self, range: &KeyRange) -> Vec<char> {
        LOWERS
            .iter()
            .copied()
            .filter(|ch| range.contains(*ch))
            .collect()
    }
}
