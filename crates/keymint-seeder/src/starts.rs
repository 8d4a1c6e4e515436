use keymint_sharding::DEFAULT_SEED_START;

/// Immutable table of initial integer offsets, keyed by the first
/// letter a shard range covers.
///
/// Spacing the ranges a billion apart keeps every letter's Base58 body
/// the same width and guarantees the per-letter windows never collide,
/// no matter how unevenly the shards are refilled.
#[derive(Debug, Clone)]
pub struct SeedStarts {
    entries: Vec<(char, u64)>,
}

impl Default for SeedStarts {
    fn default() -> Self {
        Self::new(vec![
            ('a', 1_000_000_000),
            ('f', 2_000_000_000),
            ('k', 3_000_000_000),
            ('q', 4_000_000_000),
            ('v', 5_000_000_000),
        ])
    }
}

impl SeedStarts {
    pub fn new(mut entries: Vec<(char, u64)>) -> Self {
        entries.sort_by_key(|(letter, _)| *letter);
        Self { entries }
    }

    /// The starting offset for a prefix letter: the entry of the range
    /// the letter falls into, or [`DEFAULT_SEED_START`] when the table
    /// has no covering entry.
    pub fn start_for(&self, prefix: char) -> u64 {
        self.entries
            .iter()
            .rev()
            .find(|(letter, _)| *letter <= prefix)
            .map(|(_, start)| *start)
            .unwrap_or(DEFAULT_SEED_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_their_range_entry() {
        let starts = SeedStarts::default();
        assert_eq!(starts.start_for('a'), 1_000_000_000);
        assert_eq!(starts.start_for('e'), 1_000_000_000);
        assert_eq!(starts.start_for('j'), 2_000_000_000);
        assert_eq!(starts.start_for('n'), 3_000_000_000);
        assert_eq!(starts.start_for('u'), 4_000_000_000);
        assert_eq!(starts.start_for('z'), 5_000_000_000);
    }

    #[test]
    fn uncovered_letters_fall_back_to_the_default() {
        let starts = SeedStarts::new(vec![('m', 7)]);
        assert_eq!(starts.start_for('a'), DEFAULT_SEED_START);
        assert_eq!(starts.start_for('z'), 7);
    }

    #[test]
    fn custom_tables_are_sorted_on_construction() {
        let starts = SeedStarts::new(vec![('q', 40), ('a', 10), ('k', 30)]);
        assert_eq!(starts.start_for('b'), 10);
        assert_eq!(starts.start_for('p'), 30);
        assert_eq!(starts.start_for('x'), 40);
    }
}
