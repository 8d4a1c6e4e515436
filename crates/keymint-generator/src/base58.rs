/// Encodes a non-negative integer with the Bitcoin Base58 alphabet,
/// big-endian, no padding.
///
/// The value is reduced to its minimal big-endian byte form first, so
/// the encoding is bit-stable across word sizes. Zero keeps a single
/// zero byte and encodes as `"1"`.
pub fn encode(n: u64) -> String {
    let bytes = n.to_be_bytes();
    let first = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bs58::encode(&bytes[first..]).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_encodes_as_one() {
        assert_eq!(encode(0), "1");
    }

    #[test]
    fn small_values_map_to_single_digits() {
        assert_eq!(encode(1), "2");
        assert_eq!(encode(4), "5");
        assert_eq!(encode(57), "z");
    }

    #[test]
    fn base_rollover() {
        assert_eq!(encode(58), "21");
        assert_eq!(encode(58 * 58), "211");
    }

    #[test]
    fn billion_scale_values_stay_short() {
        // Seed offsets start at one billion; the bodies must stay
        // well under the 12-character lookup limit with the prefix.
        assert!(encode(1_000_000_000).len() <= 6);
        assert!(encode(5_000_000_000).len() <= 6);
    }

    #[test]
    fn encoding_is_strictly_ordered_in_length() {
        // More bytes never encode shorter.
        assert!(encode(u64::MAX).len() >= encode(1).len());
    }
}
