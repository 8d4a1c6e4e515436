use crate::error::Error;
use tracing::debug;

/// Parses a size string of the form `<number><suffix>` into a count.
///
/// Suffixes scale the number: `U` ×1, `K` ×10³, `M` ×10⁶, `B` ×10⁹.
/// A missing suffix means ×1. The numeric part must lie in `[1, 1000)`
/// before scaling; anything outside is rejected so a typo cannot ask
/// for a trillion keys.
pub fn parse_size(input: &str) -> Result<u64, Error> {
    if input.is_empty() {
        return Err(Error::Invalid(
            "size must look like <number>K, <number>M or <number>B".to_string(),
        ));
    }

    // Suffixes are single ASCII bytes, so slicing off the last byte is
    // safe in every matched arm.
    let (number_str, multiplier) = match input.as_bytes()[input.len() - 1] {
        b'U' => (&input[..input.len() - 1], 1),
        b'K' => (&input[..input.len() - 1], 1_000),
        b'M' => (&input[..input.len() - 1], 1_000_000),
        b'B' => (&input[..input.len() - 1], 1_000_000_000),
        _ => {
            debug!(size = input, "no size suffix provided, taking value as is");
            (input, 1)
        }
    };

    let number: u64 = number_str.parse().map_err(|_| {
        Error::Invalid(format!(
            "invalid size '{input}', expected <number>K, <number>M or <number>B"
        ))
    })?;

    if number < 1 {
        return Err(Error::Invalid(format!("size '{input}' cannot be less than 1")));
    }

    if number >= 1000 {
        return Err(Error::Invalid(format!(
            "size '{input}' is way too much, use the next suffix up"
        )));
    }

    Ok(number * multiplier)
}
