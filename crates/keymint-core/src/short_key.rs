use crate::error::Error;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// Longest short key accepted on the lookup path.
pub const MAX_LOOKUP_LENGTH: usize = 12;

/// A short key of the form `<prefix><body>`, where `prefix` is one
/// lowercase letter from the canonical alphabet and `body` is the
/// Base58 encoding of a non-negative integer.
///
/// Short keys are unique within a shard store; the prefix decides which
/// shard the key lives in.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShortKey(SmolStr);

impl ShortKey {
    /// Wraps a key produced by a trusted internal source (the batch
    /// generator) without validation.
    pub fn new_unchecked(key: impl Into<SmolStr>) -> Self {
        Self(key.into())
    }

    /// Parses a key arriving from the outside (lookup path).
    ///
    /// Rejects empty keys and keys longer than [`MAX_LOOKUP_LENGTH`].
    pub fn parse(key: &str) -> Result<Self, Error> {
        if key.is_empty() || key.len() > MAX_LOOKUP_LENGTH {
            return Err(Error::Invalid(format!(
                "short key must be 1-{} characters, got {}",
                MAX_LOOKUP_LENGTH,
                key.len()
            )));
        }
        Ok(Self(SmolStr::new(key)))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the shard-routing prefix, i.e. the first character.
    pub fn prefix(&self) -> Option<char> {
        self.0.chars().next()
    }

    /// Generates the full shortened URL under the given base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl std::fmt::Debug for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortKey").field(&self.0).finish()
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShortKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        ShortKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
