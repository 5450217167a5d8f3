//! Git object hashes.
//!
//! A 20-byte SHA-1 object id, ordered bytewise so revisions can be sorted
//! and matched against hex-prefix ranges.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The zero hash, used to distinguish whether a hash is present.
pub const NO_HASH: Hash = Hash([0; 20]);

/// The maximum hash value, the upper bound for prefix ranges.
pub const MAX_HASH: Hash = Hash([0xff; 20]);

/// A git object id: 20 raw bytes.
///
/// Lockfiles written by other tools sometimes carry the hash of an annotated
/// tag instead of a commit; the loader normalizes those to the hash of the
/// commit the tag chain resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash(pub [u8; 20]);

impl Hash {
    /// Parse a full 40-character hex hash.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 40 {
            return None;
        }
        let mut bytes = [0; 20];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Hash(bytes))
    }

    /// Whether this hash is the absent sentinel.
    pub fn is_none(&self) -> bool {
        *self == NO_HASH
    }

    /// The hex representation, or an empty string for the absent sentinel,
    /// so hashes are omitted from serialized lockfiles when not present.
    pub fn to_hex(&self) -> String {
        if self.is_none() {
            String::new()
        } else {
            hex::encode(self.0)
        }
    }

    /// The first eight hex digits, for aligned report columns.
    pub fn short(&self) -> String {
        if self.is_none() {
            "########".to_string()
        } else {
            hex::encode(&self.0[..4])
        }
    }

    /// Whether this hash falls within inclusive bounds.
    pub fn between(&self, min: Hash, max: Hash) -> bool {
        min <= *self && *self <= max
    }

    /// Byte-wise subtraction with borrow, wrapping below zero.
    pub fn sub(self, other: Hash) -> Hash {
        let mut out = [0u8; 20];
        let mut borrow = 0i16;
        for i in (0..20).rev() {
            let diff = i16::from(self.0[i]) - i16::from(other.0[i]) + borrow;
            out[i] = diff as u8;
            borrow = diff >> 8;
        }
        Hash(out)
    }

    /// The absolute difference between two hashes.
    pub fn diff(self, other: Hash) -> Hash {
        if self < other {
            other.sub(self)
        } else {
            self.sub(other)
        }
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(NO_HASH);
        }
        Hash::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid object id: {s:?}")))
    }
}

/// Parse a hex hash prefix into the inclusive range of hashes that begin
/// with it.
///
/// For `"abcde"` the bounds are `abcde00…00` and `abcdeff…ff`. Returns
/// `None` for inputs longer than 40 characters or containing non-hex
/// characters. The empty prefix covers the full hash space.
pub fn parse_hash_prefix(s: &str) -> Option<(Hash, Hash)> {
    if s.len() > 40 {
        return None;
    }
    let mut min = [0u8; 20];
    let mut max = [0xffu8; 20];
    for (i, c) in s.chars().enumerate() {
        if !matches!(c, '0'..='9' | 'a'..='f') {
            return None;
        }
        let nibble = c.to_digit(16).unwrap_or(0) as u8;
        if i % 2 == 0 {
            min[i / 2] = nibble << 4;
            max[i / 2] = (nibble << 4) | 0xf;
        } else {
            min[i / 2] |= nibble;
            max[i / 2] = (max[i / 2] & 0xf0) | nibble;
        }
    }
    Some((Hash(min), Hash(max)))
}
