//! Hex-encoded byte signatures.

use crate::core::error::{Error, Result};
use crate::detection::matcher::PatternMatcher;

/// A byte sequence decoded from hexadecimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteSignature {
    bytes: Vec<u8>,
}

impl ByteSignature {
    /// Decode a case-insensitive hex string two characters at a time.
    ///
    /// A trailing odd character is dropped, so `"ABC"` decodes as `[0xAB]`.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let even_len = hex_str.len() - hex_str.len() % 2;
        let even = hex_str
            .get(..even_len)
            .ok_or_else(|| Error::InvalidSignature(format!("{:?} is not ASCII hex", hex_str)))?;

        if even_len != hex_str.len() {
            log::debug!("Dropping trailing character of odd-length signature {:?}", hex_str);
        }

        let bytes = hex::decode(even)
            .map_err(|e| Error::InvalidSignature(format!("{:?}: {}", hex_str, e)))?;

        Ok(Self { bytes })
    }

    /// The decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check whether the signature decoded to nothing.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build a matcher for this signature.
    pub fn matcher(&self) -> PatternMatcher {
        PatternMatcher::new(self.as_bytes())
    }
}

impl std::fmt::Display for ByteSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let sig = ByteSignature::from_hex("DEADBEEF").unwrap();
        assert_eq!(sig.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_decode_case_insensitive() {
        let lower = ByteSignature::from_hex("deadbeef").unwrap();
        let mixed = ByteSignature::from_hex("DeAdBeEf").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(lower.to_string(), "DEADBEEF");
    }

    #[test]
    fn test_odd_length_drops_trailing_nibble() {
        let sig = ByteSignature::from_hex("ABC").unwrap();
        assert_eq!(sig.as_bytes(), &[0xAB]);

        let sig = ByteSignature::from_hex("A").unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            ByteSignature::from_hex("ZZ").unwrap_err(),
            Error::InvalidSignature(_)
        ));
        assert!(ByteSignature::from_hex("é0").is_err());
    }

    #[test]
    fn test_matcher() {
        let sig = ByteSignature::from_hex("41").unwrap();
        assert_eq!(sig.matcher().find_all(b"ABA"), vec![0, 2]);
    }
}
