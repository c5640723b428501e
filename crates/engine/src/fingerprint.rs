//! Fingerprints: fixed-length digests of identity strings
//!
//! A fingerprint is the SHA-256 of an identity string, rendered as lowercase
//! hex. Equal identity strings always produce equal fingerprints; distinct
//! strings collide only with negligible probability.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A SHA-256 digest as a 64-character hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of an identity string.
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    /// Compute the fingerprint of raw bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Create from a hex string (validating length and charset).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the string is not 64 hex digits.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let s = hex.into();
        if s.len() != 64 {
            return Err(Error::configuration(format!(
                "Fingerprint must be 64 hex characters, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::configuration(
                "Fingerprint must contain only hex digits",
            ));
        }
        Ok(Self(s))
    }

    /// Get the hex representation.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let fp = Fingerprint::of_text("hello world");
        assert_eq!(
            fp.as_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(Fingerprint::of_text("abc"), Fingerprint::of_text("abc"));
    }

    #[test]
    fn test_distinct_inputs_distinct_outputs() {
        assert_ne!(Fingerprint::of_text("abc"), Fingerprint::of_text("abd"));
    }

    #[test]
    fn test_from_hex_validation() {
        assert!(
            Fingerprint::from_hex(
                "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            )
            .is_ok()
        );
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(
            Fingerprint::from_hex(
                "xyz3456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            )
            .is_err()
        );
    }

    #[test]
    fn test_fixed_length() {
        assert_eq!(Fingerprint::of_text("").as_hex().len(), 64);
        assert_eq!(Fingerprint::of_text("a long string").as_hex().len(), 64);
    }
}
