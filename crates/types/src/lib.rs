//! # HealthChain Types
//!
//! Validated value types used by every HealthChain crate.
//!
//! Each type guarantees its invariant once constructed, so code further in (the ABI codec, the
//! contract binding, the REST and CLI surfaces) never re-checks raw strings:
//! - [`NonEmptyText`]: trimmed, non-empty form text (patient name, diagnosis, treatment)
//! - [`Address`]: 20-byte account or contract address with EIP-55 checksum display
//! - [`U256`]: 256-bit unsigned integer matching Solidity's `uint256`

mod address;
mod uint;

pub use address::{Address, AddressError};
pub use uint::{U256, UintError};

use sha3::{Digest, Keccak256};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string that contains at least one non-whitespace character.
///
/// Input is trimmed during construction, so `"  flu  "` is stored as `"flu"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming leading and trailing whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if nothing is left after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Keccak-256 digest (the pre-standard SHA-3 variant Ethereum uses).
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Influenza A  ").unwrap();
        assert_eq!(text.as_str(), "Influenza A");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
        assert_eq!("".parse::<NonEmptyText>(), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_validates() {
        let ok: NonEmptyText = serde_json::from_str("\"Rest\"").unwrap();
        assert_eq!(ok.as_str(), "Rest");

        let err = serde_json::from_str::<NonEmptyText>("\"   \"");
        assert!(err.is_err());
    }

    #[test]
    fn test_keccak256_known_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(&keccak256(b"transfer(address,uint256)")[..4]),
            "a9059cbb"
        );
    }
}
