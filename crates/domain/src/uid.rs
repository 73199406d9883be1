use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::UidError;

/// Total identifier length in bytes.
pub const UID_LENGTH: usize = 20;

/// Literal every identifier ends with.
pub const UID_SUFFIX: &str = "test";

const RANDOM_PART_LENGTH: usize = UID_LENGTH - UID_SUFFIX.len();
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Validated order identifier: 16 lowercase alphanumerics followed by `test`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderUid(String);

impl OrderUid {
    /// Check an identifier against the fixed format.
    pub fn validate(value: &str) -> Result<(), UidError> {
        let bytes = value.as_bytes();

        if bytes.len() != UID_LENGTH {
            return Err(UidError::InvalidLength);
        }

        if &bytes[RANDOM_PART_LENGTH..] != UID_SUFFIX.as_bytes() {
            return Err(UidError::InvalidSuffix);
        }

        if !bytes[..RANDOM_PART_LENGTH]
            .iter()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(UidError::InvalidChars);
        }

        Ok(())
    }

    /// Parse and validate an identifier
    pub fn parse(value: &str) -> Result<Self, UidError> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    /// Generate a fresh identifier from the OS random source.
    ///
    /// Inbound orders carry producer-assigned identifiers; this is for
    /// tests and fixtures.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let mut value: String = (0..RANDOM_PART_LENGTH)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        value.push_str(UID_SUFFIX);
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderUid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<OrderUid> for String {
    fn from(uid: OrderUid) -> Self {
        uid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "b563feb7b2b84b6ftest";

    #[test]
    fn test_valid_uid_passes() {
        assert_eq!(VALID.len(), UID_LENGTH);
        assert!(OrderUid::validate(VALID).is_ok());
        assert!(OrderUid::validate("0000000000000000test").is_ok());
        assert!(OrderUid::validate("zzzzzzzzzzzzzzzztest").is_ok());
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert_eq!(OrderUid::validate("short"), Err(UidError::InvalidLength));
        assert_eq!(OrderUid::validate(""), Err(UidError::InvalidLength));
        assert_eq!(
            OrderUid::validate("b563feb7b2b84b6ftestx"),
            Err(UidError::InvalidLength)
        );
        // 19 characters
        assert_eq!(
            OrderUid::validate("b563feb7b2b84b6test"),
            Err(UidError::InvalidLength)
        );
    }

    #[test]
    fn test_wrong_suffix_is_rejected() {
        assert_eq!(
            OrderUid::validate("b563feb7b2b84b6ftesx"),
            Err(UidError::InvalidSuffix)
        );
        assert_eq!(
            OrderUid::validate("b563feb7b2b84b6fTEST"),
            Err(UidError::InvalidSuffix)
        );
    }

    #[test]
    fn test_each_bad_prefix_char_is_rejected() {
        for position in 0..RANDOM_PART_LENGTH {
            for bad in ['A', '-', '_', ' ', 'Z', '!'] {
                let mut chars: Vec<char> = VALID.chars().collect();
                chars[position] = bad;
                let candidate: String = chars.into_iter().collect();
                assert_eq!(
                    OrderUid::validate(&candidate),
                    Err(UidError::InvalidChars),
                    "candidate {candidate}"
                );
            }
        }
    }

    #[test]
    fn test_length_reported_before_suffix_and_chars() {
        assert_eq!(OrderUid::validate("AB-xyz"), Err(UidError::InvalidLength));
    }

    #[test]
    fn test_suffix_reported_before_chars() {
        assert_eq!(
            OrderUid::validate("ABCDEFGHIJKLMNOPnope"),
            Err(UidError::InvalidSuffix)
        );
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert_eq!(
            OrderUid::validate("éééééééétest"),
            Err(UidError::InvalidChars)
        );
        // 20 bytes where the suffix boundary falls inside a multibyte char
        assert_eq!(
            OrderUid::validate("aaaaaaaaaaaaaaaéest"),
            Err(UidError::InvalidSuffix)
        );
    }

    #[test]
    fn test_generated_uids_are_valid_and_distinct() {
        let first = OrderUid::generate();
        let second = OrderUid::generate();

        assert!(OrderUid::validate(first.as_str()).is_ok());
        assert!(OrderUid::validate(second.as_str()).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn test_deserialize_rejects_invalid_uid() {
        let ok: Result<OrderUid, _> = serde_json::from_str(&format!("\"{VALID}\""));
        assert!(ok.is_ok());

        let err: Result<OrderUid, _> = serde_json::from_str("\"short\"");
        assert!(err.is_err());
    }
}
