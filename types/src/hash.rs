//! Transaction hash type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Length of the hex encoding, without any `0x` prefix.
    pub const HEX_LEN: usize = 64;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Build a hash from a raw slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            TypesError::InvalidHash(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Parse a 64-character hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != Self::HEX_LEN {
            return Err(TypesError::InvalidHash(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                digits.len()
            )));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(digits, &mut arr)
            .map_err(|e| TypesError::InvalidHash(e.to_string()))?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TxHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upper_and_lower_case() {
        let lower = TxHash::from_hex(&"ab".repeat(32)).unwrap();
        let upper = TxHash::from_hex(&"AB".repeat(32)).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_bytes(), &[0xAB; 32]);
    }

    #[test]
    fn accepts_0x_prefix() {
        let hash = TxHash::from_hex(&format!("0x{}", "01".repeat(32))).unwrap();
        assert_eq!(hash.as_bytes(), &[0x01; 32]);
    }

    #[test]
    fn rejects_short_hash() {
        assert!(matches!(
            TxHash::from_hex("ABCD"),
            Err(TypesError::InvalidHash(_))
        ));
    }

    #[test]
    fn rejects_non_hex() {
        let bad = format!("zz{}", "00".repeat(31));
        assert!(TxHash::from_hex(&bad).is_err());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(TxHash::from_slice(&[0u8; 31]).is_err());
        assert_eq!(TxHash::from_slice(&[7u8; 32]).unwrap(), TxHash::new([7u8; 32]));
    }

    #[test]
    fn display_is_full_lowercase_hex() {
        let hash = TxHash::new([0xCD; 32]);
        assert_eq!(hash.to_string(), "cd".repeat(32));
        assert_eq!(format!("{:?}", hash), "TxHash(cdcdcdcd)");
    }
}
