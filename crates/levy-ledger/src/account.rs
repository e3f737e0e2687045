use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Width of an account address in bytes.
pub const ACCOUNT_LEN: usize = 20;

/// Fixed-width ledger address.
///
/// Rendered as `0x`-prefixed lowercase hex. The all-zero address is the
/// [`AccountId::SINK`] that receives destroyed value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId([u8; ACCOUNT_LEN]);

impl AccountId {
    /// Reserved burn address. It can receive units but no key controls it.
    pub const SINK: AccountId = AccountId([0u8; ACCOUNT_LEN]);

    pub const fn new(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive an address from a 32-byte ed25519 public key: the trailing
    /// 20 bytes of `sha256(public_key)`.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest: [u8; 32] = Sha256::digest(public_key).into();
        let mut bytes = [0u8; ACCOUNT_LEN];
        bytes.copy_from_slice(&digest[32 - ACCOUNT_LEN..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_LEN] {
        &self.0
    }

    pub fn is_sink(&self) -> bool {
        *self == Self::SINK
    }
}

impl From<[u8; ACCOUNT_LEN]> for AccountId {
    fn from(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAccountError {
    #[error("invalid account hex: {0}")]
    Hex(String),
    #[error("account must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl FromStr for AccountId {
    type Err = ParseAccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let raw = hex::decode(s).map_err(|e| ParseAccountError::Hex(e.to_string()))?;
        if raw.len() != ACCOUNT_LEN {
            return Err(ParseAccountError::Length {
                expected: ACCOUNT_LEN,
                actual: raw.len(),
            });
        }
        let mut bytes = [0u8; ACCOUNT_LEN];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

// Serialized as a hex string so that accounts can key JSON maps.
impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let account = AccountId::new([0xab; ACCOUNT_LEN]);
        let rendered = account.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 2 + ACCOUNT_LEN * 2);
        assert_eq!(rendered.parse::<AccountId>().unwrap(), account);
        assert_eq!(
            rendered.trim_start_matches("0x").parse::<AccountId>().unwrap(),
            account
        );
    }

    #[test]
    fn rejects_wrong_width() {
        let err = "0xdeadbeef".parse::<AccountId>().unwrap_err();
        assert_eq!(
            err,
            ParseAccountError::Length {
                expected: ACCOUNT_LEN,
                actual: 4
            }
        );
        assert!(matches!(
            "0xzz".parse::<AccountId>(),
            Err(ParseAccountError::Hex(_))
        ));
    }

    #[test]
    fn public_key_derivation_is_stable() {
        let pk = [7u8; 32];
        let a = AccountId::from_public_key(&pk);
        let b = AccountId::from_public_key(&pk);
        assert_eq!(a, b);
        assert!(!a.is_sink());
        assert_ne!(a, AccountId::from_public_key(&[8u8; 32]));
    }

    #[test]
    fn serializes_as_json_string() {
        let json = serde_json::to_string(&AccountId::SINK).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "00".repeat(ACCOUNT_LEN)));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert!(back.is_sink());
    }
}
