//! Account identifiers
//!
//! An account id is 33 bytes on the wire: a one-byte prefix describing the
//! key's role followed by a 32-byte public key, rendered as 66 hex
//! characters. The prefix distinguishes standard ids from the two blinded
//! generations and from group ids, and is load-bearing: blinded-identity
//! verification derives the required blinding generation from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, VeilError};

/// Role prefix of an account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    /// Standard account id (`05`)
    Standard,
    /// Blinded id, generation 15 (`15`)
    Blinded15,
    /// Blinded id, generation 25 (`25`)
    Blinded25,
    /// Group id (`03`)
    Group,
}

impl IdPrefix {
    /// Decode a prefix byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x05 => Ok(Self::Standard),
            0x15 => Ok(Self::Blinded15),
            0x25 => Ok(Self::Blinded25),
            0x03 => Ok(Self::Group),
            other => Err(VeilError::decode(format!(
                "unknown account id prefix: {other:#04x}"
            ))),
        }
    }

    /// The wire byte for this prefix.
    pub fn byte(&self) -> u8 {
        match self {
            Self::Standard => 0x05,
            Self::Blinded15 => 0x15,
            Self::Blinded25 => 0x25,
            Self::Group => 0x03,
        }
    }
}

/// A 33-byte account identifier (prefix + public key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId {
    prefix: IdPrefix,
    public_key: [u8; 32],
}

impl AccountId {
    /// Build an id from a prefix and raw public key bytes.
    pub fn new(prefix: IdPrefix, public_key: [u8; 32]) -> Self {
        Self { prefix, public_key }
    }

    /// Parse the 66-character hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| VeilError::decode(format!("account id is not hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Parse the 33-byte wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 {
            return Err(VeilError::decode(format!(
                "account id must be 33 bytes, got {}",
                bytes.len()
            )));
        }
        let prefix = IdPrefix::from_byte(bytes[0])?;
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&bytes[1..]);
        Ok(Self { prefix, public_key })
    }

    /// The role prefix.
    pub fn prefix(&self) -> IdPrefix {
        self.prefix
    }

    /// The 32-byte public key portion.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// The 33-byte wire form.
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.prefix.byte();
        out[1..].copy_from_slice(&self.public_key);
        out
    }

    /// The 66-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for AccountId {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
