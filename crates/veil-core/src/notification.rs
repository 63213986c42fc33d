//! Push-notification metadata decoding
//!
//! Push payloads carry a compact keyed object describing a stored message
//! without its content. Decoding is deliberately lenient: an absent
//! namespace yields [`Namespace::Unknown`] and an absent `B` flag yields
//! `false`, since the push server adds fields over time.

use serde::{Deserialize, Deserializer};

use crate::identity::AccountId;
use crate::namespace::Namespace;

/// Metadata describing a message that arrived via push.
///
/// Wire form:
/// `{"@": accountId, "#": hash, "n": namespace, "t": createdMs,
///   "z": expirationMs, "l": dataLength, "B": 0/1}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationMetadata {
    /// Target account id
    #[serde(rename = "@")]
    pub account_id: AccountId,
    /// Server-assigned message hash
    #[serde(rename = "#")]
    pub hash: String,
    /// Storage namespace; absent or unmapped values decode to `Unknown`
    #[serde(rename = "n", default = "unknown_namespace")]
    pub namespace: Namespace,
    /// Creation timestamp, epoch milliseconds
    #[serde(rename = "t")]
    pub created_timestamp_ms: u64,
    /// Expiration timestamp, epoch milliseconds
    #[serde(rename = "z")]
    pub expiration_timestamp_ms: u64,
    /// Length of the stored message data in bytes
    #[serde(rename = "l")]
    pub data_length: u64,
    /// Set when the push payload omitted the content because it was too large
    #[serde(rename = "B", default, deserialize_with = "int_flag")]
    pub data_too_long: bool,
}

fn unknown_namespace() -> Namespace {
    Namespace::Unknown
}

fn int_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(raw != 0)
}
