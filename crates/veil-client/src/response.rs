//! Swarm response decoding
//!
//! A swarm response aggregates per-member results under a parent object:
//! each swarm member reports its own success or failure, and one member
//! rejecting a message must not invalidate its siblings. Callers inspect
//! the per-member map, never a single aggregate boolean. Decoding is
//! lenient where the wire format has grown over time (`already` defaults to
//! false, unknown fields are ignored).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use veil_core::{Result, VeilError};

/// Parent response with a per-member result map.
#[derive(Debug, Clone, Deserialize)]
pub struct SwarmResponse<T> {
    /// Proof-of-work difficulty reported by the target node
    #[serde(default)]
    pub difficulty: Option<i64>,
    /// Hash assigned by the target node
    #[serde(default)]
    pub hash: Option<String>,
    /// Per-member results keyed by node identifier
    #[serde(default = "BTreeMap::new")]
    pub swarm: BTreeMap<String, MemberResult<T>>,
}

/// One swarm member's result: operation-specific success data or a
/// member-local failure. A member failing here is structured data, not an
/// error for the whole response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MemberResult<T> {
    /// The member processed the operation
    Success(T),
    /// The member reported a failure
    Failure(MemberFailure),
}

impl<T> MemberResult<T> {
    /// The success payload, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(item) => Some(item),
            Self::Failure(_) => None,
        }
    }

    /// Whether this member failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// A member-local failure report.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberFailure {
    /// Always true on the wire for failure entries
    #[serde(default)]
    pub failed: bool,
    /// Member-reported status code
    #[serde(default)]
    pub code: Option<i64>,
    /// Member-reported reason
    #[serde(default)]
    pub reason: Option<String>,
}

/// Store result for one swarm member.
///
/// `already: true` means the message was previously stored — a success
/// signal, not an error: the hash remains valid and signed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreItem {
    /// Hash of the stored message
    pub hash: String,
    /// Whether the message was already present
    #[serde(default)]
    pub already: bool,
}

impl<T> SwarmResponse<T> {
    /// Whether every member reported failure (an empty map is not a
    /// failure; transport-level errors are handled before decoding).
    pub fn all_failed(&self) -> bool {
        !self.swarm.is_empty() && self.swarm.values().all(MemberResult::is_failure)
    }
}

/// Decode a swarm response body.
pub fn decode_swarm_response<T: DeserializeOwned>(body: &[u8]) -> Result<SwarmResponse<T>> {
    serde_json::from_slice(body)
        .map_err(|e| VeilError::decode(format!("swarm response: {e}")))
}

/// Decode a store response:
/// `{"difficulty", "hash", "swarm": {node_id: {"hash", "already"}}}`.
pub fn decode_store_response(body: &[u8]) -> Result<SwarmResponse<StoreItem>> {
    decode_swarm_response(body)
}
