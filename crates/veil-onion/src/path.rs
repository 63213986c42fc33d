//! Onion path construction
//!
//! A path is an ordered set of distinct relay snodes drawn from the
//! directory's known-node pool. Path construction failing is a retryable
//! condition distinct from destination resolution failure: the retry
//! coordinator may build a new path without re-resolving the target snode.

use rand::seq::SliceRandom;
use tracing::debug;

use veil_core::{Result, VeilError};
use veil_swarm::SwarmNode;

/// Number of relay hops in a standard path.
pub const DEFAULT_PATH_LEN: usize = 3;

/// An ordered multi-hop relay path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnionPath {
    hops: Vec<SwarmNode>,
}

impl OnionPath {
    /// The relay hops in order, entry node first.
    pub fn hops(&self) -> &[SwarmNode] {
        &self.hops
    }

    /// The entry node the transport payload is sent to.
    pub fn entry(&self) -> &SwarmNode {
        // Construction guarantees at least one hop.
        &self.hops[0]
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Whether the path has no hops (never true for built paths).
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Build a path of `hop_count` distinct relays from `pool`, avoiding the
/// destination node so a snode never relays traffic addressed to itself.
pub fn build_path(
    pool: &[SwarmNode],
    hop_count: usize,
    avoid_ed25519: Option<&[u8; 32]>,
) -> Result<OnionPath> {
    if hop_count == 0 {
        return Err(VeilError::path_build_failed("hop count must be non-zero"));
    }

    let candidates: Vec<&SwarmNode> = pool
        .iter()
        .filter(|n| avoid_ed25519.map_or(true, |avoid| &n.ed25519_pub != avoid))
        .collect();

    if candidates.len() < hop_count {
        return Err(VeilError::path_build_failed(format!(
            "pool has {} candidates, need {hop_count}",
            candidates.len()
        )));
    }

    let hops: Vec<SwarmNode> = candidates
        .choose_multiple(&mut rand::thread_rng(), hop_count)
        .map(|n| (*n).clone())
        .collect();

    debug!(
        entry = %hops[0].short_id(),
        hops = hops.len(),
        "built onion path"
    );
    Ok(OnionPath { hops })
}
