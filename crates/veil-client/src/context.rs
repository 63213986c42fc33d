//! Per-operation context
//!
//! Every operation receives its collaborators explicitly — swarm directory,
//! crypto provider, clock, configuration, transport — instead of reading
//! ambient globals. Retry and concurrency behavior is then a function of
//! the arguments alone, and each collaborator is substitutable in tests.

use std::sync::Arc;

use async_trait::async_trait;

use veil_core::{Clock, NetworkConfig, Result};
use veil_crypto::CryptoProvider;
use veil_onion::TransportPayload;
use veil_swarm::{SwarmDirectory, SwarmNode};

use crate::destination::ResolvedTarget;

/// Raw response from the transport, before swarm-level decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Response body bytes
    pub body: Vec<u8>,
}

/// External transport dependency. Implementations perform the actual
/// network I/O; this crate only prepares payloads and interprets results.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an encrypted payload toward the resolved target.
    async fn send(
        &self,
        payload: TransportPayload,
        target: &ResolvedTarget,
    ) -> Result<TransportResponse>;

    /// Query a snode for its current network time in epoch milliseconds.
    async fn network_time(&self, node: &SwarmNode) -> Result<u64>;
}

/// Handles threaded through one logical operation (a call plus its
/// retries). Cloning is cheap; all fields are shared handles except the
/// read-only config.
#[derive(Clone)]
pub struct RequestContext {
    /// Swarm directory handle
    pub directory: Arc<SwarmDirectory>,
    /// Crypto capability
    pub crypto: Arc<dyn CryptoProvider>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Read-only network configuration
    pub config: NetworkConfig,
    /// Network transport
    pub transport: Arc<dyn Transport>,
}
