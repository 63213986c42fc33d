//! Swarm directory
//!
//! Caches the set of snodes responsible for each account. Entries are
//! replaced wholesale on refresh, never merged. Concurrent refreshes for
//! the same account coalesce into a single in-flight fetch: the second
//! caller awaits the first's result instead of issuing a duplicate network
//! call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use veil_core::{AccountId, Result, VeilError};

use crate::node::SwarmNode;

/// External bootstrap path that fetches an account's swarm from the network.
#[async_trait]
pub trait SwarmSource: Send + Sync {
    /// Fetch the current node set for `account`.
    async fn fetch_swarm(&self, account: AccountId) -> Result<Vec<SwarmNode>>;
}

struct SwarmEntry {
    nodes: Vec<SwarmNode>,
    refreshed_at: Instant,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<Vec<SwarmNode>>>>;

/// Per-account cached snode sets with coalesced refresh.
pub struct SwarmDirectory {
    source: Arc<dyn SwarmSource>,
    max_age: Duration,
    cache: Mutex<HashMap<AccountId, SwarmEntry>>,
    inflight: Mutex<HashMap<AccountId, RefreshFuture>>,
}

impl SwarmDirectory {
    /// Create a directory over a bootstrap source.
    pub fn new(source: Arc<dyn SwarmSource>, max_age: Duration) -> Self {
        Self {
            source,
            max_age,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The node set for `account`, refreshing if stale or missing.
    ///
    /// Fails with `SwarmUnavailable` when the bootstrap path yields no
    /// nodes; a non-empty swarm is required before any random selection.
    pub async fn swarm(&self, account: AccountId) -> Result<Vec<SwarmNode>> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(&account) {
                if !entry.nodes.is_empty() && entry.refreshed_at.elapsed() < self.max_age {
                    return Ok(entry.nodes.clone());
                }
            }
        }
        self.refresh(account).await
    }

    /// Force a wholesale replace of the account's cached swarm.
    ///
    /// Concurrent calls for the same account share one fetch.
    pub async fn refresh(&self, account: AccountId) -> Result<Vec<SwarmNode>> {
        let fut = {
            let mut inflight = self.inflight.lock();
            if let Some(existing) = inflight.get(&account) {
                debug!(account = %account, "joining in-flight swarm refresh");
                existing.clone()
            } else {
                let source = Arc::clone(&self.source);
                let fut: RefreshFuture = async move {
                    let nodes = source.fetch_swarm(account).await?;
                    if nodes.is_empty() {
                        return Err(VeilError::swarm_unavailable(format!(
                            "bootstrap returned no nodes for {account}"
                        )));
                    }
                    Ok(nodes)
                }
                .boxed()
                .shared();
                inflight.insert(account, fut.clone());
                fut
            }
        };

        let result = fut.clone().await;
        {
            // Every awaiter passes through here; only the future that
            // actually completed may clear the slot, since a newer refresh
            // for the account may already occupy it.
            let mut inflight = self.inflight.lock();
            if inflight
                .get(&account)
                .is_some_and(|current| current.ptr_eq(&fut))
            {
                inflight.remove(&account);
            }
        }

        match result {
            Ok(nodes) => {
                debug!(account = %account, count = nodes.len(), "swarm refreshed");
                self.cache.lock().insert(
                    account,
                    SwarmEntry {
                        nodes: nodes.clone(),
                        refreshed_at: Instant::now(),
                    },
                );
                Ok(nodes)
            }
            Err(e) => {
                warn!(account = %account, error = %e, "swarm refresh failed");
                Err(e)
            }
        }
    }

    /// Draw a uniformly random node for `account`, excluding nodes already
    /// marked failed for the current logical operation.
    pub async fn random_node(
        &self,
        account: AccountId,
        excluded: &HashSet<[u8; 32]>,
    ) -> Result<SwarmNode> {
        let nodes = self.swarm(account).await?;
        let candidates: Vec<&SwarmNode> = nodes
            .iter()
            .filter(|n| !excluded.contains(&n.ed25519_pub))
            .collect();

        candidates
            .choose(&mut rand::thread_rng())
            .map(|n| (*n).clone())
            .ok_or_else(|| {
                VeilError::swarm_unavailable(format!(
                    "no candidate nodes for {account} ({} excluded of {})",
                    excluded.len(),
                    nodes.len()
                ))
            })
    }

    /// Drop the cached entry for an account (next read refreshes).
    pub fn invalidate(&self, account: AccountId) {
        self.cache.lock().remove(&account);
    }

    /// All currently cached nodes across accounts, deduplicated. Used as
    /// the relay pool for onion path building.
    pub fn known_nodes(&self) -> Vec<SwarmNode> {
        let cache = self.cache.lock();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in cache.values() {
            for node in &entry.nodes {
                if seen.insert(node.ed25519_pub) {
                    out.push(node.clone());
                }
            }
        }
        out
    }
}
