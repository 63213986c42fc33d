//! Request destinations and resolution
//!
//! A [`Destination`] is a tagged union; exactly one variant is active per
//! request and the variant determines which authentication scheme applies.
//! Resolution turns the abstract target into a dispatchable one, drawing
//! random snodes from the swarm directory with per-operation exclusion and
//! injecting a fresh network timestamp where the variant requires one.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use veil_core::{AccountId, Result, VeilError};
use veil_onion::OnionTarget;
use veil_swarm::SwarmNode;

use crate::context::RequestContext;
use crate::endpoint::Endpoint;

/// Rebuilds a request body once the chosen snode's network time is known.
///
/// Guarantees the signed timestamp is one the node will accept within its
/// clock-skew tolerance.
pub type BodyBuilder = Arc<dyn Fn(u64) -> Result<Vec<u8>> + Send + Sync>;

/// Abstract request target.
#[derive(Clone)]
pub enum Destination {
    /// A specific snode, passed through unchanged
    Snode {
        /// The target node
        node: SwarmNode,
        /// Swarm the node is expected to serve, when relevant
        swarm_pubkey: Option<AccountId>,
    },
    /// A uniformly random snode from the account's swarm
    RandomSnode {
        /// The account whose swarm to draw from
        swarm_pubkey: AccountId,
        /// Remaining draws for this logical operation
        retry_budget: u8,
    },
    /// A random snode whose own clock supplies the signed timestamp
    RandomSnodeLatestNetworkTime {
        /// The account whose swarm to draw from
        swarm_pubkey: AccountId,
        /// Remaining draws for this logical operation
        retry_budget: u8,
        /// Rebuilds the signed body for the fetched timestamp
        build_body: BodyBuilder,
    },
    /// An open-group / network server
    Server {
        /// Server host
        host: String,
        /// Server port
        port: u16,
        /// Server X25519 public key
        x25519_pk: [u8; 32],
        /// Query parameters appended to the endpoint path
        query_params: BTreeMap<String, String>,
    },
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snode { node, swarm_pubkey } => f
                .debug_struct("Snode")
                .field("node", &node.short_id())
                .field("swarm_pubkey", swarm_pubkey)
                .finish(),
            Self::RandomSnode {
                swarm_pubkey,
                retry_budget,
            } => f
                .debug_struct("RandomSnode")
                .field("swarm_pubkey", swarm_pubkey)
                .field("retry_budget", retry_budget)
                .finish(),
            Self::RandomSnodeLatestNetworkTime {
                swarm_pubkey,
                retry_budget,
                ..
            } => f
                .debug_struct("RandomSnodeLatestNetworkTime")
                .field("swarm_pubkey", swarm_pubkey)
                .field("retry_budget", retry_budget)
                .finish_non_exhaustive(),
            Self::Server { host, port, .. } => f
                .debug_struct("Server")
                .field("host", host)
                .field("port", port)
                .finish_non_exhaustive(),
        }
    }
}

impl Destination {
    /// The retry budget for random-snode variants.
    pub fn retry_budget(&self) -> Option<u8> {
        match self {
            Self::RandomSnode { retry_budget, .. }
            | Self::RandomSnodeLatestNetworkTime { retry_budget, .. } => Some(*retry_budget),
            _ => None,
        }
    }

    /// Whether resolution draws a random node (and consumes budget).
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            Self::RandomSnode { .. } | Self::RandomSnodeLatestNetworkTime { .. }
        )
    }

    /// The endpoint path plus encoded query parameters, for server targets.
    pub fn path_and_query(&self, endpoint: Endpoint) -> String {
        match self {
            Self::Server { query_params, .. } if !query_params.is_empty() => {
                let query: Vec<String> = query_params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                format!("{}?{}", endpoint.path(), query.join("&"))
            }
            _ => endpoint.path().to_string(),
        }
    }
}

/// A dispatchable target produced by resolution.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The chosen snode, absent for server targets
    pub node: Option<SwarmNode>,
    /// Where the innermost encryption layer is addressed
    pub onion_target: OnionTarget,
    /// Body rebuilt against the fetched network time, when the destination
    /// required one
    pub rebuilt_body: Option<Vec<u8>>,
    /// The network timestamp used for the rebuild
    pub network_timestamp_ms: Option<u64>,
}

fn snode_target(node: &SwarmNode) -> OnionTarget {
    OnionTarget::Snode {
        address: node.address.clone(),
        port: node.port,
        ed25519_pub: node.ed25519_pub,
        x25519_pub: node.x25519_pub,
    }
}

/// Resolve a destination into a dispatchable target.
///
/// Random variants consume one unit of `budget` per draw and fail with
/// `RetryBudgetExhausted` when the budget reaches zero; nodes in `excluded`
/// are never drawn.
pub async fn resolve(
    ctx: &RequestContext,
    destination: &Destination,
    excluded: &HashSet<[u8; 32]>,
    budget: &mut u8,
) -> Result<ResolvedTarget> {
    match destination {
        Destination::Snode { node, .. } => Ok(ResolvedTarget {
            node: Some(node.clone()),
            onion_target: snode_target(node),
            rebuilt_body: None,
            network_timestamp_ms: None,
        }),

        Destination::RandomSnode { swarm_pubkey, .. } => {
            let node = draw(ctx, *swarm_pubkey, excluded, budget).await?;
            Ok(ResolvedTarget {
                onion_target: snode_target(&node),
                node: Some(node),
                rebuilt_body: None,
                network_timestamp_ms: None,
            })
        }

        Destination::RandomSnodeLatestNetworkTime {
            swarm_pubkey,
            build_body,
            ..
        } => {
            let node = draw(ctx, *swarm_pubkey, excluded, budget).await?;
            let timestamp_ms = ctx.transport.network_time(&node).await?;
            debug!(node = %node.short_id(), timestamp_ms, "fetched network time");
            let body = build_body(timestamp_ms)?;
            Ok(ResolvedTarget {
                onion_target: snode_target(&node),
                node: Some(node),
                rebuilt_body: Some(body),
                network_timestamp_ms: Some(timestamp_ms),
            })
        }

        Destination::Server {
            host,
            port,
            x25519_pk,
            ..
        } => Ok(ResolvedTarget {
            node: None,
            onion_target: OnionTarget::Server {
                host: host.clone(),
                port: *port,
                x25519_pub: *x25519_pk,
            },
            rebuilt_body: None,
            network_timestamp_ms: None,
        }),
    }
}

async fn draw(
    ctx: &RequestContext,
    swarm_pubkey: AccountId,
    excluded: &HashSet<[u8; 32]>,
    budget: &mut u8,
) -> Result<SwarmNode> {
    if *budget == 0 {
        return Err(VeilError::retry_budget_exhausted(format!(
            "no draws left for {swarm_pubkey}"
        )));
    }
    *budget -= 1;
    ctx.directory.random_node(swarm_pubkey, excluded).await
}
