//! Swarm endpoints
//!
//! The path string is part of the signing contract: verification bytes for
//! swarm requests start with these exact bytes.

use serde::{Deserialize, Serialize};

/// A snode or server endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Store a message in a namespace
    Store,
    /// Retrieve messages from a namespace
    Retrieve,
    /// Delete specific messages by hash
    Delete,
    /// Delete all messages before a cutoff time
    DeleteBefore,
    /// Update message expiries
    Expire,
    /// Fetch the swarm for an account
    GetSwarm,
    /// Node info (network time, version)
    Info,
    /// Resolve an ONS name
    OnsResolve,
}

impl Endpoint {
    /// The request path, byte-exact for signing.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Store => "/store",
            Self::Retrieve => "/retrieve",
            Self::Delete => "/delete",
            Self::DeleteBefore => "/delete_before",
            Self::Expire => "/expire",
            Self::GetSwarm => "/get_swarm",
            Self::Info => "/info",
            Self::OnsResolve => "/ons_resolve",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
