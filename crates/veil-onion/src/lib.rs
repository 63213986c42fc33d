//! Onion routing for the Veil client
//!
//! Builds multi-hop relay paths from the swarm directory's node pool and
//! wraps signed request bodies in per-hop encryption layers, so each relay
//! learns only the next hop and never the payload or final destination.

pub mod encrypt;
pub mod path;

pub use encrypt::{
    encrypt_for_transport, open_layer, parse_layer, OnionTarget, RouteStep, TransportPayload,
};
pub use path::{build_path, OnionPath, DEFAULT_PATH_LEN};
