//! Swarm directory for the Veil client
//!
//! Maintains per-account cached sets of snode descriptors, refreshed
//! wholesale on demand through an external [`SwarmSource`], with
//! single-flight coalescing of concurrent refreshes and exclusion-aware
//! random node selection.

pub mod directory;
pub mod node;

pub use directory::{SwarmDirectory, SwarmSource};
pub use node::SwarmNode;
