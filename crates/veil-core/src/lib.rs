//! Core types for the Veil swarm client
//!
//! Leaf crate with no async or crypto dependencies: the unified error type,
//! storage namespaces, account identifiers, push-notification metadata, and
//! network configuration shared by every other Veil crate.

pub mod config;
pub mod error;
pub mod identity;
pub mod namespace;
pub mod notification;

pub use config::{Clock, NetworkConfig, RoutingMode, SystemClock};
pub use error::{is_transient_status, Result, VeilError};
pub use identity::{AccountId, IdPrefix};
pub use namespace::{verification_string, Namespace};
pub use notification::NotificationMetadata;
