//! Network configuration and clock abstraction
//!
//! Configuration is carried explicitly in a per-operation context rather
//! than read from process globals; it is read-only for the lifetime of a
//! request.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// How requests reach the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoutingMode {
    /// Layered encryption across a multi-hop relay path (production default)
    #[default]
    Onion,
    /// Alternate low-level transport routing; single-sealed, no relay layers
    Lokinet,
    /// Unencrypted single hop. Not for production traffic.
    Direct,
}

/// Process-level network settings, fixed for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Routing mode for outbound requests
    pub routing_mode: RoutingMode,
    /// Deadline covering path build plus round trip
    pub request_timeout: Duration,
    /// Default retry budget for random-snode destinations
    pub default_retry_budget: u8,
    /// Swarm cache entries older than this are refreshed on read
    pub swarm_max_age: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            routing_mode: RoutingMode::Onion,
            request_timeout: Duration::from_secs(10),
            default_retry_budget: 8,
            swarm_max_age: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Time source, substitutable in tests.
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds.
    fn now_ms(&self) -> u64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing_mode_is_onion() {
        assert_eq!(NetworkConfig::default().routing_mode, RoutingMode::Onion);
    }

    #[test]
    fn test_system_clock_is_epoch_ms() {
        // Sanity bound: after 2023-01-01, before 2100.
        let now = SystemClock.now_ms();
        assert!(now > 1_672_531_200_000);
        assert!(now < 4_102_444_800_000);
    }
}
