//! Request pipeline for the Veil swarm network
//!
//! Turns a caller's intent (store, retrieve, delete, expire, server call)
//! into a signed, onion-wrapped transport payload and drives it through
//! bounded retry: resolve a destination, sign the verification bytes,
//! wrap the body, send, decode, and on transient failure loop back with a
//! decremented budget and the failed node excluded.
//!
//! Actual network I/O lives behind the [`Transport`] trait; this crate
//! prepares payloads and interprets results.

pub mod auth;
pub mod context;
pub mod destination;
pub mod endpoint;
pub mod ons;
pub mod request;
pub mod response;
pub mod retry;
pub mod signer;

pub use auth::{AuthSignature, AuthenticationInfo};
pub use context::{RequestContext, Transport, TransportResponse};
pub use destination::{BodyBuilder, Destination, ResolvedTarget};
pub use endpoint::Endpoint;
pub use ons::decode_ons_response;
pub use request::{PreparedRequest, RequestBuilder};
pub use response::{
    decode_store_response, decode_swarm_response, MemberFailure, MemberResult, StoreItem,
    SwarmResponse,
};
pub use retry::{send_with_retries, WireRequest};
