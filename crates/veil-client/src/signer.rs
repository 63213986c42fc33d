//! Verification-byte contracts
//!
//! The byte sequences built here are wire protocol, not implementation
//! detail: the server-side verifier concatenates the same fields with no
//! separators, so any divergence between the bytes signed and the bytes
//! sent is a hard protocol violation. These functions must only ever
//! receive final values — a timestamp or body that changes after signing
//! invalidates the request.

use veil_core::{verification_string, Namespace};

use crate::endpoint::Endpoint;

/// Verification bytes for a swarm request:
/// `path ++ namespace ++ ascii(timestamp_ms)`.
///
/// The namespace signs as its stringified raw value, or the `"all"`
/// sentinel when unspecified.
pub fn swarm_request_bytes(
    endpoint: Endpoint,
    namespace: Option<Namespace>,
    timestamp_ms: u64,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(endpoint.path().as_bytes());
    out.extend_from_slice(verification_string(namespace).as_bytes());
    out.extend_from_slice(timestamp_ms.to_string().as_bytes());
    out
}

/// Verification bytes for delete-before-time: the same shape as a swarm
/// request with the cutoff substituted for the timestamp.
pub fn delete_before_bytes(namespace: Option<Namespace>, before_ms: u64) -> Vec<u8> {
    swarm_request_bytes(Endpoint::DeleteBefore, namespace, before_ms)
}

/// Verification bytes for an expiry update:
/// `path ++ ascii(expiry_ms) ++ hashes joined with no separator`.
pub fn expire_bytes(expiry_ms: u64, message_hashes: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(Endpoint::Expire.path().as_bytes());
    out.extend_from_slice(expiry_ms.to_string().as_bytes());
    for hash in message_hashes {
        out.extend_from_slice(hash.as_bytes());
    }
    out
}

/// Verification bytes for a network-server request:
/// `ascii(timestamp) ++ method ++ path_and_query ++ body`.
pub fn server_request_bytes(
    timestamp_ms: u64,
    method: &str,
    path_and_query: &str,
    body: Option<&[u8]>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(timestamp_ms.to_string().as_bytes());
    out.extend_from_slice(method.as_bytes());
    out.extend_from_slice(path_and_query.as_bytes());
    if let Some(body) = body {
        out.extend_from_slice(body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_before_contract_example() {
        // The concrete example from the protocol contract: path, "all"
        // sentinel, then the cutoff in ASCII decimal, no separators.
        let bytes = delete_before_bytes(None, 1_700_000_000_000);
        assert_eq!(bytes, b"/delete_beforeall1700000000000".to_vec());
    }

    #[test]
    fn test_namespace_signs_as_raw_value() {
        let bytes = swarm_request_bytes(
            Endpoint::Retrieve,
            Some(Namespace::LegacyClosedGroup),
            1_700_000_000_001,
        );
        assert_eq!(bytes, b"/retrieve-101700000000001".to_vec());
    }

    #[test]
    fn test_store_default_namespace() {
        let bytes = swarm_request_bytes(Endpoint::Store, Some(Namespace::Default), 42);
        assert_eq!(bytes, b"/store042".to_vec());
    }

    #[test]
    fn test_expire_concatenates_hashes() {
        let hashes = vec!["abc".to_string(), "def".to_string()];
        let bytes = expire_bytes(1000, &hashes);
        assert_eq!(bytes, b"/expire1000abcdef".to_vec());
    }

    proptest::proptest! {
        #[test]
        fn prop_swarm_bytes_are_exact_concatenation(timestamp_ms: u64, raw in -20i32..20) {
            let namespace = Namespace::from_raw(raw);
            let bytes = swarm_request_bytes(Endpoint::Store, Some(namespace), timestamp_ms);
            let expected = format!(
                "/store{}{timestamp_ms}",
                verification_string(Some(namespace))
            );
            proptest::prop_assert_eq!(bytes, expected.into_bytes());
        }
    }

    #[test]
    fn test_server_request_bytes() {
        let bytes = server_request_bytes(99, "POST", "/room/token?x=1", Some(b"{}"));
        assert_eq!(bytes, b"99POST/room/token?x=1{}".to_vec());

        let no_body = server_request_bytes(99, "GET", "/room", None);
        assert_eq!(no_body, b"99GET/room".to_vec());
    }
}
