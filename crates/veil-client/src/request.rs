//! Prepared requests
//!
//! A [`PreparedRequest`] is built once per attempt and never reused: a
//! retry constructs a fresh one against a newly selected destination while
//! the logical operation's remaining budget carries over. Builders compute
//! signatures from final values only; destinations that need the chosen
//! node's network time defer body construction through a
//! [`BodyBuilder`](crate::destination::BodyBuilder) closure instead of
//! signing early.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;

use veil_core::{Clock, Namespace, Result};
use veil_crypto::CryptoProvider;

use crate::auth::AuthenticationInfo;
use crate::destination::{Destination, ResolvedTarget};
use crate::endpoint::Endpoint;
use crate::signer;

/// Recomputes headers once the destination and timestamp are final.
///
/// Used by server requests, whose signed material includes the full URL
/// path and query that only exist after resolution.
pub type PostSignHook =
    Arc<dyn Fn(&ResolvedTarget, u64) -> Result<Vec<(String, String)>> + Send + Sync>;

/// One dispatchable request attempt.
#[derive(Clone)]
pub struct PreparedRequest {
    /// Target endpoint
    pub endpoint: Endpoint,
    /// HTTP method; part of the signed material for server requests, so the
    /// wire envelope must carry exactly this value
    pub method: &'static str,
    /// Abstract destination, resolved per attempt
    pub destination: Destination,
    /// Serialized body (may be replaced by a network-time rebuild)
    pub body: Vec<u8>,
    /// Precomputed headers
    pub headers: Vec<(String, String)>,
    /// Deadline covering path build plus round trip
    pub timeout: Duration,
    /// Post-hoc signing step, applied after resolution
    pub post_sign: Option<PostSignHook>,
}

impl std::fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("destination", &self.destination)
            .field("body_len", &self.body.len())
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("post_sign", &self.post_sign.is_some())
            .finish()
    }
}

/// Builds prepared requests with shared crypto, clock, and budget defaults.
pub struct RequestBuilder {
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
    default_budget: u8,
    timeout: Duration,
}

impl RequestBuilder {
    /// Create a builder.
    pub fn new(
        crypto: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
        default_budget: u8,
        timeout: Duration,
    ) -> Self {
        Self {
            crypto,
            clock,
            default_budget,
            timeout,
        }
    }

    /// Store `data` in `namespace` on the account's swarm.
    pub fn store(
        &self,
        auth: &AuthenticationInfo,
        namespace: Namespace,
        data: &[u8],
        ttl_ms: u64,
    ) -> Result<PreparedRequest> {
        let account = auth.account_id(self.crypto.as_ref())?;
        let timestamp_ms = self.clock.now_ms();

        let verification =
            signer::swarm_request_bytes(Endpoint::Store, Some(namespace), timestamp_ms);
        let sig = auth.sign(self.crypto.as_ref(), &verification)?;

        let mut body = json!({
            "pubkey": sig.pubkey,
            "namespace": namespace,
            "data": BASE64.encode(data),
            "timestamp": timestamp_ms,
            "ttl": ttl_ms,
            "signature": sig.signature,
        });
        if let Some(subaccount) = &sig.subaccount_auth_data {
            body["subaccount"] = json!(subaccount);
        }

        Ok(PreparedRequest {
            endpoint: Endpoint::Store,
            method: "POST",
            destination: Destination::RandomSnode {
                swarm_pubkey: account,
                retry_budget: self.default_budget,
            },
            body: serde_json::to_vec(&body)?,
            headers: Vec::new(),
            timeout: self.timeout,
            post_sign: None,
        })
    }

    /// Retrieve messages from `namespace`, signing with the chosen snode's
    /// own clock so the timestamp falls within its skew tolerance.
    pub fn retrieve(
        &self,
        auth: &AuthenticationInfo,
        namespace: Namespace,
        last_hash: Option<String>,
    ) -> Result<PreparedRequest> {
        let account = auth.account_id(self.crypto.as_ref())?;
        let crypto = Arc::clone(&self.crypto);
        let auth = auth.clone();

        let build_body = Arc::new(move |timestamp_ms: u64| -> Result<Vec<u8>> {
            let verification =
                signer::swarm_request_bytes(Endpoint::Retrieve, Some(namespace), timestamp_ms);
            let sig = auth.sign(crypto.as_ref(), &verification)?;

            let mut body = json!({
                "pubkey": sig.pubkey,
                "namespace": namespace,
                "timestamp": timestamp_ms,
                "signature": sig.signature,
            });
            if let Some(hash) = &last_hash {
                body["last_hash"] = json!(hash);
            }
            if let Some(subaccount) = &sig.subaccount_auth_data {
                body["subaccount"] = json!(subaccount);
            }
            Ok(serde_json::to_vec(&body)?)
        });

        Ok(PreparedRequest {
            endpoint: Endpoint::Retrieve,
            method: "POST",
            destination: Destination::RandomSnodeLatestNetworkTime {
                swarm_pubkey: account,
                retry_budget: self.default_budget,
                build_body,
            },
            // Placeholder; resolution supplies the signed body.
            body: Vec::new(),
            headers: Vec::new(),
            timeout: self.timeout,
            post_sign: None,
        })
    }

    /// Delete all messages before `before_ms`, across all namespaces when
    /// `namespace` is `None`.
    pub fn delete_before(
        &self,
        auth: &AuthenticationInfo,
        namespace: Option<Namespace>,
        before_ms: u64,
    ) -> Result<PreparedRequest> {
        let account = auth.account_id(self.crypto.as_ref())?;

        let verification = signer::delete_before_bytes(namespace, before_ms);
        let sig = auth.sign(self.crypto.as_ref(), &verification)?;

        let namespace_value = match namespace {
            Some(ns) => json!(ns),
            None => json!("all"),
        };
        let body = json!({
            "pubkey": sig.pubkey,
            "before": before_ms,
            "namespace": namespace_value,
            "signature": sig.signature,
        });

        Ok(PreparedRequest {
            endpoint: Endpoint::DeleteBefore,
            method: "POST",
            destination: Destination::RandomSnode {
                swarm_pubkey: account,
                retry_budget: self.default_budget,
            },
            body: serde_json::to_vec(&body)?,
            headers: Vec::new(),
            timeout: self.timeout,
            post_sign: None,
        })
    }

    /// Update the expiry of the given message hashes.
    pub fn expire(
        &self,
        auth: &AuthenticationInfo,
        message_hashes: Vec<String>,
        expiry_ms: u64,
    ) -> Result<PreparedRequest> {
        let account = auth.account_id(self.crypto.as_ref())?;

        let verification = signer::expire_bytes(expiry_ms, &message_hashes);
        let sig = auth.sign(self.crypto.as_ref(), &verification)?;

        let body = json!({
            "pubkey": sig.pubkey,
            "messages": message_hashes,
            "expiry": expiry_ms,
            "signature": sig.signature,
        });

        Ok(PreparedRequest {
            endpoint: Endpoint::Expire,
            method: "POST",
            destination: Destination::RandomSnode {
                swarm_pubkey: account,
                retry_budget: self.default_budget,
            },
            body: serde_json::to_vec(&body)?,
            headers: Vec::new(),
            timeout: self.timeout,
            post_sign: None,
        })
    }

    /// A network-server request authenticated with a blinded key. Headers
    /// are computed post-hoc once the final URL path and query are known.
    pub fn server(
        &self,
        auth: &AuthenticationInfo,
        endpoint: Endpoint,
        method: &'static str,
        host: String,
        port: u16,
        server_x25519_pk: [u8; 32],
        query_params: BTreeMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<PreparedRequest> {
        let destination = Destination::Server {
            host,
            port,
            x25519_pk: server_x25519_pk,
            query_params,
        };
        let path_and_query = destination.path_and_query(endpoint);

        let crypto = Arc::clone(&self.crypto);
        let auth = auth.clone();
        let hook_body = body.clone();
        let post_sign: PostSignHook = Arc::new(move |_target, timestamp_ms| {
            let verification = signer::server_request_bytes(
                timestamp_ms,
                method,
                &path_and_query,
                hook_body.as_deref(),
            );
            let sig = auth.sign(crypto.as_ref(), &verification)?;
            Ok(vec![
                ("X-Veil-Pubkey".to_string(), sig.pubkey),
                ("X-Veil-Timestamp".to_string(), timestamp_ms.to_string()),
                ("X-Veil-Signature".to_string(), sig.signature),
            ])
        });

        Ok(PreparedRequest {
            endpoint,
            method,
            destination,
            body: body.unwrap_or_default(),
            headers: Vec::new(),
            timeout: self.timeout,
            post_sign: Some(post_sign),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{AccountId, IdPrefix, VeilError};
    use veil_crypto::{public_key_for_secret, BlindingGeneration, DalekProvider};

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    fn builder(now_ms: u64) -> RequestBuilder {
        RequestBuilder::new(
            Arc::new(DalekProvider),
            Arc::new(FixedClock(now_ms)),
            4,
            Duration::from_secs(10),
        )
    }

    fn standard_auth() -> AuthenticationInfo {
        let secret = [7u8; 32].to_vec();
        let pk = public_key_for_secret(&secret).unwrap();
        AuthenticationInfo::Standard {
            account_id: AccountId::new(IdPrefix::Standard, pk),
            ed25519_secret: secret,
        }
    }

    #[test]
    fn test_store_body_carries_signed_fields() {
        let request = builder(1_700_000_000_000)
            .store(&standard_auth(), Namespace::Default, b"hello", 86_400_000)
            .unwrap();

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["timestamp"], 1_700_000_000_000u64);
        assert_eq!(body["namespace"], 0);
        assert_eq!(body["ttl"], 86_400_000u64);
        assert!(body["signature"].is_string());

        // Signature verifies against the swarm-request contract bytes.
        let crypto = DalekProvider;
        let verification =
            signer::swarm_request_bytes(Endpoint::Store, Some(Namespace::Default), 1_700_000_000_000);
        let pubkey = AccountId::from_hex(body["pubkey"].as_str().unwrap()).unwrap();
        let sig = BASE64
            .decode(body["signature"].as_str().unwrap())
            .unwrap();
        assert!(crypto.verify(pubkey.public_key(), &verification, &sig));
    }

    #[test]
    fn test_delete_before_all_namespaces() {
        let request = builder(1)
            .delete_before(&standard_auth(), None, 1_700_000_000_000)
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["namespace"], "all");
        assert_eq!(body["before"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_retrieve_defers_signing_to_network_time() {
        let request = builder(1)
            .retrieve(&standard_auth(), Namespace::Default, None)
            .unwrap();
        assert!(request.body.is_empty());

        let Destination::RandomSnodeLatestNetworkTime { build_body, .. } = &request.destination
        else {
            panic!("expected latest-network-time destination");
        };
        let body: serde_json::Value =
            serde_json::from_slice(&build_body(1_700_000_000_555).unwrap()).unwrap();
        assert_eq!(body["timestamp"], 1_700_000_000_555u64);
    }

    #[test]
    fn test_server_request_signs_post_hoc() {
        let auth = AuthenticationInfo::Blinded {
            server_pk: [0x11; 32],
            generation: BlindingGeneration::Gen15,
            ed25519_secret: [9u8; 32].to_vec(),
        };
        let mut params = BTreeMap::new();
        params.insert("limit".into(), "5".into());
        let request = builder(1)
            .server(
                &auth,
                Endpoint::Retrieve,
                "GET",
                "open.example.org".into(),
                443,
                [0x11; 32],
                params,
                None,
            )
            .unwrap();

        let hook = request.post_sign.as_ref().unwrap();
        let target = ResolvedTarget {
            node: None,
            onion_target: veil_onion::OnionTarget::Server {
                host: "open.example.org".into(),
                port: 443,
                x25519_pub: [0x11; 32],
            },
            rebuilt_body: None,
            network_timestamp_ms: None,
        };
        let headers = hook(&target, 1_700_000_000_000).unwrap();
        let names: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["X-Veil-Pubkey", "X-Veil-Timestamp", "X-Veil-Signature"]
        );

        // The signed pubkey carries the blinded generation prefix.
        let pubkey = AccountId::from_hex(&headers[0].1).unwrap();
        assert_eq!(pubkey.prefix(), IdPrefix::Blinded15);
    }

    #[test]
    fn test_builder_propagates_signing_failure() {
        let auth = AuthenticationInfo::Standard {
            account_id: AccountId::new(IdPrefix::Standard, [1; 32]),
            ed25519_secret: vec![0u8; 5],
        };
        let err = builder(1)
            .store(&auth, Namespace::Default, b"x", 1)
            .unwrap_err();
        assert!(matches!(err, VeilError::KeyGenerationFailed { .. }));
    }
}
