//! Layered request encryption
//!
//! Wraps a signed request body in sequential encryption layers across a
//! relay path. The innermost layer is sealed to the final destination's
//! X25519 key; each outer layer is sealed to a relay and reveals only the
//! next hop. Each layer uses a fresh ephemeral X25519 key, so no two layers
//! share key material.
//!
//! `Lokinet` mode seals once to the destination with no relay layers;
//! `Direct` passes the body through untouched and exists for local testing
//! only.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use veil_core::{Result, RoutingMode, VeilError};
use veil_crypto::CryptoProvider;

use crate::path::OnionPath;

/// Final destination of an onion-wrapped request.
#[derive(Debug, Clone)]
pub enum OnionTarget {
    /// A specific snode
    Snode {
        /// Node address
        address: String,
        /// HTTPS port
        port: u16,
        /// Node identity key
        ed25519_pub: [u8; 32],
        /// Node encryption key
        x25519_pub: [u8; 32],
    },
    /// An open-group / network server
    Server {
        /// Server host name
        host: String,
        /// Server port
        port: u16,
        /// Server X25519 public key
        x25519_pub: [u8; 32],
    },
}

impl OnionTarget {
    /// The key the innermost layer is sealed to.
    pub fn x25519_pub(&self) -> &[u8; 32] {
        match self {
            Self::Snode { x25519_pub, .. } | Self::Server { x25519_pub, .. } => x25519_pub,
        }
    }

    /// The destination node's identity key, when it is a snode.
    pub fn ed25519_pub(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Snode { ed25519_pub, .. } => Some(ed25519_pub),
            Self::Server { .. } => None,
        }
    }

    fn route_step(&self) -> RouteStep {
        match self {
            Self::Snode {
                address,
                port,
                ed25519_pub,
                ..
            } => RouteStep::Snode {
                ip: address.clone(),
                port: *port,
                ed25519: hex::encode(ed25519_pub),
            },
            Self::Server { host, port, .. } => RouteStep::Server {
                host: host.clone(),
                port: *port,
            },
        }
    }
}

/// Where a relay forwards the payload it just unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteStep {
    /// Forward to another snode
    Snode {
        /// Next node address
        ip: String,
        /// Next node port
        port: u16,
        /// Next node identity key, hex
        ed25519: String,
    },
    /// Forward to an external server (exit hop)
    Server {
        /// Server host
        host: String,
        /// Server port
        port: u16,
    },
    /// This hop is the destination; process the payload
    Destination,
}

/// One decrypted layer: routing instruction plus the inner blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayerFrame {
    /// Routing instruction for the hop that opened this layer
    next: RouteStep,
    /// Inner payload, base64
    payload: String,
}

/// Opaque transport payload plus the path used to build it.
#[derive(Debug, Clone)]
pub struct TransportPayload {
    /// Bytes handed to the transport
    pub data: Vec<u8>,
    /// Path used, empty for `Direct`
    pub path: Option<OnionPath>,
}

const EPHEMERAL_PK_LEN: usize = 32;

/// Seal `plaintext` to `recipient_pk` under a fresh ephemeral key.
///
/// Output: `ephemeral_pk(32) ++ nonce(12) ++ ciphertext`.
fn seal_layer(
    provider: &dyn CryptoProvider,
    recipient_pk: &[u8; 32],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let (eph_secret, eph_public) = provider.x25519_keypair();
    let shared = provider.shared_secret(&eph_secret, recipient_pk);
    let key = provider.derive_layer_key(&shared, &eph_public, recipient_pk)?;

    let sealed = provider.aead_seal(&key, plaintext, &[])?;
    let mut out = Vec::with_capacity(EPHEMERAL_PK_LEN + sealed.len());
    out.extend_from_slice(&eph_public);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open a layer with the recipient's X25519 secret. The relay-side inverse
/// of [`seal_layer`]; clients only use it in tests.
pub fn open_layer(
    provider: &dyn CryptoProvider,
    recipient_secret: &[u8; 32],
    recipient_pk: &[u8; 32],
    blob: &[u8],
) -> Result<Vec<u8>> {
    if blob.len() < EPHEMERAL_PK_LEN {
        return Err(VeilError::decode("layer blob shorter than ephemeral key"));
    }
    let (eph_public, sealed) = blob.split_at(EPHEMERAL_PK_LEN);
    let eph_public: [u8; 32] = eph_public
        .try_into()
        .map_err(|_| VeilError::decode("ephemeral key slice conversion"))?;

    let shared = provider.shared_secret(recipient_secret, &eph_public);
    let key = provider.derive_layer_key(&shared, &eph_public, recipient_pk)?;
    provider.aead_open(&key, sealed, &[])
}

/// Parse an opened relay layer into its routing instruction and inner blob.
pub fn parse_layer(plaintext: &[u8]) -> Result<(RouteStep, Vec<u8>)> {
    let frame: LayerFrame = serde_json::from_slice(plaintext)?;
    let inner = BASE64
        .decode(&frame.payload)
        .map_err(|e| VeilError::decode(format!("layer payload is not base64: {e}")))?;
    Ok((frame.next, inner))
}

/// Wrap a signed request body for transport under the configured routing
/// mode.
///
/// For `Onion`, the result is sealed once per relay plus once for the
/// destination: layer count equals hop count + 1.
pub fn encrypt_for_transport(
    provider: &dyn CryptoProvider,
    mode: RoutingMode,
    path: Option<&OnionPath>,
    target: &OnionTarget,
    body: &[u8],
) -> Result<TransportPayload> {
    match mode {
        RoutingMode::Direct => Ok(TransportPayload {
            data: body.to_vec(),
            path: None,
        }),
        RoutingMode::Lokinet => {
            let data = seal_layer(provider, target.x25519_pub(), body)?;
            Ok(TransportPayload { data, path: None })
        }
        RoutingMode::Onion => {
            let path = path.ok_or_else(|| {
                VeilError::path_build_failed("onion routing requires a built path")
            })?;

            // Innermost: destination opens this and processes the body.
            let destination_frame = LayerFrame {
                next: RouteStep::Destination,
                payload: BASE64.encode(body),
            };
            let mut blob = seal_layer(
                provider,
                target.x25519_pub(),
                &serde_json::to_vec(&destination_frame)?,
            )?;

            // Wrap outward: the last relay forwards to the destination, each
            // earlier relay forwards to its successor.
            let mut next_step = target.route_step();
            for hop in path.hops().iter().rev() {
                let frame = LayerFrame {
                    next: next_step,
                    payload: BASE64.encode(&blob),
                };
                blob = seal_layer(provider, &hop.x25519_pub, &serde_json::to_vec(&frame)?)?;
                next_step = RouteStep::Snode {
                    ip: hop.address.clone(),
                    port: hop.port,
                    ed25519: hex::encode(hop.ed25519_pub),
                };
            }

            debug!(
                layers = path.len() + 1,
                entry = %path.entry().short_id(),
                "onion payload built"
            );
            Ok(TransportPayload {
                data: blob,
                path: Some(path.clone()),
            })
        }
    }
}
