//! Blinded key derivation and signing
//!
//! A blinded key pair is deterministically derived from a user's Ed25519
//! secret and a target server's public key, letting the user authenticate to
//! that server without revealing their primary identity key. Two generations
//! exist and are not interchangeable: they use different derivation domains
//! and produce different keys for identical inputs, so the generation used
//! to mint a pseudonymous identity must be used for all later signing and
//! verification against it. The generation travels in the blinded account
//! id's prefix byte.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use veil_core::{AccountId, IdPrefix, Result, VeilError};

use crate::signing::signing_key_from_secret;

const BLIND15_DOMAIN: &[u8] = b"VeilBlind15";
const BLIND25_DOMAIN: &[u8] = b"VeilBlind25";
const BLIND_SIG_NONCE_DOMAIN: &[u8] = b"VeilBlindSigNonce";

/// Key-blinding generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlindingGeneration {
    /// Generation 15: blinding factor bound to the server key only
    Gen15,
    /// Generation 25: blinding factor bound to the server key and account key
    Gen25,
}

impl BlindingGeneration {
    /// The account-id prefix carrying this generation.
    pub fn id_prefix(&self) -> IdPrefix {
        match self {
            Self::Gen15 => IdPrefix::Blinded15,
            Self::Gen25 => IdPrefix::Blinded25,
        }
    }

    /// The generation encoded in a blinded id prefix, if any.
    pub fn from_id_prefix(prefix: IdPrefix) -> Option<Self> {
        match prefix {
            IdPrefix::Blinded15 => Some(Self::Gen15),
            IdPrefix::Blinded25 => Some(Self::Gen25),
            _ => None,
        }
    }
}

/// A derived blinded key pair tied to one server and generation.
#[derive(Clone)]
pub struct BlindedKeyPair {
    generation: BlindingGeneration,
    secret_scalar: Scalar,
    public_key: [u8; 32],
}

impl std::fmt::Debug for BlindedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlindedKeyPair")
            .field("generation", &self.generation)
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

impl Drop for BlindedKeyPair {
    fn drop(&mut self) {
        self.secret_scalar.zeroize();
    }
}

impl BlindedKeyPair {
    /// The generation this pair was derived under.
    pub fn generation(&self) -> BlindingGeneration {
        self.generation
    }

    /// The blinded public key bytes.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// The blinded account id (generation prefix + public key).
    pub fn account_id(&self) -> AccountId {
        AccountId::new(self.generation.id_prefix(), self.public_key)
    }

    pub(crate) fn secret_scalar(&self) -> &Scalar {
        &self.secret_scalar
    }
}

fn check_server_pk(server_pk: &[u8]) -> Result<[u8; 32]> {
    server_pk.try_into().map_err(|_| {
        VeilError::key_generation_failed(format!(
            "server public key must be 32 bytes, got {}",
            server_pk.len()
        ))
    })
}

/// The user's unblinded Ed25519 scalar and public point, derived from the
/// seed half of the secret.
fn identity_scalar(ed25519_secret: &[u8]) -> Result<(Scalar, [u8; 32])> {
    let key = signing_key_from_secret(ed25519_secret)?;
    let mut h: [u8; 64] = Sha512::digest(key.to_bytes()).into();
    let mut scalar_bytes = [0u8; 32];
    scalar_bytes.copy_from_slice(&h[..32]);
    scalar_bytes[0] &= 248;
    scalar_bytes[31] &= 127;
    scalar_bytes[31] |= 64;
    let a = Scalar::from_bytes_mod_order(scalar_bytes);
    scalar_bytes.zeroize();
    h.zeroize();
    Ok((a, key.verifying_key().to_bytes()))
}

/// Blinding factor for a generation. Public information only: gen 15 binds
/// to the server key, gen 25 additionally binds to the account's public key.
fn blinding_factor(
    generation: BlindingGeneration,
    server_pk: &[u8; 32],
    account_pk: &[u8; 32],
) -> Scalar {
    let mut hasher = Sha512::new();
    match generation {
        BlindingGeneration::Gen15 => {
            hasher.update(BLIND15_DOMAIN);
            hasher.update(server_pk);
        }
        BlindingGeneration::Gen25 => {
            hasher.update(BLIND25_DOMAIN);
            hasher.update(server_pk);
            hasher.update(account_pk);
        }
    }
    Scalar::from_bytes_mod_order_wide(&hasher.finalize().into())
}

/// Derive a blinded key pair for a server under the given generation.
pub fn blinded_key_pair(
    server_pk: &[u8],
    ed25519_secret: &[u8],
    generation: BlindingGeneration,
) -> Result<BlindedKeyPair> {
    let server_pk = check_server_pk(server_pk)?;
    let (a, account_pk) = identity_scalar(ed25519_secret)?;
    let k = blinding_factor(generation, &server_pk, &account_pk);

    let blinded_scalar = k * a;
    let blinded_point = ED25519_BASEPOINT_POINT * blinded_scalar;

    Ok(BlindedKeyPair {
        generation,
        secret_scalar: blinded_scalar,
        public_key: blinded_point.compress().to_bytes(),
    })
}

/// Sign a message with the blinded key for (server, generation).
///
/// Deterministic Schnorr over the blinded scalar: the nonce is derived from
/// the blinded secret and the message, so identical inputs produce identical
/// signatures.
pub fn blinded_signature(
    message: &[u8],
    server_pk: &[u8],
    ed25519_secret: &[u8],
    generation: BlindingGeneration,
) -> Result<[u8; 64]> {
    let pair = blinded_key_pair(server_pk, ed25519_secret, generation)
        .map_err(|e| VeilError::signature_generation_failed(e.to_string()))?;
    sign_with_blinded_pair(&pair, message)
}

/// Sign with an already-derived blinded pair.
pub fn sign_with_blinded_pair(pair: &BlindedKeyPair, message: &[u8]) -> Result<[u8; 64]> {
    let mut nonce_hasher = Sha512::new();
    nonce_hasher.update(BLIND_SIG_NONCE_DOMAIN);
    nonce_hasher.update(pair.secret_scalar().to_bytes());
    nonce_hasher.update(message);
    let r = Scalar::from_bytes_mod_order_wide(&nonce_hasher.finalize().into());
    let big_r = (ED25519_BASEPOINT_POINT * r).compress();

    let c = challenge_scalar(&big_r.to_bytes(), pair.public_key(), message);
    let s = r + c * pair.secret_scalar();

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&big_r.to_bytes());
    signature[32..].copy_from_slice(&s.to_bytes());
    Ok(signature)
}

fn challenge_scalar(big_r: &[u8; 32], public_key: &[u8; 32], message: &[u8]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(big_r);
    hasher.update(public_key);
    hasher.update(message);
    Scalar::from_bytes_mod_order_wide(&hasher.finalize().into())
}

/// Verify a blinded signature against a blinded public key.
///
/// Malformed input verifies as `false`; this function never fails.
pub fn verify_blinded_signature(
    blinded_pk: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> bool {
    if signature.len() != 64 {
        return false;
    }
    let Ok(r_bytes) = <[u8; 32]>::try_from(&signature[..32]) else {
        return false;
    };
    let Ok(s_bytes) = <[u8; 32]>::try_from(&signature[32..]) else {
        return false;
    };
    let Some(big_r) = CompressedEdwardsY(r_bytes).decompress() else {
        return false;
    };
    let Some(point) = CompressedEdwardsY(*blinded_pk).decompress() else {
        return false;
    };
    let Some(s) = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes)) else {
        return false;
    };

    let c = challenge_scalar(&r_bytes, blinded_pk, message);
    ED25519_BASEPOINT_POINT * s == big_r + point * c
}

/// Check whether `blinded_id` is the blinding of `standard_id` for
/// `server_pk`, under the generation carried in the blinded id's prefix.
///
/// Pure verification for use in filtering: malformed input (wrong prefixes,
/// non-decompressible keys, wrong server key length) returns `false` rather
/// than failing.
pub fn verify_blinded_identity(
    standard_id: &AccountId,
    blinded_id: &AccountId,
    server_pk: &[u8],
) -> bool {
    if standard_id.prefix() != IdPrefix::Standard {
        return false;
    }
    let Some(generation) = BlindingGeneration::from_id_prefix(blinded_id.prefix()) else {
        return false;
    };
    let Ok(server_pk) = check_server_pk(server_pk) else {
        return false;
    };
    let Some(account_point) = CompressedEdwardsY(*standard_id.public_key()).decompress() else {
        return false;
    };

    let k = blinding_factor(generation, &server_pk, standard_id.public_key());
    let candidate = (account_point * k).compress().to_bytes();
    candidate.ct_eq(blinded_id.public_key()).into()
}
