//! Crypto capability interface
//!
//! The curve arithmetic and AEAD primitives sit behind [`CryptoProvider`]
//! with pure input-to-output contracts, so the concrete implementation is
//! swappable and operations that consume crypto can be tested against fakes.
//! [`DalekProvider`] is the default implementation over the dalek crates.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305, XNonce};
use curve25519_dalek::montgomery::MontgomeryPoint;
use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha512;

use veil_core::{Result, VeilError};

use crate::blinding::{self, BlindedKeyPair, BlindingGeneration};
use crate::signing;

/// AEAD nonce length (ChaCha20-Poly1305).
pub const NONCE_LEN: usize = 12;

/// Capability interface over signing, blinding, key agreement, and AEAD.
pub trait CryptoProvider: Send + Sync {
    /// Sign a message with a plain Ed25519 secret (32- or 64-byte form).
    fn sign(&self, message: &[u8], ed25519_secret: &[u8]) -> Result<[u8; 64]>;

    /// Verify a plain Ed25519 signature; malformed input is `false`.
    fn verify(&self, public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool;

    /// Derive the blinded key pair for (server, generation).
    fn blinded_key_pair(
        &self,
        server_pk: &[u8],
        ed25519_secret: &[u8],
        generation: BlindingGeneration,
    ) -> Result<BlindedKeyPair>;

    /// Sign a message with the blinded key for (server, generation).
    fn blinded_sign(
        &self,
        message: &[u8],
        server_pk: &[u8],
        ed25519_secret: &[u8],
        generation: BlindingGeneration,
    ) -> Result<[u8; 64]>;

    /// Generate an ephemeral X25519 key pair (secret, public).
    fn x25519_keypair(&self) -> ([u8; 32], [u8; 32]);

    /// X25519 shared point between our secret and their public key.
    fn shared_secret(&self, our_secret: &[u8; 32], their_public: &[u8; 32]) -> [u8; 32];

    /// Symmetric key for one encryption layer, bound to both public keys.
    fn derive_layer_key(
        &self,
        shared: &[u8; 32],
        ephemeral_pk: &[u8; 32],
        recipient_pk: &[u8; 32],
    ) -> Result<[u8; 32]>;

    /// Seal with ChaCha20-Poly1305; output is `nonce(12) ++ ciphertext`.
    fn aead_seal(&self, key: &[u8; 32], plaintext: &[u8], associated: &[u8]) -> Result<Vec<u8>>;

    /// Open a `nonce(12) ++ ciphertext` payload.
    fn aead_open(&self, key: &[u8; 32], payload: &[u8], associated: &[u8]) -> Result<Vec<u8>>;

    /// Open an XChaCha20-Poly1305 ciphertext with an explicit 24-byte nonce.
    fn xaead_open(&self, key: &[u8; 32], nonce: &[u8; 24], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Default provider backed by `ed25519-dalek`, `curve25519-dalek`, and
/// `chacha20poly1305`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DalekProvider;

impl CryptoProvider for DalekProvider {
    fn sign(&self, message: &[u8], ed25519_secret: &[u8]) -> Result<[u8; 64]> {
        signing::plain_signature(message, ed25519_secret)
    }

    fn verify(&self, public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
        signing::verify_plain_signature(public_key, message, signature)
    }

    fn blinded_key_pair(
        &self,
        server_pk: &[u8],
        ed25519_secret: &[u8],
        generation: BlindingGeneration,
    ) -> Result<BlindedKeyPair> {
        blinding::blinded_key_pair(server_pk, ed25519_secret, generation)
    }

    fn blinded_sign(
        &self,
        message: &[u8],
        server_pk: &[u8],
        ed25519_secret: &[u8],
        generation: BlindingGeneration,
    ) -> Result<[u8; 64]> {
        blinding::blinded_signature(message, server_pk, ed25519_secret, generation)
    }

    fn x25519_keypair(&self) -> ([u8; 32], [u8; 32]) {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let public = MontgomeryPoint::mul_base_clamped(secret).to_bytes();
        (secret, public)
    }

    fn shared_secret(&self, our_secret: &[u8; 32], their_public: &[u8; 32]) -> [u8; 32] {
        MontgomeryPoint(*their_public)
            .mul_clamped(*our_secret)
            .to_bytes()
    }

    fn derive_layer_key(
        &self,
        shared: &[u8; 32],
        ephemeral_pk: &[u8; 32],
        recipient_pk: &[u8; 32],
    ) -> Result<[u8; 32]> {
        let mut salt = Vec::with_capacity(64);
        salt.extend_from_slice(ephemeral_pk);
        salt.extend_from_slice(recipient_pk);

        let hk = Hkdf::<Sha512>::new(Some(&salt), shared);
        let mut key = [0u8; 32];
        hk.expand(b"VeilLayerKey", &mut key)
            .map_err(|e| VeilError::key_generation_failed(format!("hkdf expand: {e}")))?;
        Ok(key)
    }

    fn aead_seal(&self, key: &[u8; 32], plaintext: &[u8], associated: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(key.into());
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(
                (&nonce).into(),
                Payload {
                    msg: plaintext,
                    aad: associated,
                },
            )
            .map_err(|e| VeilError::internal(format!("aead seal: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn aead_open(&self, key: &[u8; 32], payload: &[u8], associated: &[u8]) -> Result<Vec<u8>> {
        if payload.len() < NONCE_LEN {
            return Err(VeilError::decode("aead payload shorter than nonce"));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(key.into());
        cipher
            .decrypt(
                nonce.into(),
                Payload {
                    msg: ciphertext,
                    aad: associated,
                },
            )
            .map_err(|_| VeilError::decode("aead open failed"))
    }

    fn xaead_open(&self, key: &[u8; 32], nonce: &[u8; 24], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new(key.into());
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| VeilError::decode("xaead open failed"))
    }
}
