//! Plain Ed25519 signing
//!
//! Thin wrappers over `ed25519-dalek` that accept the key layouts callers
//! actually hold: a 32-byte seed or the 64-byte libsodium-style secret
//! (seed followed by public key). Length checks fail with typed errors,
//! never by panicking.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use veil_core::{Result, VeilError};

/// Build a signing key from a 32-byte seed or a 64-byte secret.
pub fn signing_key_from_secret(secret: &[u8]) -> Result<SigningKey> {
    let seed: [u8; 32] = match secret.len() {
        32 | 64 => secret[..32]
            .try_into()
            .map_err(|_| VeilError::key_generation_failed("seed slice conversion"))?,
        other => {
            return Err(VeilError::key_generation_failed(format!(
                "ed25519 secret must be 32 or 64 bytes, got {other}"
            )))
        }
    };
    Ok(SigningKey::from_bytes(&seed))
}

/// Sign a message with a plain Ed25519 key.
pub fn plain_signature(message: &[u8], ed25519_secret: &[u8]) -> Result<[u8; 64]> {
    let key = signing_key_from_secret(ed25519_secret)?;
    Ok(key.sign(message).to_bytes())
}

/// Verify a plain Ed25519 signature. Malformed input verifies as `false`.
pub fn verify_plain_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(&sig_bytes)).is_ok()
}

/// Public key for a 32- or 64-byte Ed25519 secret.
pub fn public_key_for_secret(ed25519_secret: &[u8]) -> Result<[u8; 32]> {
    Ok(signing_key_from_secret(ed25519_secret)?
        .verifying_key()
        .to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_sign_and_verify() {
        let seed = [7u8; 32];
        let public = public_key_for_secret(&seed).unwrap();
        let sig = plain_signature(b"payload", &seed).unwrap();

        assert!(verify_plain_signature(&public, b"payload", &sig));
        assert!(!verify_plain_signature(&public, b"other", &sig));
    }

    #[test]
    fn test_64_byte_secret_uses_seed_half() {
        let seed = [9u8; 32];
        let mut secret64 = [0u8; 64];
        secret64[..32].copy_from_slice(&seed);

        let a = plain_signature(b"m", &seed).unwrap();
        let b = plain_signature(b"m", &secret64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bad_length_is_typed_failure() {
        assert_matches!(
            plain_signature(b"m", &[0u8; 31]),
            Err(VeilError::KeyGenerationFailed { .. })
        );
    }

    #[test]
    fn test_malformed_verify_input_is_false() {
        let public = public_key_for_secret(&[1u8; 32]).unwrap();
        assert!(!verify_plain_signature(&public, b"m", &[0u8; 10]));
    }
}
