//! ONS lookup decoding
//!
//! An ONS lookup maps a human-readable name to an account identifier. The
//! service returns the mapping encrypted under a key derived from the name
//! itself, so only a caller who already knows the name can read the result.
//! Decoding failures collapse to the name-resolution error: the caller sees
//! "could not resolve", not AEAD internals.

use hkdf::Hkdf;
use sha2::Sha512;

use veil_core::{AccountId, Result, VeilError};
use veil_crypto::CryptoProvider;

const ONS_KEY_INFO: &[u8] = b"VeilOnsKey";
const ONS_NONCE_LEN: usize = 24;

/// Derive the symmetric key for an ONS name. Names are case-insensitive,
/// so the key is derived from the lowercased form.
fn ons_key(name: &str) -> Result<[u8; 32]> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(VeilError::name_resolution("empty name"));
    }
    let hk = Hkdf::<Sha512>::new(None, normalized.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(ONS_KEY_INFO, &mut key)
        .map_err(|_| VeilError::name_resolution(format!("key derivation for {normalized}")))?;
    Ok(key)
}

/// Decrypt an ONS lookup response into the account id it names.
///
/// Responses from older registrations omit the nonce; those were sealed
/// under an all-zero nonce, which is safe here because each name-derived
/// key encrypts exactly one value.
pub fn decode_ons_response(
    crypto: &dyn CryptoProvider,
    name: &str,
    encrypted_value: &[u8],
    nonce: Option<&[u8]>,
) -> Result<AccountId> {
    let key = ons_key(name)?;

    let nonce: [u8; ONS_NONCE_LEN] = match nonce {
        Some(bytes) => bytes
            .try_into()
            .map_err(|_| VeilError::name_resolution("nonce must be 24 bytes"))?,
        None => [0u8; ONS_NONCE_LEN],
    };

    let plaintext = crypto
        .xaead_open(&key, &nonce, encrypted_value)
        .map_err(|_| VeilError::name_resolution(format!("decryption for {name}")))?;

    AccountId::from_bytes(&plaintext)
        .map_err(|_| VeilError::name_resolution(format!("decrypted value for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chacha20poly1305::aead::Aead;
    use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
    use veil_core::IdPrefix;
    use veil_crypto::DalekProvider;

    fn seal(name: &str, account: &AccountId, nonce: &[u8; 24]) -> Vec<u8> {
        let key = ons_key(name).unwrap();
        let cipher = XChaCha20Poly1305::new((&key).into());
        cipher
            .encrypt(XNonce::from_slice(nonce), account.to_bytes().as_slice())
            .unwrap()
    }

    #[test]
    fn test_round_trip_with_nonce() {
        let account = AccountId::new(IdPrefix::Standard, [7u8; 32]);
        let nonce = [9u8; 24];
        let sealed = seal("Alice.Veil", &account, &nonce);

        // Lookup by any casing of the name resolves identically.
        let resolved =
            decode_ons_response(&DalekProvider, "alice.veil", &sealed, Some(&nonce)).unwrap();
        assert_eq!(resolved, account);
    }

    #[test]
    fn test_absent_nonce_uses_legacy_zero_nonce() {
        let account = AccountId::new(IdPrefix::Standard, [3u8; 32]);
        let sealed = seal("bob", &account, &[0u8; 24]);
        let resolved = decode_ons_response(&DalekProvider, "bob", &sealed, None).unwrap();
        assert_eq!(resolved, account);
    }

    #[test]
    fn test_wrong_name_is_name_resolution_error() {
        let account = AccountId::new(IdPrefix::Standard, [3u8; 32]);
        let nonce = [1u8; 24];
        let sealed = seal("carol", &account, &nonce);

        let err =
            decode_ons_response(&DalekProvider, "mallory", &sealed, Some(&nonce)).unwrap_err();
        assert!(matches!(err, VeilError::NameResolution { .. }));
    }

    #[test]
    fn test_bad_nonce_length_is_name_resolution_error() {
        let err = decode_ons_response(&DalekProvider, "dave", b"irrelevant", Some(&[0u8; 12]))
            .unwrap_err();
        assert!(matches!(err, VeilError::NameResolution { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = decode_ons_response(&DalekProvider, "   ", b"x", None).unwrap_err();
        assert!(matches!(err, VeilError::NameResolution { .. }));
    }
}
