//! Request authentication
//!
//! [`AuthenticationInfo`] carries enough material to compute a signature —
//! never a signature itself. Signatures are freshly computed per request
//! from the final verification bytes, so a stale or reused signature cannot
//! exist by construction.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use veil_core::{AccountId, Result, VeilError};
use veil_crypto::{BlindingGeneration, CryptoProvider};

/// Signing material for one request.
#[derive(Debug, Clone)]
pub enum AuthenticationInfo {
    /// Plain Ed25519 account key
    Standard {
        /// Account id derived from the key
        account_id: AccountId,
        /// 32- or 64-byte Ed25519 secret
        ed25519_secret: Vec<u8>,
    },
    /// Blinded key tied to a server, generation 15 or 25
    Blinded {
        /// Target server's public key
        server_pk: [u8; 32],
        /// Blinding generation used to mint the identity
        generation: BlindingGeneration,
        /// 32- or 64-byte Ed25519 secret
        ed25519_secret: Vec<u8>,
    },
    /// Group sub-account delegation
    GroupSubaccount {
        /// The group's session id
        group_session_id: AccountId,
        /// Member's own Ed25519 secret (signs the request)
        member_ed25519_secret: Vec<u8>,
        /// Auth data minted by the group admin
        auth_data: Vec<u8>,
    },
}

/// Computed headers attached to a prepared request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSignature {
    /// Hex public key the server verifies against
    pub pubkey: String,
    /// Base64 signature over the verification bytes
    pub signature: String,
    /// Base64 sub-account auth data, present for group delegation
    pub subaccount_auth_data: Option<String>,
}

impl AuthenticationInfo {
    /// The identity this request authenticates as.
    pub fn account_id(&self, crypto: &dyn CryptoProvider) -> Result<AccountId> {
        match self {
            Self::Standard { account_id, .. } => Ok(*account_id),
            Self::Blinded {
                server_pk,
                generation,
                ed25519_secret,
            } => Ok(crypto
                .blinded_key_pair(server_pk, ed25519_secret, *generation)?
                .account_id()),
            Self::GroupSubaccount {
                group_session_id, ..
            } => Ok(*group_session_id),
        }
    }

    /// Sign the final verification bytes.
    ///
    /// The caller must pass the exact bytes the server will verify; this
    /// type never alters them.
    pub fn sign(&self, crypto: &dyn CryptoProvider, message: &[u8]) -> Result<AuthSignature> {
        match self {
            Self::Standard {
                account_id,
                ed25519_secret,
            } => {
                let signature = crypto.sign(message, ed25519_secret)?;
                Ok(AuthSignature {
                    pubkey: account_id.to_hex(),
                    signature: BASE64.encode(signature),
                    subaccount_auth_data: None,
                })
            }
            Self::Blinded {
                server_pk,
                generation,
                ed25519_secret,
            } => {
                let pair = crypto.blinded_key_pair(server_pk, ed25519_secret, *generation)?;
                let signature =
                    crypto.blinded_sign(message, server_pk, ed25519_secret, *generation)?;
                Ok(AuthSignature {
                    pubkey: pair.account_id().to_hex(),
                    signature: BASE64.encode(signature),
                    subaccount_auth_data: None,
                })
            }
            Self::GroupSubaccount {
                group_session_id,
                member_ed25519_secret,
                auth_data,
            } => {
                if auth_data.len() != veil_crypto::SUBACCOUNT_AUTH_DATA_LEN {
                    return Err(VeilError::invalid_config_object(format!(
                        "auth data must be {} bytes, got {}",
                        veil_crypto::SUBACCOUNT_AUTH_DATA_LEN,
                        auth_data.len()
                    )));
                }
                let signature = crypto.sign(message, member_ed25519_secret)?;
                Ok(AuthSignature {
                    pubkey: group_session_id.to_hex(),
                    signature: BASE64.encode(signature),
                    subaccount_auth_data: Some(BASE64.encode(auth_data)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use veil_core::IdPrefix;
    use veil_crypto::{
        public_key_for_secret, subaccount_auth_data, ConfigObject, DalekProvider,
        GroupKeysConfig,
    };

    fn standard_auth() -> AuthenticationInfo {
        let secret = [7u8; 32].to_vec();
        let pk = public_key_for_secret(&secret).unwrap();
        AuthenticationInfo::Standard {
            account_id: AccountId::new(IdPrefix::Standard, pk),
            ed25519_secret: secret,
        }
    }

    #[test]
    fn test_standard_signature_verifies() {
        let crypto = DalekProvider;
        let auth = standard_auth();
        let sig = auth.sign(&crypto, b"verification bytes").unwrap();

        let id = AccountId::from_hex(&sig.pubkey).unwrap();
        let raw = BASE64.decode(&sig.signature).unwrap();
        assert!(crypto.verify(id.public_key(), b"verification bytes", &raw));
        assert!(sig.subaccount_auth_data.is_none());
    }

    #[test]
    fn test_blinded_pubkey_carries_generation_prefix() {
        let crypto = DalekProvider;
        let auth = AuthenticationInfo::Blinded {
            server_pk: [0x11; 32],
            generation: BlindingGeneration::Gen25,
            ed25519_secret: [9u8; 32].to_vec(),
        };
        let sig = auth.sign(&crypto, b"m").unwrap();
        let id = AccountId::from_hex(&sig.pubkey).unwrap();
        assert_eq!(id.prefix(), IdPrefix::Blinded25);

        let raw = BASE64.decode(&sig.signature).unwrap();
        assert!(veil_crypto::verify_blinded_signature(
            id.public_key(),
            b"m",
            &raw
        ));
    }

    #[test]
    fn test_group_subaccount_attaches_auth_data() {
        let crypto = DalekProvider;
        let group_secret = [0x41u8; 32];
        let group_id = AccountId::new(
            IdPrefix::Group,
            public_key_for_secret(&group_secret).unwrap(),
        );
        let member_secret = [0x42u8; 32];
        let member_id = AccountId::new(
            IdPrefix::Standard,
            public_key_for_secret(&member_secret).unwrap(),
        );
        let config = ConfigObject::GroupKeys(GroupKeysConfig {
            group_ed25519_secret: group_secret.to_vec(),
        });
        let auth_data = subaccount_auth_data(&config, &group_id, &member_id).unwrap();

        let auth = AuthenticationInfo::GroupSubaccount {
            group_session_id: group_id,
            member_ed25519_secret: member_secret.to_vec(),
            auth_data,
        };
        let sig = auth.sign(&crypto, b"m").unwrap();
        assert_eq!(sig.pubkey, group_id.to_hex());
        assert!(sig.subaccount_auth_data.is_some());
    }

    #[test]
    fn test_truncated_auth_data_is_config_error() {
        let crypto = DalekProvider;
        let auth = AuthenticationInfo::GroupSubaccount {
            group_session_id: AccountId::new(IdPrefix::Group, [1u8; 32]),
            member_ed25519_secret: [2u8; 32].to_vec(),
            auth_data: vec![0u8; 10],
        };
        assert_matches!(
            auth.sign(&crypto, b"m"),
            Err(VeilError::InvalidConfigObject { .. })
        );
    }
}
