//! Sub-account delegation
//!
//! A sub-account token grants a group member limited authority to act within
//! the group's storage namespaces without holding the group's full secret
//! key. The token is minted by whoever holds the group keys config; the
//! member later presents auth data (token plus a group-key signature binding
//! the token to the member's identity) which snodes and peers can verify
//! with nothing but the group's public id.

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use veil_core::{AccountId, IdPrefix, Result, VeilError};

use crate::signing::{plain_signature, public_key_for_secret, verify_plain_signature};

const SUBACCOUNT_DOMAIN: &[u8] = b"VeilSubaccount";

/// Token length: 4 permission-flag bytes + 32 derived bytes.
pub const SUBACCOUNT_TOKEN_LEN: usize = 36;

/// Auth-data length: token + member public key + group signature.
pub const SUBACCOUNT_AUTH_DATA_LEN: usize = SUBACCOUNT_TOKEN_LEN + 32 + 64;

/// Permission flags carried in a sub-account token.
pub mod flags {
    /// Member may read from group namespaces
    pub const READ: u8 = 0x01;
    /// Member may write to group namespaces
    pub const WRITE: u8 = 0x02;
    /// Member may delete from group namespaces
    pub const DELETE: u8 = 0x04;
}

/// Group config objects, only one of which carries key material.
///
/// Sub-account operations require the keys variant; passing any other
/// variant is a configuration error, not a silent fallback.
#[derive(Debug, Clone)]
pub enum ConfigObject {
    /// Group keys config: holds the group's Ed25519 secret
    GroupKeys(GroupKeysConfig),
    /// Group info config (no key material)
    GroupInfo,
    /// Group members config (no key material)
    GroupMembers,
}

/// The group's signing key material.
#[derive(Debug, Clone)]
pub struct GroupKeysConfig {
    /// Group Ed25519 secret: 32-byte seed or 64-byte secret
    pub group_ed25519_secret: Vec<u8>,
}

fn group_keys<'a>(config: &'a ConfigObject, operation: &str) -> Result<&'a GroupKeysConfig> {
    match config {
        ConfigObject::GroupKeys(keys) => Ok(keys),
        other => Err(VeilError::invalid_config_object(format!(
            "{operation} requires the group keys config, got {other:?}"
        ))),
    }
}

/// Derive a member's sub-account token under the group's keys.
///
/// Layout: `flags(4) ++ H(domain ++ group_secret ++ member_id)(32)`.
pub fn subaccount_token(
    config: &ConfigObject,
    group_session_id: &AccountId,
    member_id: &AccountId,
) -> Result<Vec<u8>> {
    let keys = group_keys(config, "subaccount_token")?;
    if group_session_id.prefix() != IdPrefix::Group {
        return Err(VeilError::failed_to_create_subaccount(format!(
            "expected a group session id, got prefix {:?}",
            group_session_id.prefix()
        )));
    }
    if keys.group_ed25519_secret.len() != 32 && keys.group_ed25519_secret.len() != 64 {
        return Err(VeilError::failed_to_create_subaccount(
            "group secret must be 32 or 64 bytes",
        ));
    }

    let mut hasher = Sha512::new();
    hasher.update(SUBACCOUNT_DOMAIN);
    hasher.update(&keys.group_ed25519_secret[..32]);
    hasher.update(member_id.to_bytes());
    let digest = hasher.finalize();

    let mut token = Vec::with_capacity(SUBACCOUNT_TOKEN_LEN);
    token.extend_from_slice(&[flags::READ | flags::WRITE, 0, 0, 0]);
    token.extend_from_slice(&digest[..32]);
    Ok(token)
}

/// Derive the auth data a member presents when acting in the group.
///
/// Layout: `token(36) ++ member_ed25519_pk(32) ++ group_sig(64)` where the
/// signature covers `token ++ member_pk`.
pub fn subaccount_auth_data(
    config: &ConfigObject,
    group_session_id: &AccountId,
    member_id: &AccountId,
) -> Result<Vec<u8>> {
    let keys = group_keys(config, "subaccount_auth_data")?;
    let token = subaccount_token(config, group_session_id, member_id)?;

    let member_pk = member_id.public_key();
    let mut signed = Vec::with_capacity(SUBACCOUNT_TOKEN_LEN + 32);
    signed.extend_from_slice(&token);
    signed.extend_from_slice(member_pk);

    let signature = plain_signature(&signed, &keys.group_ed25519_secret)
        .map_err(|e| VeilError::failed_to_create_subaccount(e.to_string()))?;

    let mut auth_data = Vec::with_capacity(SUBACCOUNT_AUTH_DATA_LEN);
    auth_data.extend_from_slice(&token);
    auth_data.extend_from_slice(member_pk);
    auth_data.extend_from_slice(&signature);
    Ok(auth_data)
}

/// Verify that auth data was minted by the group for the member holding
/// `member_ed25519_secret`.
///
/// The group's public key is the key portion of its session id, so
/// verification needs no secret group material. Malformed input verifies as
/// `false`.
pub fn verify_member_auth_data(
    group_session_id: &AccountId,
    member_ed25519_secret: &[u8],
    auth_data: &[u8],
) -> bool {
    if group_session_id.prefix() != IdPrefix::Group {
        return false;
    }
    if auth_data.len() != SUBACCOUNT_AUTH_DATA_LEN {
        return false;
    }
    let Ok(member_pk) = public_key_for_secret(member_ed25519_secret) else {
        return false;
    };
    let embedded_pk = &auth_data[SUBACCOUNT_TOKEN_LEN..SUBACCOUNT_TOKEN_LEN + 32];
    if !bool::from(embedded_pk.ct_eq(&member_pk)) {
        return false;
    }

    let signed = &auth_data[..SUBACCOUNT_TOKEN_LEN + 32];
    let signature = &auth_data[SUBACCOUNT_TOKEN_LEN + 32..];
    verify_plain_signature(group_session_id.public_key(), signed, signature)
}
