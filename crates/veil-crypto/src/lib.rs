//! Authentication material for the Veil swarm client
//!
//! Plain Ed25519 signing, blinded key pairs and signatures (generations 15
//! and 25), sub-account delegation for groups, and the [`CryptoProvider`]
//! capability trait that abstracts the underlying curve and AEAD primitives.
//!
//! Every generator takes explicit key material and context and returns a
//! value or a typed failure — never a silent default. Verification
//! functions return `bool` and treat malformed input as `false` so they are
//! safe to use in filtering.

pub mod blinding;
pub mod provider;
pub mod signing;
pub mod subaccount;

pub use blinding::{
    blinded_key_pair, blinded_signature, sign_with_blinded_pair, verify_blinded_identity,
    verify_blinded_signature, BlindedKeyPair, BlindingGeneration,
};
pub use provider::{CryptoProvider, DalekProvider, NONCE_LEN};
pub use signing::{plain_signature, public_key_for_secret, verify_plain_signature};
pub use subaccount::{
    subaccount_auth_data, subaccount_token, verify_member_auth_data, ConfigObject,
    GroupKeysConfig, SUBACCOUNT_AUTH_DATA_LEN, SUBACCOUNT_TOKEN_LEN,
};
