//! Swarm storage namespaces
//!
//! A namespace is a signed-integer partition key distinguishing message
//! categories within an account's swarm. Wire values outside the known set
//! decode to [`Namespace::Unknown`] rather than failing: servers grow new
//! namespaces over time and old clients must keep decoding their payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A storage partition within an account's swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Regular one-to-one and group messages
    Default,
    /// User profile config
    UserProfileConfig,
    /// Contacts config
    ContactsConfig,
    /// Volatile conversation-info config
    ConvoInfoVolatileConfig,
    /// User groups config
    UserGroupsConfig,
    /// Legacy closed-group messages
    LegacyClosedGroup,
    /// Group messages (updated groups)
    GroupMessages,
    /// Group keys config
    GroupKeysConfig,
    /// Group info config
    GroupInfoConfig,
    /// Group members config
    GroupMembersConfig,
    /// Any wire value without a known mapping
    Unknown,
}

impl Namespace {
    /// Decode a wire integer, mapping unmapped values to `Unknown`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Default,
            2 => Self::UserProfileConfig,
            3 => Self::ContactsConfig,
            4 => Self::ConvoInfoVolatileConfig,
            5 => Self::UserGroupsConfig,
            -10 => Self::LegacyClosedGroup,
            11 => Self::GroupMessages,
            12 => Self::GroupKeysConfig,
            13 => Self::GroupInfoConfig,
            14 => Self::GroupMembersConfig,
            _ => Self::Unknown,
        }
    }

    /// The raw wire integer, or `None` for `Unknown`.
    pub fn raw(&self) -> Option<i32> {
        match self {
            Self::Default => Some(0),
            Self::UserProfileConfig => Some(2),
            Self::ContactsConfig => Some(3),
            Self::ConvoInfoVolatileConfig => Some(4),
            Self::UserGroupsConfig => Some(5),
            Self::LegacyClosedGroup => Some(-10),
            Self::GroupMessages => Some(11),
            Self::GroupKeysConfig => Some(12),
            Self::GroupInfoConfig => Some(13),
            Self::GroupMembersConfig => Some(14),
            Self::Unknown => None,
        }
    }

    /// The stringified form appended to request verification bytes.
    ///
    /// `Unknown` has no stable wire integer and signs as `0`; requests
    /// should not normally target it.
    pub fn verification_string(&self) -> String {
        self.raw().unwrap_or(0).to_string()
    }
}

/// Verification-string form of an optional namespace.
///
/// Unspecified namespaces sign with the `"all"` sentinel, matching the
/// server-side verifier.
pub fn verification_string(namespace: Option<Namespace>) -> String {
    match namespace {
        Some(ns) => ns.verification_string(),
        None => "all".to_string(),
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw().unwrap_or(0).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = i32::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}
