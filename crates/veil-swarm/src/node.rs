//! Snode descriptors
//!
//! A [`SwarmNode`] is immutable once fetched. Nodes that fail during a
//! logical operation are excluded from that operation's candidate set, not
//! mutated; the next wholesale refresh replaces the whole set.

use serde::{Deserialize, Deserializer, Serialize};

use veil_core::{Result, VeilError};

/// A single storage node participating in one or more swarms.
///
/// Identity is the Ed25519 public key; two descriptors with the same key are
/// the same node regardless of address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmNode {
    /// Reachable IP address or hostname
    pub address: String,
    /// HTTPS port
    #[serde(deserialize_with = "lenient_port")]
    pub port: u16,
    /// Ed25519 public key (node identity)
    pub ed25519_pub: [u8; 32],
    /// X25519 public key (onion encryption)
    pub x25519_pub: [u8; 32],
}

impl PartialEq for SwarmNode {
    fn eq(&self, other: &Self) -> bool {
        self.ed25519_pub == other.ed25519_pub
    }
}

impl Eq for SwarmNode {}

impl std::hash::Hash for SwarmNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ed25519_pub.hash(state);
    }
}

impl SwarmNode {
    /// Short identity string for logging.
    pub fn short_id(&self) -> String {
        hex::encode(&self.ed25519_pub[..4])
    }

    /// Decode the directory wire descriptor:
    /// `{"ip", "port_https", "pubkey_ed25519", "pubkey_x25519"}`.
    ///
    /// Ports arrive as integers or strings depending on server version;
    /// both are accepted.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| VeilError::decode("snode descriptor is not an object"))?;

        let address = obj
            .get("ip")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VeilError::decode("snode descriptor missing ip"))?
            .to_string();

        let port = match obj.get("port_https") {
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .filter(|p| *p <= u16::MAX as u64)
                .ok_or_else(|| VeilError::decode("snode port out of range"))?
                as u16,
            Some(serde_json::Value::String(s)) => s
                .parse::<u16>()
                .map_err(|_| VeilError::decode("snode port is not numeric"))?,
            _ => return Err(VeilError::decode("snode descriptor missing port_https")),
        };

        let ed25519_pub = decode_key(obj, "pubkey_ed25519")?;
        let x25519_pub = decode_key(obj, "pubkey_x25519")?;

        Ok(Self {
            address,
            port,
            ed25519_pub,
            x25519_pub,
        })
    }
}

fn decode_key(obj: &serde_json::Map<String, serde_json::Value>, field: &str) -> Result<[u8; 32]> {
    let hex_str = obj
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| VeilError::decode(format!("snode descriptor missing {field}")))?;
    let bytes =
        hex::decode(hex_str).map_err(|e| VeilError::decode(format!("{field} is not hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| VeilError::decode(format!("{field} must be 32 bytes")))
}

fn lenient_port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Int(u16),
        Str(String),
    }
    match Port::deserialize(deserializer)? {
        Port::Int(p) => Ok(p),
        Port::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(port: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "ip": "203.0.113.7",
            "port_https": port,
            "pubkey_ed25519": "aa".repeat(32),
            "pubkey_x25519": "bb".repeat(32),
        })
    }

    #[test]
    fn test_decodes_integer_port() {
        let node = SwarmNode::from_wire(&descriptor(serde_json::json!(443))).unwrap();
        assert_eq!(node.port, 443);
        assert_eq!(node.ed25519_pub, [0xaa; 32]);
    }

    #[test]
    fn test_decodes_string_port() {
        let node = SwarmNode::from_wire(&descriptor(serde_json::json!("8443"))).unwrap();
        assert_eq!(node.port, 8443);
    }

    #[test]
    fn test_missing_key_is_decode_error() {
        let mut value = descriptor(serde_json::json!(443));
        value.as_object_mut().unwrap().remove("pubkey_x25519");
        assert!(SwarmNode::from_wire(&value).is_err());
    }

    #[test]
    fn test_identity_is_ed25519_key() {
        let a = SwarmNode::from_wire(&descriptor(serde_json::json!(443))).unwrap();
        let mut b = a.clone();
        b.address = "198.51.100.1".into();
        b.port = 1234;
        assert_eq!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn prop_port_decodes_from_either_wire_form(port: u16) {
            let from_int = SwarmNode::from_wire(&descriptor(serde_json::json!(port))).unwrap();
            let from_str =
                SwarmNode::from_wire(&descriptor(serde_json::json!(port.to_string()))).unwrap();
            proptest::prop_assert_eq!(from_int.port, port);
            proptest::prop_assert_eq!(from_str.port, port);
        }
    }
}
