//! The persistent [`Entry`] record and its normative JSON form.

use serde::{Deserialize, Serialize};

use crate::Hash;

/// One node in an account's store tree.
///
/// Serialized as JSON for both on-disk storage and wire responses: `key`
/// and `parent` as hex strings (`parent` is `null` for the root), `data`
/// and `signature` as base64, `entries` as an array of hex child keys in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Storage key of this node.
    pub key: Hash,
    /// Key of the parent node; `None` only for the account's root.
    pub parent: Option<Hash>,
    /// Opaque payload. Ciphertext from the client's perspective; the store
    /// never inspects it.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Seconds since the epoch of the most recent change at or below this
    /// node.
    pub timestamp: u64,
    /// Child keys in first-insertion order, without duplicates.
    pub entries: Vec<Hash>,
    /// Signature over the entry digest, produced by the account's key.
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl Entry {
    /// A fresh leaf entry. The timestamp is assigned by the store when the
    /// entry is written.
    pub fn new(key: Hash, parent: Option<Hash>, data: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            key,
            parent,
            data,
            timestamp: 0,
            entries: Vec::new(),
            signature,
        }
    }

    /// The synthetic root entry written when an account database is first
    /// opened.
    pub fn root(key: Hash, timestamp: u64) -> Self {
        Self {
            key,
            parent: None,
            data: Vec::new(),
            timestamp,
            entries: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Whether this entry currently holds children.
    pub fn is_collection(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Append `child` to the child list if it is not already present.
    /// First-insertion order is preserved; duplicates are never added.
    pub fn add_child(&mut self, child: Hash) {
        if !self.entries.contains(&child) {
            self.entries.push(child);
        }
    }

    /// Remove `child` from the child list, keeping the order of the rest.
    pub fn remove_child(&mut self, child: &Hash) {
        self.entries.retain(|c| c != child);
    }
}

/// Serde adapter encoding byte payloads as standard base64 strings.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
