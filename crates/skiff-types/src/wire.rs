//! Request shapes shared between the HTTP handlers and the client glue.

use serde::{Deserialize, Serialize};

use crate::entry::base64_bytes;
use crate::{Hash, hex_nibble};

/// Body of a `POST /account/{addr}/store/{key}` request.
///
/// The entry key is carried in the URL; the body carries the claimed
/// parent, the opaque payload, and the signature material the server
/// verifies before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Claimed parent key; `null` only when writing the account root.
    pub parent: Option<Hash>,
    /// Opaque payload bytes, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    /// ed25519 signature over the entry digest, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// Hex-encoded 32-byte ed25519 public key of the signer.
    pub public_key: String,
}

impl UpdateRequest {
    /// Decode the `public_key` field into raw key bytes.
    ///
    /// Returns `None` for anything that is not exactly 64 hex characters;
    /// verification treats that as an invalid signature.
    pub fn public_key_bytes(&self) -> Option<[u8; 32]> {
        let hex = self.public_key.as_bytes();
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_nibble(hex[i * 2]).ok()?;
            let lo = hex_nibble(hex[i * 2 + 1]).ok()?;
            *byte = (hi << 4) | lo;
        }
        Some(bytes)
    }
}
