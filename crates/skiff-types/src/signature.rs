//! Entry signature digest and verification.
//!
//! The message signed by a client is not the entry itself but a fixed
//! digest over its identifying fields:
//!
//! ```text
//! SHA-256( key.bytes || parent.bytes_or_empty || data )
//! ```
//!
//! where `parent.bytes_or_empty` is the 32-byte parent key, or nothing when
//! the entry is the account root. The signature field itself never enters
//! the digest. Keys are ed25519; resolution of the public key to an account
//! is the job of the outer authentication layer.

use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::Hash;

/// Compute the signing digest for an entry.
pub fn entry_digest(key: &Hash, parent: Option<&Hash>, data: &[u8]) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.update(key.as_bytes());
    if let Some(parent) = parent {
        sha.update(parent.as_bytes());
    }
    sha.update(data);
    sha.finalize().into()
}

/// Verify `signature` over `digest` against a raw 32-byte ed25519 public key.
///
/// Malformed key or signature shapes yield `false`; this function never
/// panics or errors on attacker-controlled input.
pub fn verify(public_key: &[u8], digest: &[u8; 32], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);
    key.verify_strict(digest, &signature).is_ok()
}
