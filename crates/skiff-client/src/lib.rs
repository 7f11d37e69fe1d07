//! Client-side glue for the skiff account store.
//!
//! Servers address entries by hash; humans address them by path. This
//! crate bridges the two: [`StoreClient`] derives the `(key, parent)`
//! hashes for a path, signs the entry digest with the account's ed25519
//! key, and produces the wire body a `POST /account/{addr}/store/{key}`
//! expects. Transport is out of scope — callers hand the encoded body to
//! whatever HTTP client they use.

use ed25519_dalek::{Signer, SigningKey};
use skiff_types::wire::UpdateRequest;
use skiff_types::{Hash, key_hash, signature};

pub use skiff_types::parent_path;

/// Signs and encodes store updates for one account.
pub struct StoreClient {
    account: Hash,
    signing_key: SigningKey,
}

impl StoreClient {
    /// Create a client for `account` with its signing key.
    pub fn new(account: Hash, signing_key: SigningKey) -> Self {
        Self {
            account,
            signing_key,
        }
    }

    /// Create a client from a raw 32-byte key seed.
    pub fn from_seed(account: Hash, seed: [u8; 32]) -> Self {
        Self::new(account, SigningKey::from_bytes(&seed))
    }

    /// The account this client writes to.
    pub fn account(&self) -> Hash {
        self.account
    }

    /// Hex form of the public half of the signing key, as carried in the
    /// `public_key` field of update bodies.
    pub fn public_key_hex(&self) -> String {
        self.signing_key
            .verifying_key()
            .to_bytes()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Storage key for a path within this client's account.
    pub fn key_for(&self, path: &str) -> Hash {
        key_hash(&self.account, path)
    }

    /// Parent key for a path; `None` for the root path `/`.
    pub fn parent_for(&self, path: &str) -> Option<Hash> {
        parent_path(path).map(|parent| key_hash(&self.account, &parent))
    }

    /// Build a signed update for `path` carrying `value`.
    ///
    /// Returns the entry key (it goes in the request URL) and the body to
    /// POST. The signature covers `SHA-256(key || parent_or_empty || value)`.
    pub fn put_request(&self, path: &str, value: Vec<u8>) -> (Hash, UpdateRequest) {
        let key = self.key_for(path);
        let parent = self.parent_for(path);
        let digest = signature::entry_digest(&key, parent.as_ref(), &value);
        let sig = self.signing_key.sign(&digest);

        let request = UpdateRequest {
            parent,
            value,
            signature: sig.to_bytes().to_vec(),
            public_key: self.public_key_hex(),
        };
        (key, request)
    }

    /// Serialize an update body to the JSON the server expects.
    pub fn encode(request: &UpdateRequest) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(request)
    }
}
