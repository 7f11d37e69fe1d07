//! Shared types and identifiers for the skiff account store.
//!
//! This crate defines the core vocabulary used across the workspace:
//! the [`Hash`] primitive and key derivation ([`key_hash`], [`root_hash`],
//! [`parent_path`]), the persistent [`Entry`] record with its normative
//! JSON form, the signature digest scheme ([`signature`]), the wire shapes
//! exchanged with clients ([`wire`]), and the pluggable [`Clock`].

pub mod entry;
pub mod signature;
pub mod wire;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub use entry::Entry;

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// A 32-byte SHA-256 content hash.
///
/// Identifies accounts and store entries. Compares and orders on the raw
/// bytes; the lowercase-hex string form is used on the wire and as the
/// on-disk partition prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Hash arbitrary data with SHA-256.
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

/// Error returned when parsing a hash from its hex string form fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hash: expected 64 lowercase hex characters")]
pub struct ParseHashError;

impl FromStr for Hash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ParseHashError);
        }
        let hex = s.as_bytes();
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (hex_nibble(hex[i * 2])? << 4) | hex_nibble(hex[i * 2 + 1])?;
        }
        Ok(Self(bytes))
    }
}

pub(crate) fn hex_nibble(c: u8) -> Result<u8, ParseHashError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ParseHashError),
    }
}

// The JSON entry form is normative: hashes travel as hex strings, not as
// byte arrays.
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Derive the storage key for `path` within `account`.
///
/// `key_hash = SHA-256(account_hex ++ path)`. Folding the account's hex
/// form into the digest keeps key spaces disjoint across accounts.
pub fn key_hash(account: &Hash, path: &str) -> Hash {
    let mut buf = String::with_capacity(64 + path.len());
    buf.push_str(&account.to_string());
    buf.push_str(path);
    Hash::from_data(buf.as_bytes())
}

/// The key of an account's root entry: `key_hash(account, "/")`.
pub fn root_hash(account: &Hash) -> Hash {
    key_hash(account, "/")
}

/// Derive the parent path of a slash-delimited absolute path.
///
/// The parent is the longest proper prefix ending at `/`, right-trimmed of
/// the trailing `/`; an empty prefix means the root. `"/"` itself has no
/// parent.
///
/// ```
/// use skiff_types::parent_path;
/// assert_eq!(parent_path("/contacts/alice").as_deref(), Some("/contacts"));
/// assert_eq!(parent_path("/contacts").as_deref(), Some("/"));
/// assert_eq!(parent_path("/"), None);
/// ```
pub fn parent_path(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    let cut = trimmed.rfind('/')?;
    if cut == 0 {
        Some("/".to_string())
    } else {
        Some(trimmed[..cut].to_string())
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source for entry timestamps, in whole seconds since the epoch.
///
/// Production code uses [`Clock::system`]. Tests install a [`Clock::fixed`]
/// value and script it with [`Clock::set`] to verify timestamp propagation
/// exactly.
#[derive(Clone, Default)]
pub struct Clock {
    fixed: Option<Arc<AtomicU64>>,
}

impl Clock {
    /// A clock that reads the wall clock on every call.
    pub fn system() -> Self {
        Self { fixed: None }
    }

    /// A clock frozen at `secs`, advanced only via [`set`](Self::set).
    pub fn fixed(secs: u64) -> Self {
        Self {
            fixed: Some(Arc::new(AtomicU64::new(secs))),
        }
    }

    /// Move a fixed clock to `secs`. Has no effect on a system clock.
    pub fn set(&self, secs: u64) {
        if let Some(fixed) = &self.fixed {
            fixed.store(secs, Ordering::SeqCst);
        }
    }

    /// Current time in seconds since the epoch.
    pub fn now(&self) -> u64 {
        match &self.fixed {
            Some(fixed) => fixed.load(Ordering::SeqCst),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fixed {
            Some(fixed) => write!(f, "Clock::fixed({})", fixed.load(Ordering::SeqCst)),
            None => write!(f, "Clock::system"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_from_data_deterministic() {
        let h1 = Hash::from_data(b"hello world");
        let h2 = Hash::from_data(b"hello world");
        assert_eq!(h1, h2);
        assert_ne!(h1, Hash::from_data(b"hello worlds"));
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        let hash = Hash::from([
            0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f, 0x60, 0x71, 0x82, 0x93, 0xa4, 0xb5, 0xc6, 0xd7,
            0xe8, 0xf9, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb,
            0xcc, 0xdd, 0xee, 0xff,
        ]);
        assert_eq!(
            hash.to_string(),
            "0a1b2c3d4e5f60718293a4b5c6d7e8f900112233445566778899aabbccddeeff"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let hash = Hash::from_data(b"roundtrip");
        let parsed: Hash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("zz".parse::<Hash>().is_err());
        assert!("deadbeef".parse::<Hash>().is_err());
        let not_hex = "g".repeat(64);
        assert!(not_hex.parse::<Hash>().is_err());
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let hash = Hash::from_data(b"case");
        let upper = hash.to_string().to_uppercase();
        assert_eq!(upper.parse::<Hash>().unwrap(), hash);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let hash = Hash::from_data(b"wire form");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_debug_format() {
        let hash = Hash::from([0u8; 32]);
        let debug = format!("{hash:?}");
        assert!(debug.starts_with("Hash("));
        assert!(debug.ends_with(')'));
    }

    // Fixtures shared with the original system; clients and servers must
    // agree on these exact values.

    #[test]
    fn test_key_hash_fixtures() {
        let account = Hash::from_data(b"foo!");
        assert_eq!(
            key_hash(&account, "/").to_string(),
            "94723340d93b27ca21384fa64db760e10ee2382a3ded94f1e4243bacc24825e6"
        );
        assert_eq!(
            key_hash(&account, "/contacts").to_string(),
            "9f198242afd0a2660077b05c90c4aad8807b381f8e1af89e556c9a0e0e66331d"
        );
        assert_eq!(
            key_hash(&account, "/foo").to_string(),
            "f2f5d73819bf7302d137500293b85e5e13e8c2069e3f3ad85fa4ad8ea7ed1efe"
        );
        assert_eq!(
            key_hash(&account, "/foo/bar").to_string(),
            "79780c884b68f0bb259371679413fc3607c3c4bc9eef2d675ab5266e09f04bce"
        );
    }

    #[test]
    fn test_root_hash_matches_slash_key() {
        let account = Hash::from_data(b"someone");
        assert_eq!(root_hash(&account), key_hash(&account, "/"));
    }

    #[test]
    fn test_key_hash_differs_across_accounts() {
        let a = Hash::from_data(b"account a");
        let b = Hash::from_data(b"account b");
        assert_ne!(key_hash(&a, "/inbox"), key_hash(&b, "/inbox"));
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/contacts").as_deref(), Some("/"));
        assert_eq!(parent_path("/contacts/alice").as_deref(), Some("/contacts"));
        assert_eq!(parent_path("/a/b/c").as_deref(), Some("/a/b"));
        // Trailing slashes do not change the parent.
        assert_eq!(parent_path("/contacts/alice/").as_deref(), Some("/contacts"));
    }

    #[test]
    fn test_fixed_clock_is_scriptable() {
        let clock = Clock::fixed(100);
        assert_eq!(clock.now(), 100);
        clock.set(250);
        assert_eq!(clock.now(), 250);

        // Clones observe the same script.
        let other = clock.clone();
        clock.set(300);
        assert_eq!(other.now(), 300);
    }

    #[test]
    fn test_system_clock_is_sane() {
        let clock = Clock::system();
        // Some time after 2020-01-01.
        assert!(clock.now() > 1_577_836_800);
        // set() must not disturb a system clock.
        clock.set(0);
        assert!(clock.now() > 1_577_836_800);
    }
}
