//! Credential entries, the master-password gate, and the store snapshot.

use crate::constants;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use subtle::ConstantTimeEq;

/// Username → secret. Ordered so listings are deterministic.
pub type CredentialMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialEntry {
    pub username: String,
    pub secret: String,
}

/// Gate plus mapping; the unit the persistence layer snapshots.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub master: Option<MasterCredential>,
    pub credentials: CredentialMapping,
}

/// Hex-encoded SHA-256 digest of the master password.
#[derive(Clone)]
pub struct MasterCredential {
    hex: String,
}

impl MasterCredential {
    /// Hash a raw master password.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            hex: digest_hex(raw),
        }
    }

    /// Accept a stored digest. Returns `None` unless it is 64 lowercase hex chars.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == constants::MASTER_HASH_HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self {
            hex: hex.to_string(),
        })
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Constant-time check of `raw` against the stored digest.
    pub fn verify(&self, raw: &str) -> bool {
        let candidate = digest_hex(raw);
        candidate.as_bytes().ct_eq(self.hex.as_bytes()).into()
    }
}

impl fmt::Debug for MasterCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterCredential(..)")
    }
}

fn digest_hex(raw: &str) -> String {
    let hash = Sha256::digest(raw.as_bytes());
    format!("{:064x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_is_sha256_hex() {
        let master = MasterCredential::from_raw("m");
        assert_eq!(
            master.as_hex(),
            "62c66a7a5dd70c3146618063c344e531e6d4b59e379808443ce962b3abd63c5a"
        );
    }

    #[test]
    fn test_verify_matches_only_same_password() {
        let master = MasterCredential::from_raw("correct horse");
        assert!(master.verify("correct horse"));
        assert!(!master.verify("correct horse "));
        assert!(!master.verify("wrong"));
        assert!(!master.verify(""));
    }

    #[test]
    fn test_from_hex_validation() {
        let hex = MasterCredential::from_raw("x").as_hex().to_string();
        assert!(MasterCredential::from_hex(&hex).is_some());
        assert!(MasterCredential::from_hex(&hex.to_uppercase()).is_none());
        assert!(MasterCredential::from_hex(&hex[1..]).is_none());
        assert!(MasterCredential::from_hex("zz").is_none());
    }

    #[test]
    fn test_debug_hides_digest() {
        let master = MasterCredential::from_raw("m");
        assert_eq!(format!("{:?}", master), "MasterCredential(..)");
    }
}
