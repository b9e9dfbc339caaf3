//! Versioned on-disk envelope for the credential store.

use crate::constants;
use crate::models::credential::CredentialMapping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreFile {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_hash: Option<String>,
    #[serde(default)]
    pub credentials: CredentialMapping,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: constants::STORE_FORMAT_VERSION,
            master_hash: None,
            credentials: CredentialMapping::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_optional_fields_default() {
        let file: StoreFile = serde_json::from_str(r#"{"version":1}"#).unwrap();
        assert!(file.master_hash.is_none());
        assert!(file.credentials.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let res = serde_json::from_str::<StoreFile>(r#"{"version":1,"extra":true}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_absent_master_not_serialized() {
        let json = serde_json::to_string(&StoreFile::default()).unwrap();
        assert_eq!(json, r#"{"version":1,"credentials":{}}"#);
    }
}
