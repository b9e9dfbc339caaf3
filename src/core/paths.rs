//! Backing-file path resolution and the sibling files derived from it.

use crate::constants;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub store_file: PathBuf,
    pub lock_file: PathBuf,
    pub audit_log: PathBuf,
}

impl StorePaths {
    /// Resolve from an explicit path (CLI flag or env, via clap) or the default.
    pub fn resolve(file_arg: Option<PathBuf>) -> Self {
        let store_file = file_arg.unwrap_or_else(|| PathBuf::from(constants::DEFAULT_STORE_FILE));
        Self::from_store_file(store_file)
    }

    pub fn from_store_file(store_file: PathBuf) -> Self {
        let lock_file = with_suffix(&store_file, constants::LOCK_SUFFIX);
        let audit_log = with_suffix(&store_file, constants::AUDIT_SUFFIX);
        Self {
            store_file,
            lock_file,
            audit_log,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl std::fmt::Display for StorePaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lockbox@{}", self.store_file.display())
    }
}
