//! Whole-snapshot persistence of the store to its backing file.
//!
//! Every save rewrites the full snapshot through a temp file in the same
//! directory followed by a rename, so a crash never leaves a partial file.

use crate::constants;
use crate::error::{Result, StoreError};
use crate::models::credential::{MasterCredential, StoreState};
use crate::models::store_file::StoreFile;
use crate::util::fs as store_fs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone)]
pub struct Persistence {
    path: PathBuf,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file yields an empty, uninitialized state.
    pub fn load(&self) -> Result<StoreState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "store file absent, starting empty");
            return Ok(StoreState::default());
        }
        let content = fs::read(&self.path)
            .map_err(|e| StoreError::io(format!("read store {}", self.path.display()), e))?;
        let file: StoreFile = serde_json::from_slice(&content).map_err(|e| self.corrupt(e))?;
        if file.version != constants::STORE_FORMAT_VERSION {
            return Err(self.corrupt(format!("unsupported version {}", file.version)));
        }
        let master = match file.master_hash {
            Some(hex) => Some(
                MasterCredential::from_hex(&hex)
                    .ok_or_else(|| self.corrupt("master_hash is not a SHA-256 hex digest"))?,
            ),
            None => None,
        };
        debug!(
            path = %self.path.display(),
            entries = file.credentials.len(),
            "loaded store"
        );
        Ok(StoreState {
            master,
            credentials: file.credentials,
        })
    }

    /// Serialize the full snapshot and atomically replace the backing file.
    pub fn save(&self, state: &StoreState) -> Result<()> {
        let file = StoreFile {
            version: constants::STORE_FORMAT_VERSION,
            master_hash: state.master.as_ref().map(|m| m.as_hex().to_string()),
            credentials: state.credentials.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let dir = store_fs::parent_dir(&self.path);
        store_fs::ensure_parent_dir(&self.path)
            .map_err(|e| StoreError::io(format!("create dir {}", dir.display()), e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::io("create temp store file", e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| StoreError::io("write temp store file", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io("sync temp store file", e))?;

        #[cfg(unix)]
        {
            let perm = fs::Permissions::from_mode(constants::STORE_FILE_MODE);
            tmp.as_file()
                .set_permissions(perm)
                .map_err(|e| StoreError::io("set permissions on temp store file", e))?;
        }

        tmp.persist(&self.path).map_err(|e| {
            StoreError::io(format!("persist store {}", self.path.display()), e.error)
        })?;
        debug!(
            path = %self.path.display(),
            entries = state.credentials.len(),
            "saved store"
        );
        Ok(())
    }

    fn corrupt(&self, reason: impl ToString) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
