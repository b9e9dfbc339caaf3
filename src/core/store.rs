//! Credential store: master-password gate plus the username → secret mapping.
//!
//! Gate lifecycle is `Uninitialized → Locked → Unlocked`. Mapping operations
//! require `Unlocked`. Each mutation persists the full snapshot; if the save
//! fails the mutation is undone in memory so memory and disk stay in step.

use crate::core::persistence::Persistence;
use crate::error::{Result, StoreError};
use crate::models::credential::{CredentialEntry, MasterCredential, StoreState};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No master password has been set.
    Uninitialized,
    /// Gate set, not yet verified this session.
    Locked,
    Unlocked,
}

#[derive(Debug)]
pub struct CredentialStore {
    persistence: Persistence,
    state: StoreState,
    unlocked: bool,
}

impl CredentialStore {
    /// Load the store backed by `path`. A missing file gives an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_persistence(Persistence::new(path))
    }

    pub fn with_persistence(persistence: Persistence) -> Result<Self> {
        let state = persistence.load()?;
        Ok(Self {
            persistence,
            state,
            unlocked: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.persistence.path()
    }

    pub fn state(&self) -> GateState {
        match (&self.state.master, self.unlocked) {
            (None, _) => GateState::Uninitialized,
            (Some(_), false) => GateState::Locked,
            (Some(_), true) => GateState::Unlocked,
        }
    }

    /// Set the master password on an uninitialized store and persist it.
    ///
    /// Ignored once a gate exists; re-keying is not supported.
    pub fn set_master_password(&mut self, raw: &str) -> Result<()> {
        if self.state.master.is_some() {
            debug!("master password already set, ignoring");
            return Ok(());
        }
        self.state.master = Some(MasterCredential::from_raw(raw));
        if let Err(e) = self.persistence.save(&self.state) {
            self.state.master = None;
            return Err(e);
        }
        info!(path = %self.path().display(), "master password set");
        Ok(())
    }

    /// Check `raw` against the gate. Unlocks on match; a mismatch leaves the
    /// current state unchanged.
    pub fn authenticate(&mut self, raw: &str) -> bool {
        let Some(master) = &self.state.master else {
            warn!("authentication attempted on uninitialized store");
            return false;
        };
        if master.verify(raw) {
            self.unlocked = true;
            debug!("store unlocked");
            true
        } else {
            warn!("master password mismatch");
            false
        }
    }

    /// Like [`authenticate`](Self::authenticate) but as a `Result`.
    pub fn unlock(&mut self, raw: &str) -> Result<()> {
        if self.state.master.is_none() {
            return Err(StoreError::Uninitialized);
        }
        if self.authenticate(raw) {
            Ok(())
        } else {
            Err(StoreError::AuthenticationFailed)
        }
    }

    /// Drop back to `Locked` without touching disk.
    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    /// Insert or silently overwrite the secret for `username`, then persist.
    pub fn add_credential(&mut self, username: &str, secret: &str) -> Result<()> {
        self.ensure_unlocked()?;
        let previous = self
            .state
            .credentials
            .insert(username.to_string(), secret.to_string());
        if let Err(e) = self.persistence.save(&self.state) {
            match previous {
                Some(old) => self.state.credentials.insert(username.to_string(), old),
                None => self.state.credentials.remove(username),
            };
            return Err(e);
        }
        info!(
            username,
            overwritten = previous.is_some(),
            "credential stored"
        );
        Ok(())
    }

    /// Remove `username` and persist. `NotFound` leaves everything untouched.
    pub fn delete_credential(&mut self, username: &str) -> Result<()> {
        self.ensure_unlocked()?;
        let Some(old) = self.state.credentials.remove(username) else {
            return Err(StoreError::NotFound(username.to_string()));
        };
        if let Err(e) = self.persistence.save(&self.state) {
            self.state.credentials.insert(username.to_string(), old);
            return Err(e);
        }
        info!(username, "credential deleted");
        Ok(())
    }

    pub fn get_credential(&self, username: &str) -> Result<&str> {
        self.ensure_unlocked()?;
        self.state
            .credentials
            .get(username)
            .map(String::as_str)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    /// Every stored pair, ordered by username.
    pub fn list_credentials(&self) -> Result<Vec<CredentialEntry>> {
        self.ensure_unlocked()?;
        Ok(self
            .state
            .credentials
            .iter()
            .map(|(username, secret)| CredentialEntry {
                username: username.clone(),
                secret: secret.clone(),
            })
            .collect())
    }

    pub fn contains(&self, username: &str) -> Result<bool> {
        self.ensure_unlocked()?;
        Ok(self.state.credentials.contains_key(username))
    }

    pub fn len(&self) -> Result<usize> {
        self.ensure_unlocked()?;
        Ok(self.state.credentials.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    fn ensure_unlocked(&self) -> Result<()> {
        match self.state() {
            GateState::Unlocked => Ok(()),
            GateState::Locked => Err(StoreError::Locked),
            GateState::Uninitialized => Err(StoreError::Uninitialized),
        }
    }
}
