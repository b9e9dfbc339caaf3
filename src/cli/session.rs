//! Opening an authenticated session: lock, load, initialize gate, unlock.
//!
//! The master password comes from a [`PasswordSource`]: the terminal when
//! interactive, otherwise the first line of stdin.

use crate::cli::CliContext;
use crate::core::audit_log::AuditAction;
use crate::core::file_lock::SessionLock;
use crate::core::store::{CredentialStore, GateState};
use crate::error::StoreError;
use anyhow::{bail, Context, Result};
use dialoguer::Password;
use std::io::Read;
use zeroize::Zeroizing;

/// Where the master password is read from.
pub trait PasswordSource {
    /// Password for an existing gate.
    fn master_password(&mut self) -> Result<Zeroizing<String>>;
    /// Password for a store that has no gate yet.
    fn new_master_password(&mut self) -> Result<Zeroizing<String>>;
}

/// Interactive prompts on the controlling terminal.
pub struct TerminalPrompt;

impl PasswordSource for TerminalPrompt {
    fn master_password(&mut self) -> Result<Zeroizing<String>> {
        let raw = Password::new()
            .with_prompt("Master password")
            .allow_empty_password(false)
            .interact()
            .context("read master password")?;
        Ok(Zeroizing::new(raw))
    }

    fn new_master_password(&mut self) -> Result<Zeroizing<String>> {
        let raw = Password::new()
            .with_prompt("New master password")
            .with_confirmation("Confirm master password", "passwords do not match")
            .allow_empty_password(false)
            .interact()
            .context("read new master password")?;
        Ok(Zeroizing::new(raw))
    }
}

/// Piped input: master password on the first line, anything after it is
/// kept for the command (the secret for `add --from-stdin`).
pub struct PipedInput {
    master: Zeroizing<String>,
    remainder: Option<Zeroizing<String>>,
}

impl PipedInput {
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut buf = Zeroizing::new(String::new());
        reader
            .read_to_string(&mut buf)
            .context("read master password from stdin")?;
        let (first, rest) = buf.split_once('\n').unwrap_or((buf.as_str(), ""));
        Ok(Self {
            master: Zeroizing::new(first.trim_end_matches('\r').to_string()),
            remainder: Some(Zeroizing::new(
                rest.trim_end_matches(['\r', '\n']).to_string(),
            )),
        })
    }

    /// Input following the master password line. Yields it once.
    pub fn take_remainder(&mut self) -> Option<Zeroizing<String>> {
        self.remainder.take()
    }

    fn first_line(&self) -> Result<Zeroizing<String>> {
        if self.master.is_empty() {
            bail!("--non-interactive expects the master password on the first line of stdin");
        }
        Ok(self.master.clone())
    }
}

impl PasswordSource for PipedInput {
    fn master_password(&mut self) -> Result<Zeroizing<String>> {
        self.first_line()
    }

    fn new_master_password(&mut self) -> Result<Zeroizing<String>> {
        self.first_line()
    }
}

/// The source matching the invocation mode.
pub enum MasterInput {
    Prompt(TerminalPrompt),
    Piped(PipedInput),
}

impl MasterInput {
    pub fn for_context(ctx: &CliContext) -> Result<Self> {
        if ctx.non_interactive {
            Ok(Self::Piped(PipedInput::from_reader(std::io::stdin().lock())?))
        } else {
            Ok(Self::Prompt(TerminalPrompt))
        }
    }

    /// Piped input left after the master password, if stdin was consumed.
    pub fn take_remainder(&mut self) -> Option<Zeroizing<String>> {
        match self {
            Self::Prompt(_) => None,
            Self::Piped(piped) => piped.take_remainder(),
        }
    }
}

impl PasswordSource for MasterInput {
    fn master_password(&mut self) -> Result<Zeroizing<String>> {
        match self {
            Self::Prompt(p) => p.master_password(),
            Self::Piped(p) => p.master_password(),
        }
    }

    fn new_master_password(&mut self) -> Result<Zeroizing<String>> {
        match self {
            Self::Prompt(p) => p.new_master_password(),
            Self::Piped(p) => p.new_master_password(),
        }
    }
}

/// An unlocked store plus the lock that keeps other sessions out.
pub struct Session {
    pub store: CredentialStore,
    _lock: SessionLock,
}

pub fn open(ctx: &CliContext, source: &mut dyn PasswordSource) -> Result<Session> {
    let lock = SessionLock::acquire(&ctx.paths.lock_file)?;
    let mut store = CredentialStore::open(&ctx.paths.store_file)
        .with_context(|| format!("open {}", ctx.paths))?;

    let raw = if store.state() == GateState::Uninitialized {
        let raw = source.new_master_password()?;
        let result = store.set_master_password(&raw);
        ctx.audit(AuditAction::Init, None, result.is_ok());
        result.context("save master password")?;
        eprintln!("Master password set for {}", ctx.paths.store_file.display());
        raw
    } else {
        source.master_password()?
    };

    let result = store.unlock(&raw);
    ctx.audit(AuditAction::Authenticate, None, result.is_ok());
    result?;

    Ok(Session { store, _lock: lock })
}

/// True when `err` leaves the session usable (unknown username, bad password).
pub fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>()
        .is_some_and(StoreError::is_recoverable)
}
