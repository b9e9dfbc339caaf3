//! CLI routing and command dispatch.

use crate::constants;
use crate::core::audit_log::{AuditAction, AuditLog};
use crate::core::paths::StorePaths;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod audit;
pub mod credential;
pub mod session;
pub mod shell;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: StorePaths,
    pub non_interactive: bool,
}

impl CliContext {
    /// Append an audit entry. Failures are reported, never fatal.
    pub fn audit(&self, action: AuditAction, username: Option<&str>, success: bool) {
        let log = AuditLog::new(&self.paths.audit_log);
        if let Err(e) = log.record(action, username, success) {
            eprintln!("warning: audit log failed: {:#}", e);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "lockbox",
    version,
    about = "Local credential store gated by a master password"
)]
pub struct Cli {
    /// Backing file for the credential store
    #[arg(long, global = true, value_name = "PATH", env = constants::STORE_FILE_ENV)]
    pub file: Option<PathBuf>,

    /// No prompts: the master password is read from the first line of stdin
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let ctx = CliContext {
            paths: StorePaths::resolve(self.file),
            non_interactive: self.non_interactive,
        };

        match self.command.unwrap_or(Commands::Shell) {
            Commands::Shell => shell::run(&ctx),
            Commands::Add(args) => credential::run_add(&ctx, args),
            Commands::Get(args) => credential::run_get(&ctx, args),
            Commands::List(args) => credential::run_list(&ctx, args),
            Commands::Delete(args) => credential::run_delete(&ctx, args),
            Commands::Audit { command } => audit::run(&ctx, command),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session (default)
    Shell,
    /// Store or overwrite the secret for a username
    Add(credential::AddArgs),
    /// Print the secret for a username
    Get(credential::GetArgs),
    /// List stored credentials
    List(credential::ListArgs),
    /// Delete a credential
    Delete(credential::DeleteArgs),
    /// View or verify the audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
}
