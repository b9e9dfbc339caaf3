//! `audit` subcommands. Both open a session first, so reading the trail
//! needs the master password just like reading a secret.

use crate::cli::session::{self, MasterInput};
use crate::cli::CliContext;
use crate::core::audit_log::{AuditEntry, AuditLog};
use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show recent gate and credential events
    Log(AuditLogArgs),
    /// Check that no event has been altered or removed
    Verify,
}

#[derive(Args, Debug)]
pub struct AuditLogArgs {
    /// Number of most recent events to show
    #[arg(long, default_value_t = 20)]
    pub last: usize,
}

pub fn run(ctx: &CliContext, cmd: AuditCommand) -> Result<()> {
    let _session = session::open(ctx, &mut MasterInput::for_context(ctx)?)?;
    let log = AuditLog::new(&ctx.paths.audit_log);

    match cmd {
        AuditCommand::Log(args) => {
            let entries = log.entries(Some(args.last))?;
            if entries.is_empty() {
                println!("No events recorded for {}", ctx.paths);
            } else {
                println!("{}", render_entries(&entries));
            }
            Ok(())
        }
        AuditCommand::Verify => {
            let report = log.verify()?;
            for problem in &report.problems {
                eprintln!("{}", problem);
            }
            if !report.is_intact() {
                bail!(
                    "audit trail for {} is damaged ({} of {} lines)",
                    ctx.paths,
                    report.problems.len(),
                    report.entries
                );
            }
            println!("{} events, chain intact", report.entries);
            Ok(())
        }
    }
}

fn render_entries(entries: &[AuditEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["When", "Event", "Username", "By"]);
    for entry in entries {
        let when: DateTime<Local> = entry.timestamp.into();
        let event = if entry.success {
            entry.action.to_string()
        } else {
            format!("{} (failed)", entry.action)
        };
        table.add_row(vec![
            when.format("%Y-%m-%d %H:%M:%S").to_string(),
            event,
            entry.username.clone().unwrap_or_default(),
            entry.actor.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit_log::AuditAction;
    use chrono::Utc;

    fn entry(action: AuditAction, username: Option<&str>, success: bool) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            action,
            actor: "tester".into(),
            username: username.map(str::to_string),
            success,
            prev_hash: None,
            hash: String::new(),
        }
    }

    #[test]
    fn test_render_marks_failures() {
        let rendered = render_entries(&[
            entry(AuditAction::Authenticate, None, false),
            entry(AuditAction::Get, Some("bob"), true),
        ])
        .to_string();
        assert!(rendered.contains("authenticate (failed)"));
        assert!(rendered.contains("bob"));
        assert!(rendered.contains("tester"));
        assert!(!rendered.contains("get (failed)"));
    }

    #[test]
    fn test_render_has_no_secret_column() {
        let rendered = render_entries(&[entry(AuditAction::Add, Some("alice"), true)]).to_string();
        assert!(rendered.contains("Username"));
        assert!(!rendered.contains("Secret"));
    }
}
