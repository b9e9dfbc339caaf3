//! Interactive menu session: authenticate once, then loop until quit.

use crate::cli::credential::{add_entry, delete_entry, print_secret, print_table, prompt_secret};
use crate::cli::session::{self, TerminalPrompt};
use crate::cli::CliContext;
use anyhow::{bail, Context, Result};
use dialoguer::{Input, Select};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    Delete,
    List,
    Get,
    Quit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        MenuChoice::Add,
        MenuChoice::Delete,
        MenuChoice::List,
        MenuChoice::Get,
        MenuChoice::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Add => "Add password",
            MenuChoice::Delete => "Delete password",
            MenuChoice::List => "List passwords",
            MenuChoice::Get => "Get password",
            MenuChoice::Quit => "Quit",
        }
    }
}

pub fn run(ctx: &CliContext) -> Result<()> {
    if ctx.non_interactive {
        bail!("shell is interactive; use add/get/list/delete with --non-interactive");
    }
    let mut session = session::open(ctx, &mut TerminalPrompt)?;
    let labels: Vec<&str> = MenuChoice::ALL.iter().map(|c| c.label()).collect();

    loop {
        let index = Select::new()
            .with_prompt("Choose an action")
            .items(&labels)
            .default(0)
            .interact()
            .context("read menu choice")?;
        let Some(choice) = MenuChoice::ALL.get(index).copied() else {
            continue;
        };

        let store = &mut session.store;
        let outcome = match choice {
            MenuChoice::Add => {
                let username = prompt_username()?;
                let secret = prompt_secret(&username)?;
                add_entry(ctx, store, &username, &secret)
            }
            MenuChoice::Delete => {
                let username = prompt_username()?;
                delete_entry(ctx, store, &username)
            }
            MenuChoice::List => store
                .list_credentials()
                .map(|entries| print_table(&entries, true))
                .map_err(Into::into),
            MenuChoice::Get => {
                let username = prompt_username()?;
                print_secret(ctx, store, &username)
            }
            MenuChoice::Quit => break,
        };

        if let Err(e) = outcome {
            if !session::is_recoverable(&e) {
                return Err(e);
            }
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn prompt_username() -> Result<String> {
    Input::<String>::new()
        .with_prompt("Username")
        .interact_text()
        .context("read username")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_order() {
        let labels: Vec<_> = MenuChoice::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Add password",
                "Delete password",
                "List passwords",
                "Get password",
                "Quit"
            ]
        );
    }

    #[test]
    fn test_quit_is_last() {
        assert_eq!(MenuChoice::ALL.last(), Some(&MenuChoice::Quit));
    }
}
