use crate::cli::session::{self, MasterInput};
use crate::cli::CliContext;
use crate::constants;
use crate::core::audit_log::AuditAction;
use crate::core::store::CredentialStore;
use crate::models::credential::CredentialEntry;
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use dialoguer::Password;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use serde::Serialize;
use std::io::Read;
use zeroize::Zeroizing;

const MASK: &str = "********";

fn parse_username(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("username cannot be empty".into());
    }
    Ok(s.to_string())
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,

    /// Read secret from stdin (with --non-interactive, the lines after the master password)
    #[arg(long, conflicts_with = "generate")]
    pub from_stdin: bool,

    /// Generate a random alphanumeric secret and print it
    #[arg(long)]
    pub generate: bool,

    /// Length for generated secret
    #[arg(long, default_value_t = constants::DEFAULT_GENERATED_LENGTH, requires = "generate")]
    pub length: usize,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,

    /// Show secrets instead of masking them
    #[arg(long)]
    pub show_secrets: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,
}

#[derive(Serialize)]
struct ListItem<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

pub fn run_add(ctx: &CliContext, args: AddArgs) -> Result<()> {
    if ctx.non_interactive && !args.from_stdin && !args.generate {
        bail!("--non-interactive requires --from-stdin or --generate for add");
    }
    if args.generate && args.length == 0 {
        bail!("--length must be at least 1");
    }

    let mut input = MasterInput::for_context(ctx)?;
    let mut session = session::open(ctx, &mut input)?;

    let secret = if args.generate {
        Zeroizing::new(generate_secret(args.length))
    } else if args.from_stdin {
        match input.take_remainder() {
            Some(rest) => rest,
            None => read_secret_stdin()?,
        }
    } else {
        prompt_secret(&args.username)?
    };

    add_entry(ctx, &mut session.store, &args.username, &secret)?;
    if args.generate {
        println!("{}", secret.as_str());
    }
    Ok(())
}

pub fn run_get(ctx: &CliContext, args: GetArgs) -> Result<()> {
    let session = session::open(ctx, &mut MasterInput::for_context(ctx)?)?;
    print_secret(ctx, &session.store, &args.username)
}

pub fn run_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let session = session::open(ctx, &mut MasterInput::for_context(ctx)?)?;
    let entries = session.store.list_credentials()?;
    match args.format {
        ListFormat::Json => print_json(&entries, args.show_secrets),
        ListFormat::Table => {
            print_table(&entries, args.show_secrets);
            Ok(())
        }
    }
}

pub fn run_delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let mut session = session::open(ctx, &mut MasterInput::for_context(ctx)?)?;
    delete_entry(ctx, &mut session.store, &args.username)
}

/// Store a secret, reporting whether an existing one was replaced.
pub(crate) fn add_entry(
    ctx: &CliContext,
    store: &mut CredentialStore,
    username: &str,
    secret: &str,
) -> Result<()> {
    check_secret_size(secret)?;
    let existed = store.contains(username)?;
    let result = store.add_credential(username, secret);
    ctx.audit(AuditAction::Add, Some(username), result.is_ok());
    result?;
    if existed {
        eprintln!("Updated {}", username);
    } else {
        eprintln!("Stored {}", username);
    }
    Ok(())
}

pub(crate) fn print_secret(ctx: &CliContext, store: &CredentialStore, username: &str) -> Result<()> {
    let result = store.get_credential(username);
    ctx.audit(AuditAction::Get, Some(username), result.is_ok());
    println!("{}", result?);
    Ok(())
}

pub(crate) fn delete_entry(
    ctx: &CliContext,
    store: &mut CredentialStore,
    username: &str,
) -> Result<()> {
    let result = store.delete_credential(username);
    ctx.audit(AuditAction::Delete, Some(username), result.is_ok());
    result?;
    eprintln!("Deleted {}", username);
    Ok(())
}

pub(crate) fn print_table(entries: &[CredentialEntry], show_secrets: bool) {
    if entries.is_empty() {
        println!("No credentials stored");
        return;
    }
    println!("{}", render_table(entries, show_secrets));
}

fn render_table(entries: &[CredentialEntry], show_secrets: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Username").add_attribute(Attribute::Bold),
        Cell::new("Secret").add_attribute(Attribute::Bold),
    ]);
    for entry in entries {
        let secret = if show_secrets { entry.secret.as_str() } else { MASK };
        table.add_row(vec![entry.username.as_str(), secret]);
    }
    table
}

fn print_json(entries: &[CredentialEntry], show_secrets: bool) -> Result<()> {
    let items: Vec<ListItem<'_>> = entries
        .iter()
        .map(|e| ListItem {
            username: &e.username,
            secret: show_secrets.then_some(e.secret.as_str()),
        })
        .collect();
    let json = serde_json::to_string_pretty(&items).context("serialize list")?;
    println!("{}", json);
    Ok(())
}

pub(crate) fn prompt_secret(username: &str) -> Result<Zeroizing<String>> {
    let secret = Password::new()
        .with_prompt(format!("Password for {}", username))
        .allow_empty_password(false)
        .interact()
        .context("read secret from prompt")?;
    Ok(Zeroizing::new(secret))
}

fn read_secret_stdin() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("read secret from stdin")?;
    Ok(Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string()))
}

fn check_secret_size(secret: &str) -> Result<()> {
    if secret.len() > constants::MAX_SECRET_SIZE {
        bail!(
            "secret exceeds maximum size ({} bytes, max {} bytes)",
            secret.len(),
            constants::MAX_SECRET_SIZE
        );
    }
    Ok(())
}

fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
