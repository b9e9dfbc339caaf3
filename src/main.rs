use anyhow::Result;
use clap::Parser;
use lockbox::constants;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env(constants::LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = lockbox::cli::Cli::parse();
    cli.run()
}
