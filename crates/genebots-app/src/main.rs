use anyhow::Result;
use clap::Parser;
use genebots_app::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    execute(Cli::parse())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
