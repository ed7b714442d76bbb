use anyhow::Result;
use clap::Parser;
use engagement_tracker_cli::{run_cli, Cli};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // stdout carries command output only.
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    run_cli(cli)
}
