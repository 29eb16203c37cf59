use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rexmit::agent;
use rexmit::config::Config;

/// eBPF-based TCP retransmission telemetry agent.
#[derive(Parser)]
#[command(name = "rexmit", about, version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr. Stdout is reserved for the per-event
    // journal so the two streams can be split by the operator.
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config: Arc<Config> = Config::load(cli.config.as_deref())?.into();

    agent::run(config)
}
