#![cfg(not(tarpaulin_include))]

use clap::Parser;
use fureai::app;
use fureai::config::{Backend, Config};
use std::path::PathBuf;

/// Inventory entry form backed by a spreadsheet
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "FUREAI_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the configured one
    #[arg(short, long)]
    bind: Option<String>,

    /// Storage backend (sheets or memory)
    #[arg(long)]
    backend: Option<Backend>,
}

/// Main entry point for the web application
///
/// Loads configuration (file, then environment, then flags) and serves the
/// form until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    config.validate()?;

    app::run(config).await
}
