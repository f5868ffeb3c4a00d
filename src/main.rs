//! nats-tls CLI.
//!
//! Reads the configuration file and writes the CA and every leaf key and
//! certificate it describes.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nats_tls::config::ResolvedConfig;
use nats_tls::pipeline;
use tracing::{Level, error};

#[derive(Parser)]
#[command(name = "nats-tls")]
#[command(about = "Generate a CA and signed TLS certificates for a NATS cluster", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "nats-tls.yaml")]
    config: PathBuf,

    /// Run in debug mode
    #[arg(short, long)]
    debug: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    if !cli.config.exists() {
        error!("Config file {} doesn't exist", cli.config.display());
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ResolvedConfig::load(&cli.config, cli.debug)?;
    pipeline::run(&config)?;
    Ok(())
}
