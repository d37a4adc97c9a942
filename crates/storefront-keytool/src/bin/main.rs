//! storefront-keytool - operator CLI for the storefront security primitives
//!
//! Configuration comes from the `STOREFRONT_*` environment variables, or from
//! a JSON file given with `--config`. Command output goes to stdout, logs to
//! stderr.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use storefront_keytool::{run, Command};
use storefront_security::SecurityConfig;

/// Storefront keytool - field encryption, fingerprints, and session policy
#[derive(Parser, Debug)]
#[command(name = "storefront-keytool")]
#[command(version)]
#[command(about = "Storefront keytool - field encryption, fingerprints, and session policy")]
struct Args {
    /// JSON configuration file (replaces the STOREFRONT_* environment variables)
    #[arg(long, global = true, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match &args.config {
        Some(path) => SecurityConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SecurityConfig::from_env(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&args.command, &config, &mut out)
}
