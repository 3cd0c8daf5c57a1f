//! Keyward CLI - client bootstrap for Knox-style key distribution services

mod client;
mod commands;
mod config;
mod tls;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keyward_auth::{Environment, ProcessEnv};
use tracing_subscriber::EnvFilter;

use crate::config::ClientSettings;

/// Keyward - authenticate to a key distribution service
#[derive(Parser)]
#[command(name = "keyward", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key service address (host:port)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server name for SNI and certificate validation
    #[arg(long, global = true)]
    server_name: Option<String>,

    /// Client certificate chain (PEM)
    #[arg(long, global = true)]
    cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, global = true)]
    key: Option<PathBuf>,

    /// CA bundle used instead of the system roots (PEM)
    #[arg(long, global = true)]
    ca: Option<PathBuf>,

    /// Do not verify the server certificate (development only)
    #[arg(long, global = true)]
    insecure_skip_verify: bool,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which identity will be presented to the key service
    Whoami {
        /// Print the credential instead of a redacted preview
        #[arg(long)]
        show_token: bool,
    },

    /// Show the assembled client configuration
    Status,

    /// Complete a TLS handshake with the key service
    Ping {
        /// Give up after this many seconds
        #[arg(long, default_value = "5")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let env: Arc<dyn Environment> = Arc::new(ProcessEnv);

    let mut settings = ClientSettings::load(cli.config.as_deref(), env.as_ref())?;
    apply_flags(&mut settings, &cli);

    let client = client::assemble(&settings, env)?;

    match cli.command {
        Commands::Whoami { show_token } => commands::whoami(&client, cli.json, show_token),
        Commands::Status => commands::status(&client, cli.json),
        Commands::Ping { timeout_secs } => {
            let report = commands::ping(&client, Duration::from_secs(timeout_secs)).await?;
            commands::ping::print_report(&report, cli.json)
        }
    }
}

/// Command-line flags take precedence over file and environment settings.
fn apply_flags(settings: &mut ClientSettings, cli: &Cli) {
    if let Some(host) = &cli.host {
        settings.host = host.clone();
    }
    if let Some(name) = &cli.server_name {
        settings.server_name = name.clone();
    }
    if let Some(cert) = &cli.cert {
        settings.cert_path = Some(cert.clone());
    }
    if let Some(key) = &cli.key {
        settings.key_path = Some(key.clone());
    }
    if let Some(ca) = &cli.ca {
        settings.ca_path = Some(ca.clone());
    }
    if cli.insecure_skip_verify {
        settings.insecure_skip_verify = true;
    }
}
