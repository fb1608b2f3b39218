//! WireGuard Dynamic Remote Command Line Tool
//!
//! This binary runs one reconciliation pass over the configured interfaces.
//! It is meant to be started periodically by an external timer.

use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use log::{error, info};

use wireguard_dynamic_remote::common::{init_logger, Error, ErrorBehavior, Result};
use wireguard_dynamic_remote::config::{self, load_config, Overrides, RunConfig, LOG_LEVEL_STR};
use wireguard_dynamic_remote::{Runner, APP_NAME, VERSION};

/// Keep hostname endpoints of WireGuard peers pointed at a live address
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Interface to check (repeatable); all configured interfaces if omitted
    #[clap(short, long = "interface")]
    interfaces: Vec<String>,

    /// DNS server to query instead of the system resolver
    #[clap(long)]
    resolver: Option<String>,

    /// Directory holding the WireGuard configuration files
    #[clap(long)]
    config_dir: Option<PathBuf>,

    /// Load settings from a JSON file
    #[clap(long, env = "WG_DYNAMIC_REMOTE_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,

    /// Liveness probe timeout in seconds
    #[clap(long)]
    probe_timeout: Option<u64>,

    /// DNS query timeout in seconds
    #[clap(long)]
    resolve_timeout: Option<u64>,

    /// What to do when a resolver or endpoint update command fails
    /// (fatal, print, ignore)
    #[clap(long)]
    command_errors: Option<ErrorBehavior>,

    /// What to do when starting or restarting a service fails
    /// (fatal, print, ignore)
    #[clap(long)]
    service_errors: Option<ErrorBehavior>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Check every interface once and correct drifted endpoints
    Check,
    /// Print the configuration file and running configuration of each interface
    Show,
    /// Print the effective settings as JSON
    Settings,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            interfaces: self.interfaces.clone(),
            resolver: self.resolver.clone(),
            config_dir: self.config_dir.clone(),
            log_level: self.log_level.clone(),
            probe_timeout: self.probe_timeout,
            resolve_timeout: self.resolve_timeout,
            command_errors: self.command_errors,
            service_errors: self.service_errors,
        }
    }
}

async fn show(runner: &Runner) -> Result<bool> {
    let mut ok = true;
    for name in runner.interfaces()? {
        match runner.show(&name).await {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Cannot show interface {}: {}", name, e);
                ok = false;
            }
        }
    }
    Ok(ok)
}

async fn run(command: Command, settings: RunConfig) -> Result<bool> {
    match command {
        Command::Check => {
            config::log_config(&settings);
            Ok(Runner::with_system_tools(settings).run().await)
        }
        Command::Show => show(&Runner::with_system_tools(settings)).await,
        Command::Settings => {
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| Error::Other(format!("Failed to serialize settings: {}", e)))?;
            println!("{}", json);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let settings = match load_config(args.config_file.as_deref(), &args.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            init_logger(args.log_level.as_deref().unwrap_or(LOG_LEVEL_STR));
            error!("{}", e);
            exit(1);
        }
    };

    init_logger(&settings.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);

    match run(args.command, settings).await {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    }
}
