//! Negotiate Echo HTTP Service
//!
//! Answers every HTTP request with a plain-text echo of its method, path and
//! headers, but only once the client has authenticated with
//! `Authorization: Negotiate <token>`. Anything else gets a 401 challenge.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http front end ──▶ request queue ──┐            │
//!                           │   (axum, tower)      (bounded)      │            │
//!                           │                                     ▼            │
//!                           │                              dispatch loop       │
//!                           │                          (pause/stop control)    │
//!                           │                                     │            │
//!                           │                                     ▼            │
//!                           │                           Negotiate authenticator│
//!                           │                           ──▶ security package   │
//!     Client Response       │                                     │            │
//!     ◀─────────────────────┼── 401 challenge / 200 echo ◀────────┘            │
//!                           └──────────────────────────────────────────────────┘
//! ```
//!
//! # Prerequisites
//!
//! The host needs an acceptor identity for the `Negotiate` package. With the
//! built-in static package that means at least one `[[negotiate.principals]]`
//! entry in the config file; startup fails otherwise.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use negotiate_echo::config::{self, ConfigError, ObservabilityConfig, ServiceConfig};
use negotiate_echo::lifecycle::{install, signals, ServiceHost, StartupError};
use negotiate_echo::observability::{logging, logging::LogFormat};

#[derive(Parser)]
#[command(name = "negotiate-echo", version)]
#[command(about = "HTTP echo service behind Negotiate (SPNEGO) authentication")]
#[command(after_help = "Prerequisites: an acceptor identity for the Negotiate package \
(configure [[negotiate.principals]] for the static package). \
Without a command the service runs under the service manager: \
SIGTERM/SIGINT stop, SIGUSR1 pauses, SIGUSR2 resumes.")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run attached to the terminal with human-readable logs
    Console,
    /// Write a systemd unit for the service
    Install,
    /// Remove the systemd unit
    Uninstall,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        None => run(cli.config.as_deref(), LogFormat::Json).await,
        Some(Command::Console) => run(cli.config.as_deref(), LogFormat::Pretty).await,
        Some(Command::Install) => {
            let config = load(cli.config.as_deref())?;
            logging::init(LogFormat::Pretty, &config.observability.log_level)?;
            let executable = std::env::current_exe()?;
            let config_path = cli.config.as_deref().map(std::path::absolute).transpose()?;
            let path = install::install(&config.service, &executable, config_path.as_deref())?;
            println!("Installed {}", path.display());
            Ok(())
        }
        Some(Command::Uninstall) => {
            let config = load(cli.config.as_deref())?;
            logging::init(LogFormat::Pretty, &config.observability.log_level)?;
            let path = install::uninstall(&config.service)?;
            println!("Removed {}", path.display());
            Ok(())
        }
    }
}

fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => Ok(ServiceConfig::default()),
    }
}

async fn run(config_path: Option<&Path>, format: LogFormat) -> Result<(), Box<dyn Error>> {
    let loaded = load(config_path);
    let log_level = match &loaded {
        Ok(config) => config.observability.log_level.clone(),
        Err(_) => ObservabilityConfig::default().log_level,
    };
    logging::init(format, &log_level)?;

    let started = match loaded {
        Ok(config) => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                bind_address = %config.listener.bind_address,
                package = %config.negotiate.package,
                queue_depth = config.listener.queue_depth,
                "negotiate-echo starting"
            );
            ServiceHost::launch(&config).await
        }
        Err(e) => Err(StartupError::from(e)),
    };
    let host = match started {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    if let Err(e) = signals::handle_signals(host.handle()).await {
        tracing::error!(error = %e, "Signal handling failed");
    }
    host.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
