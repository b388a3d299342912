//! sockgate
//!
//! Exposes a local container engine socket over a mutual-TLS endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                     SOCKGATE                     │
//!                   │                                                  │
//!   Client (mTLS)   │  ┌─────────┐    ┌─────────┐    ┌─────────────┐  │
//!   ────────────────┼─▶│   net   │───▶│  http   │───▶│   backend   │──┼──▶ /var/run/docker.sock
//!                   │  │listener │    │ server  │    │  connector  │  │
//!                   │  │ + tls   │    │  (log)  │    │   + pool    │  │
//!   ◀───────────────┼──└─────────┘◀───└─────────┘◀───└─────────────┘◀─┼───
//!                   │                                                  │
//!                   │  config · lifecycle · observability              │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sockgate::config::loader::read_config;
use sockgate::config::{ObservabilityConfig, ProxyConfig};
use sockgate::lifecycle::{self, signals, Shutdown};
use sockgate::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "sockgate")]
#[command(about = "Expose a local container engine socket over mutual TLS", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen URL, e.g. http://0.0.0.0:6058
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend Unix socket
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Server certificate chain (PEM)
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Server private key (PEM)
    #[arg(long)]
    key: Option<PathBuf>,

    /// CA bundle used to verify client certificates (PEM)
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load the config file (or defaults) and apply command-line overrides.
    fn into_config(self) -> Result<ProxyConfig, sockgate::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.address = listen;
        }
        if let Some(socket) = self.socket {
            config.backend.socket_path = socket;
        }
        if let Some(cert) = self.cert {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.key {
            config.tls.key_path = key;
        }
        if let Some(ca) = self.ca {
            config.tls.ca_path = Some(ca);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Cli::parse().into_config();

    let observability = match &config {
        Ok(config) => config.observability.clone(),
        Err(_) => ObservabilityConfig::default(),
    };
    if let Err(e) = logging::init_logging(&observability) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("sockgate v{} starting", env!("CARGO_PKG_VERSION"));

    let metrics_settings = config.observability.clone();
    let server = match lifecycle::prepare(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    if metrics_settings.metrics_enabled {
        // Validation already checked the address parses.
        if let Ok(addr) = metrics_settings.metrics_address.parse() {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to start metrics endpoint");
                return ExitCode::FAILURE;
            }
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    if let Err(e) = server.run(shutdown.listener()).await {
        tracing::error!(error = %e, "Listener failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
