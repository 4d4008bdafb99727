//! Price Agent Binary
//!
//! Queries prices once or serves them over HTTP.
//!
//! # Usage
//!
//! ```bash
//! price-agent pairs ETH/USD
//! price-agent prices
//! price-agent agent --listen 0.0.0.0:9200
//! ```
//!
//! # Environment Variables
//!
//! - `PRICE_AGENT_LISTEN_ADDR`: HTTP agent bind address (default: 127.0.0.1:9200)
//! - `PRICE_AGENT_PRICES_FILE`: Price table (default: prices.json)
//! - `PRICE_AGENT_CACHE_PAIRS`: Comma-separated pairs kept warm by the polling cache
//! - `PRICE_AGENT_CACHE_INTERVAL_SECS`: Polling interval (default: 60)
//! - `PRICE_AGENT_MAX_PRICE_AGE_SECS`: Reject older prices (default: 0, disabled)
//! - `PRICE_AGENT_METRICS_PORT`: Prometheus metrics port (default: 0, disabled)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log filter (default: price_agent=info)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use price_agent::infrastructure::cli::{self, Output, Query};
use price_agent::infrastructure::telemetry;
use price_agent::{AgentConfig, ClientServices, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "price-agent")]
#[command(about = "Query oracle prices or serve them over HTTP", version)]
struct Cli {
    /// Price table to serve (overrides PRICE_AGENT_PRICES_FILE)
    #[arg(long, global = true)]
    prices_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported asset pairs and how they are priced
    #[command(alias = "pair")]
    Pairs {
        /// Pairs to describe (all when omitted)
        pairs: Vec<String>,
    },

    /// Print current prices
    #[command(alias = "price")]
    Prices {
        /// Pairs to price (all when omitted)
        pairs: Vec<String>,
    },

    /// Serve price queries over HTTP until interrupted
    Agent {
        /// Bind address (overrides PRICE_AGENT_LISTEN_ADDR)
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    load_dotenv();
    let _telemetry_guard = telemetry::init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Price agent failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AgentConfig::from_env().context("invalid configuration")?;
    if let Some(path) = cli.prices_file {
        config.provider.prices_file = path;
    }
    log_config(&config);

    if config.server.metrics_port != 0 {
        init_metrics(config.server.metrics_port).context("failed to start metrics exporter")?;
    }

    let services = ClientServices::from_config(&config).context("failed to build services")?;
    let output = Output::std();

    let result = match cli.command {
        Command::Pairs { pairs } => cli::run_query(&services, Query::Pairs(pairs), &output).await,
        Command::Prices { pairs } => cli::run_query(&services, Query::Prices(pairs), &output).await,
        Command::Agent { listen } => {
            let address = listen.unwrap_or(config.server.listen_addr);
            let shutdown = CancellationToken::new();
            tokio::spawn(await_shutdown(shutdown.clone()));
            cli::run_agent(&services, address, shutdown, &output).await
        }
    };

    // Errors were already written to stderr.
    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Log the parsed configuration.
fn log_config(config: &AgentConfig) {
    tracing::debug!(
        listen_addr = %config.server.listen_addr,
        metrics_port = config.server.metrics_port,
        prices_file = %config.provider.prices_file.display(),
        max_price_age_secs = config.provider.max_price_age.as_secs(),
        cache_pairs = config.cache.pairs.len(),
        cache_interval_secs = config.cache.interval.as_secs(),
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn await_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown.cancel();
}
