//! Command Runners
//!
//! One-shot queries (`pairs`, `prices`) and the long-running `agent`.
//!
//! # Teardown
//!
//! A one-shot command starts the client services, runs its query, cancels
//! the services and waits for them. A service error is reported only when
//! the query itself succeeded. Any error is then written to stderr through
//! the marshaller before the final flush.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::lifecycle::{Service, ServiceError};
use crate::application::ports::{HookError, ProviderError, Record, SharedWriter};
use crate::domain::pair::{Pair, PairError, parse_pairs};
use crate::infrastructure::config::ClientServices;
use crate::infrastructure::http::{HttpAgent, HttpAgentConfig};

/// Command failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A pair argument is malformed.
    #[error(transparent)]
    Pair(#[from] PairError),

    /// The provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The hook rejected the prices.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A service failed to start or stop.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Destination streams for command output.
#[derive(Clone)]
pub struct Output {
    /// Records.
    pub stdout: SharedWriter,
    /// Errors.
    pub stderr: SharedWriter,
}

impl Output {
    /// The process's standard streams.
    #[must_use]
    pub fn std() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(io::stdout())),
            stderr: Arc::new(Mutex::new(io::stderr())),
        }
    }
}

/// A one-shot query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Print the models of the given pairs, or of every pair.
    Pairs(Vec<String>),
    /// Print the prices of the given pairs, or of every pair.
    Prices(Vec<String>),
}

// =============================================================================
// One-shot Commands
// =============================================================================

/// Run a one-shot query against freshly started services.
///
/// # Errors
///
/// Returns the first error encountered. It has already been written to
/// `output.stderr` when this returns.
pub async fn run_query(
    services: &ClientServices,
    query: Query,
    output: &Output,
) -> Result<(), CommandError> {
    let cancel = CancellationToken::new();
    let result = match services.start(cancel.clone()) {
        Ok(()) => {
            let result = execute(services, &query, output).await;
            cancel.cancel();
            let stopped = services.wait().await.map_err(CommandError::from);
            result.and(stopped)
        }
        Err(e) => Err(e.into()),
    };

    report(services, output, &result);
    result
}

async fn execute(
    services: &ClientServices,
    query: &Query,
    output: &Output,
) -> Result<(), CommandError> {
    match query {
        Query::Pairs(args) => {
            let pairs = parse_pairs(args)?;
            let models = services.provider.models(&pairs).await?;
            let ordered: BTreeMap<_, _> = models.iter().collect();
            for model in ordered.into_values() {
                emit(services, output, Record::Model(model));
            }
        }
        Query::Prices(args) => {
            let mut pairs = parse_pairs(args)?;
            if pairs.is_empty() {
                pairs = supported_pairs(services).await?;
            }
            let prices = services.provider.prices(&pairs).await?;
            services.hook.check(&prices).await?;
            let ordered: BTreeMap<_, _> = prices.iter().collect();
            for tick in ordered.into_values() {
                emit(services, output, Record::Price(tick));
            }
        }
    }
    Ok(())
}

async fn supported_pairs(services: &ClientServices) -> Result<Vec<Pair>, ProviderError> {
    let mut pairs: Vec<Pair> = services.provider.models(&[]).await?.into_keys().collect();
    pairs.sort();
    Ok(pairs)
}

/// Write a record to stdout, or its encoding error to stderr.
fn emit(services: &ClientServices, output: &Output, record: Record<'_>) {
    if let Err(e) = services.marshaller.write(&output.stdout, record) {
        let _ = services.marshaller.write(&output.stderr, Record::Error(&e));
    }
}

fn report(services: &ClientServices, output: &Output, result: &Result<(), CommandError>) {
    if let Err(e) = result {
        let _ = services.marshaller.write(&output.stderr, Record::Error(e));
    }
    if let Err(e) = services.marshaller.flush() {
        tracing::error!(error = %e, "Failed to flush output");
    }
}

// =============================================================================
// Agent Command
// =============================================================================

/// Serve HTTP queries until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns the agent's startup or shutdown error, otherwise the services'
/// shutdown error. It has already been written to `output.stderr`.
pub async fn run_agent(
    services: &ClientServices,
    address: String,
    shutdown: CancellationToken,
    output: &Output,
) -> Result<(), CommandError> {
    let result = serve(services, address, shutdown).await;
    report(services, output, &result);
    result
}

async fn serve(
    services: &ClientServices,
    address: String,
    shutdown: CancellationToken,
) -> Result<(), CommandError> {
    services.start(shutdown.clone())?;

    let agent = HttpAgent::new(HttpAgentConfig {
        provider: Arc::clone(&services.provider),
        hook: Arc::clone(&services.hook),
        marshaller: Arc::clone(&services.marshaller),
        address,
    });
    if let Err(e) = agent.start(shutdown.clone()) {
        shutdown.cancel();
        let _ = services.wait().await;
        return Err(e.into());
    }
    if let Some(addr) = agent.local_addr() {
        tracing::info!(addr = %addr, "Price agent ready");
    }

    let stopped = services.wait().await;
    let result = agent.wait().await;
    tracing::info!("Price agent stopped");
    result.and(stopped).map_err(CommandError::from)
}
