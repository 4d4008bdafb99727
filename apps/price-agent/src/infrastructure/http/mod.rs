//! HTTP Query Agent
//!
//! Serves price queries over HTTP. Each agent owns its router; nothing is
//! registered globally.
//!
//! # Endpoints
//!
//! - `/`, `/prices` - Multi-pair query: `{"Pairs":[{"Base":..,"Quote":..}]}`
//! - `/price` - Single-pair query: `{"Pair":{"Base":..,"Quote":..}}`
//!
//! Any method is accepted and unmatched paths behave like `/prices`.
//!
//! # Shutdown
//!
//! Cancellation stops accepting connections and answers requests still in
//! flight with `503`. Connections that have not closed after
//! [`SHUTDOWN_GRACE`] are dropped.

mod handlers;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::any;
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use handlers::{AgentState, close_on_cancel, handle_price, handle_prices};

use crate::application::lifecycle::{Lifecycle, Service, ServiceError};
use crate::application::ports::{Marshaller, PriceHook, PriceProvider};

/// How long in-flight connections get to close after cancellation.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the [`HttpAgent`].
pub struct HttpAgentConfig {
    /// Resolves requested pairs.
    pub provider: Arc<dyn PriceProvider>,
    /// Checks prices before they are served.
    pub hook: Arc<dyn PriceHook>,
    /// Encodes multi-pair responses.
    pub marshaller: Arc<dyn Marshaller>,
    /// Bind address, e.g. `127.0.0.1:9200`.
    pub address: String,
}

// =============================================================================
// HTTP Agent
// =============================================================================

/// HTTP price query server.
pub struct HttpAgent {
    address: String,
    router: Router,
    lifecycle: Arc<Lifecycle>,
    local_addr: OnceLock<SocketAddr>,
}

impl HttpAgent {
    /// Create an agent. Nothing is bound until [`Service::start`].
    #[must_use]
    pub fn new(config: HttpAgentConfig) -> Self {
        let router = build_router(AgentState {
            provider: config.provider,
            hook: config.hook,
            marshaller: config.marshaller,
        });
        Self {
            address: config.address,
            router,
            lifecycle: Arc::new(Lifecycle::new("http_agent")),
            local_addr: OnceLock::new(),
        }
    }

    /// The agent's router, for serving it in-process.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Address actually bound, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    fn bind(&self) -> Result<TcpListener, ServiceError> {
        let bind_error = |e: std::io::Error| ServiceError::Bind {
            addr: self.address.clone(),
            message: e.to_string(),
        };

        let listener = std::net::TcpListener::bind(&self.address).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let listener = TcpListener::from_std(listener).map_err(bind_error)?;
        if let Ok(addr) = listener.local_addr() {
            let _ = self.local_addr.set(addr);
        }
        Ok(listener)
    }
}

impl Service for HttpAgent {
    fn start(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        self.lifecycle.begin()?;

        tracing::info!(addr = %self.address, "Initializing HTTP server");
        let listener = match self.bind() {
            Ok(listener) => listener,
            Err(e) => {
                self.lifecycle.finish(Err(e.clone()));
                return Err(e);
            }
        };

        let router = self
            .router
            .clone()
            .layer(middleware::from_fn_with_state(cancel.clone(), close_on_cancel));
        let shutdown = cancel.clone().cancelled_owned();
        let mut server = tokio::spawn(async move {
            tracing::debug!("Starting HTTP server");
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "HTTP server crashed");
            }
        });

        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            cancel.cancelled().await;
            let result = match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
                Ok(joined) => joined.map_err(|e| ServiceError::Shutdown(e.to_string())),
                Err(_) => {
                    tracing::warn!("HTTP connections still open after shutdown grace, closing");
                    server.abort();
                    Ok(())
                }
            };
            lifecycle.finish(result);
        });

        Ok(())
    }

    fn wait(&self) -> BoxFuture<'static, Result<(), ServiceError>> {
        self.lifecycle.wait()
    }
}

fn build_router(state: AgentState) -> Router {
    Router::new()
        .route("/", any(handle_prices))
        .route("/prices", any(handle_prices))
        .route("/price", any(handle_price))
        .fallback(handle_prices)
        .with_state(state)
}
