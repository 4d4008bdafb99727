//! Service Lifecycle
//!
//! Start-once / wait-once protocol shared by every long-running component.
//!
//! # Protocol
//!
//! - `start(cancel)` spawns the component's background work and returns
//!   immediately. It succeeds at most once per instance.
//! - `wait()` resolves with a single terminal value once all background work
//!   has drained. It may be called before `start` and by any number of
//!   waiters; all of them observe the same value.
//!
//! Components watch the `CancellationToken` passed to `start` and publish
//! their completion after bounded cleanup.

use std::sync::atomic::{AtomicU8, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Service Contract
// =============================================================================

/// A long-running component with a start-once / wait-once lifecycle.
pub trait Service: Send + Sync {
    /// Spawn background work bound to `cancel`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::AlreadyStarted` on a second call, or a
    /// component-specific startup error.
    fn start(&self, cancel: CancellationToken) -> Result<(), ServiceError>;

    /// Resolve once background work has finished.
    fn wait(&self) -> BoxFuture<'static, Result<(), ServiceError>>;
}

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// `start` was called on a component that was already started.
    #[error("service can be started only once")]
    AlreadyStarted,

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {message}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Error details.
        message: String,
    },

    /// Background work failed while shutting down.
    #[error("shutdown failed: {0}")]
    Shutdown(String),

    /// The component was dropped before it reported completion.
    #[error("service dropped before completion")]
    Abandoned,
}

// =============================================================================
// Lifecycle State
// =============================================================================

/// Lifecycle position of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Constructed, `start` not called yet.
    NotStarted = 0,
    /// Background work is running.
    Running = 1,
    /// Completion has been published.
    Stopped = 2,
}

impl LifecycleState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }

    /// Lowercase name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

type Completion = Option<Result<(), ServiceError>>;

/// State guard and completion slot embedded in each component.
///
/// Shared with the component's background tasks through an `Arc`.
#[derive(Debug)]
pub struct Lifecycle {
    name: &'static str,
    state: AtomicU8,
    done: watch::Sender<Completion>,
}

impl Lifecycle {
    /// Create a lifecycle in the `NotStarted` state.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            name,
            state: AtomicU8::new(LifecycleState::NotStarted as u8),
            done,
        }
    }

    /// Component name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Transition `NotStarted -> Running`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::AlreadyStarted` from any other state.
    pub fn begin(&self) -> Result<(), ServiceError> {
        self.state
            .compare_exchange(
                LifecycleState::NotStarted as u8,
                LifecycleState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| tracing::debug!(service = self.name, "Starting"))
            .map_err(|_| ServiceError::AlreadyStarted)
    }

    /// Move to `Stopped` and publish the terminal value.
    ///
    /// Only the first call publishes; later calls are ignored.
    pub fn finish(&self, result: Result<(), ServiceError>) {
        self.state
            .store(LifecycleState::Stopped as u8, Ordering::Release);
        let published = self.done.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
            true
        });
        if published {
            tracing::debug!(service = self.name, "Stopped");
        }
    }

    /// Future resolving with the terminal value.
    pub fn wait(&self) -> BoxFuture<'static, Result<(), ServiceError>> {
        let mut rx = self.done.subscribe();
        async move {
            let completion = rx
                .wait_for(Option::is_some)
                .await
                .map(|slot| (*slot).clone());
            match completion {
                Ok(Some(result)) => result,
                Ok(None) | Err(_) => Err(ServiceError::Abandoned),
            }
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
