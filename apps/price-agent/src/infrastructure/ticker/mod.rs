//! Ticker
//!
//! Produces tick events on a schedule and fans them out to subscribers.
//! A manual ticker never fires on its own; ticks are emitted with
//! [`Ticker::tick`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Buffered ticks per subscriber before it starts lagging.
const TICK_CAPACITY: usize = 16;

/// Scheduled or manual source of tick events.
#[derive(Debug)]
pub struct Ticker {
    period: Option<Duration>,
    sender: broadcast::Sender<DateTime<Utc>>,
    started: AtomicBool,
}

impl Ticker {
    /// Ticker firing every `period`, starting immediately once started.
    /// A zero period yields a manual ticker.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self::with_period(Some(period).filter(|p| !p.is_zero()))
    }

    /// Ticker that only fires on [`Ticker::tick`].
    #[must_use]
    pub fn manual() -> Self {
        Self::with_period(None)
    }

    fn with_period(period: Option<Duration>) -> Self {
        let (sender, _) = broadcast::channel(TICK_CAPACITY);
        Self {
            period,
            sender,
            started: AtomicBool::new(false),
        }
    }

    /// Schedule period, `None` for a manual ticker.
    #[must_use]
    pub const fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Receive future ticks.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DateTime<Utc>> {
        self.sender.subscribe()
    }

    /// Emit a tick now. Returns the number of subscribers reached.
    pub fn tick(&self) -> usize {
        self.sender.send(Utc::now()).unwrap_or(0)
    }

    /// Begin the schedule. Subsequent calls are no-ops.
    ///
    /// The schedule runs until `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) {
        let Some(period) = self.period else {
            return;
        };
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let sender = self.sender.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("Ticker cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let _ = sender.send(Utc::now());
                    }
                }
            }
        });
    }
}
