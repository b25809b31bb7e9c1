//! Background expiry sweeper
//!
//! Periodically flips timed-out active negotiations to `expired`. Runs as a
//! detached tokio task owning its own database handle; a failed sweep is
//! logged and retried on the next tick.

use std::time::Duration;

use crate::db::{Database, SqliteCatalog};
use crate::error::Result;
use crate::services::NegotiationService;

/// Default time between expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic expiry sweep over a dedicated database handle
pub struct Sweeper {
    db: Database,
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper with the default interval
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override the sweep interval
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep, returning how many negotiations expired
    pub fn sweep_once(&self) -> Result<usize> {
        let catalog = SqliteCatalog::new(self.db.connection());
        let service = NegotiationService::new(self.db.connection(), &catalog);
        let expired = service.sweep_expired(chrono::Utc::now().timestamp_millis())?;
        Ok(expired.len())
    }

    /// Sweep forever on the configured interval
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.sweep_once() {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "sweep expired negotiations"),
                Err(error) => tracing::error!(%error, "expiry sweep failed"),
            }
        }
    }
}
