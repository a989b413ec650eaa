//! # Expiry Sweeper
//!
//! Reclaims cart holds and rental contracts whose deadline has passed.
//!
//! ## Sweep Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Expiry Sweeper Flow                             │
//! │                                                                         │
//! │  interval tick (sweeper.interval_ms)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  run_once()                                                     │   │
//! │  │                                                                 │   │
//! │  │  1. release_expired_holds(now, batch_limit)                     │   │
//! │  │       cart_items  ACTIVE/RESERVED ──► EXPIRED                   │   │
//! │  │       sale_listings RESERVED      ──► ACTIVE                    │   │
//! │  │                                                                 │   │
//! │  │  2. cleanup_expired_contracts(now, batch_limit)                 │   │
//! │  │       rental_contracts ACTIVE     ──► EXPIRED                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Every update is conditioned on the row still being live, so a pass    │
//! │  racing a checkout or a second sweeper changes nothing twice.          │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Interval: 30 seconds (configurable)                                 │
//! │  • Batch limit: 500 rows per table per pass (configurable)             │
//! │  • Missed ticks are delayed, never bunched                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use skinbay_core::dto::CleanupResponse;
use skinbay_db::Database;

use crate::config::SweeperSettings;
use crate::error::{JobError, JobResult};

// =============================================================================
// Expiry Sweeper
// =============================================================================

pub struct ExpirySweeper {
    db: Database,
    settings: SweeperSettings,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running sweeper.
#[derive(Clone)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Asks the sweeper loop to exit after its current pass.
    pub async fn shutdown(&self) -> JobResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| JobError::ChannelError("Sweeper shutdown channel closed".into()))
    }
}

impl ExpirySweeper {
    /// Creates a sweeper and returns its handle.
    pub fn new(db: Database, settings: SweeperSettings) -> (Self, SweeperHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweeper = ExpirySweeper {
            db,
            settings,
            shutdown_rx,
        };

        (sweeper, SweeperHandle { shutdown_tx })
    }

    /// Runs the sweep loop until the handle asks it to stop.
    ///
    /// This should be spawned as a background task. A failing pass is
    /// logged and the next tick tries again.
    pub async fn run(mut self) {
        info!(
            interval_ms = self.settings.interval_ms,
            batch_limit = self.settings.batch_limit,
            "Expiry sweeper starting"
        );

        let mut interval = tokio::time::interval(self.settings.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(?e, "Expiry sweep failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Expiry sweeper shutting down");
                    break;
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// One bounded pass over holds, then contracts.
    pub async fn run_once(&self) -> JobResult<CleanupResponse> {
        let now = Utc::now();
        let limit = self.settings.batch_limit;

        let released_holds = self.db.carts().release_expired_holds_at(now, limit).await?;
        let expired_contracts = self.db.rentals().cleanup_expired_contracts_at(now, limit).await?;

        let response = CleanupResponse {
            released_holds,
            expired_contracts,
        };

        if response.total() > 0 {
            info!(released_holds, expired_contracts, "Expiry sweep reclaimed rows");
        } else {
            debug!("Expiry sweep found nothing to reclaim");
        }

        Ok(response)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
