//! # skinbay-jobs: Background Jobs for the Skin Marketplace
//!
//! Configuration loading and the expiry sweeper. Nothing here owns
//! business state: every pass is a call into `skinbay-db`, and the
//! database decides what actually changes.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Background Job Layout                            │
//! │                                                                         │
//! │   market.toml + SKINBAY_* env                                          │
//! │              │                                                          │
//! │              ▼                                                          │
//! │   ┌────────────────────┐   to_db_config()   ┌──────────────────────┐   │
//! │   │    MarketConfig    │ ─────────────────► │ skinbay_db::Database │   │
//! │   └─────────┬──────────┘                    └──────────┬───────────┘   │
//! │             │ sweeper settings                         │               │
//! │             ▼                                          │               │
//! │   ┌────────────────────┐      run_once() per tick      │               │
//! │   │   ExpirySweeper    │ ──────────────────────────────┘               │
//! │   │  (tokio task)      │                                               │
//! │   └─────────▲──────────┘                                               │
//! │             │ shutdown()                                               │
//! │   ┌─────────┴──────────┐                                               │
//! │   │   SweeperHandle    │                                               │
//! │   └────────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - Layered marketplace configuration
//! - [`error`] - Job error types
//! - [`sweeper`] - Expiry sweeper loop and handle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skinbay_jobs::{ExpirySweeper, MarketConfig};
//! use skinbay_db::Database;
//!
//! let config = MarketConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let (sweeper, handle) = ExpirySweeper::new(db, config.sweeper.clone());
//! tokio::spawn(sweeper.run());
//!
//! // later
//! handle.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod sweeper;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, MarketConfig, ReservationSettings, SweeperSettings};
pub use error::{JobError, JobResult};
pub use sweeper::{ExpirySweeper, SweeperHandle};
