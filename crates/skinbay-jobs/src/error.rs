//! # Job Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Job Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌─────────────────┐ │
//! │  │   Configuration     │  │      Storage        │  │    Runtime      │ │
//! │  │                     │  │                     │  │                 │ │
//! │  │  InvalidConfig      │  │  DatabaseError      │  │  ChannelError   │ │
//! │  │  ConfigLoadFailed   │  │                     │  │                 │ │
//! │  └─────────────────────┘  └─────────────────────┘  └─────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for job operations.
pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<skinbay_db::DbError> for JobError {
    fn from(err: skinbay_db::DbError) -> Self {
        JobError::DatabaseError(err.to_string())
    }
}

impl From<skinbay_db::MarketError> for JobError {
    fn from(err: skinbay_db::MarketError) -> Self {
        JobError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for JobError {
    fn from(err: toml::de::Error) -> Self {
        JobError::ConfigLoadFailed(err.to_string())
    }
}
