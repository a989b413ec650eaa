//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ──► DbError (categorized by SQLite message)               │
//! │                     │                                                   │
//! │  CoreError ─────────┤                                                   │
//! │                     ▼                                                   │
//! │               MarketError ──► kind() ──► dto::ApiError ──► HTTP layer   │
//! │                                                                         │
//! │  UNIQUE violation / "database is locked"  →  Conflict                  │
//! │  anything else from storage               →  Internal (logged)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use skinbay_core::dto::ApiError;
use skinbay_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

// =============================================================================
// Database Error
// =============================================================================

/// Storage-level failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A second live hold on the same sale listing
    /// - A second live listing or claim on the same inventory item
    /// - A second ACTIVE contract on the same rental listing
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. a balance would go negative).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// SQLite could not take the write lock within the busy timeout.
    ///
    /// The driver message is kept for `Debug` and logs only.
    #[error("Database is busy, retry the operation")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for errors that mean "another writer got there first".
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. } | DbError::Busy(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database table is locked") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Market Error
// =============================================================================

/// Error returned by every marketplace operation.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl MarketError {
    /// Category for the caller.
    ///
    /// Storage conflicts count as `Conflict` so that a lost race reads as
    /// "already reserved" rather than a server fault.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Core(err) => err.kind(),
            MarketError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            MarketError::Db(err) if err.is_conflict() => ErrorKind::Conflict,
            MarketError::Db(_) => ErrorKind::Internal,
        }
    }

    /// Replaces a storage conflict with a domain-level message.
    pub(crate) fn or_conflict(self, message: &str) -> Self {
        match self {
            MarketError::Db(err) if err.is_conflict() => {
                MarketError::Core(CoreError::conflict(message))
            }
            other => other,
        }
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(err: sqlx::Error) -> Self {
        MarketError::Db(err.into())
    }
}

impl From<ValidationError> for MarketError {
    fn from(err: ValidationError) -> Self {
        MarketError::Core(err.into())
    }
}

/// Result type for marketplace operations.
pub type MarketResult<T> = Result<T, MarketError>;

/// Converts engine errors to the HTTP error body.
///
/// Internal details are logged, never returned.
impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Core(core) => core.into(),
            MarketError::Db(DbError::NotFound { entity, id }) => {
                ApiError::new(ErrorKind::NotFound, format!("{} not found: {}", entity, id))
            }
            MarketError::Db(db) if db.is_conflict() => {
                tracing::warn!(error = ?db, "Write lost a race");
                ApiError::new(ErrorKind::Conflict, "Resource was modified concurrently")
            }
            MarketError::Db(db) => {
                tracing::error!(error = %db, "Database operation failed");
                ApiError::new(ErrorKind::Internal, "Database operation failed")
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: MarketError = DbError::UniqueViolation {
            field: "cart_items.sale_listing_id".into(),
            value: "unknown".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: MarketError = DbError::Busy("database is locked".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: MarketError = DbError::QueryFailed("syntax".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: MarketError = CoreError::InsufficientFunds {
            required: 10,
            available: 5,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_or_conflict_rewrites_only_conflicts() {
        let err: MarketError = DbError::duplicate_for_test().into();
        let err = err.or_conflict("Sale listing is already reserved");
        assert_eq!(err.to_string(), "Sale listing is already reserved");

        let err: MarketError = CoreError::bad_request("nope").into();
        assert_eq!(err.or_conflict("ignored").to_string(), "nope");
    }

    #[test]
    fn test_api_error_hides_internal_details() {
        let api: ApiError = MarketError::from(DbError::QueryFailed("secret sql".into())).into();
        assert_eq!(api.code, ErrorKind::Internal);
        assert!(!api.message.contains("secret"));
    }

    #[test]
    fn test_busy_conflict_hides_driver_text() {
        let err: MarketError = DbError::Busy("database is locked".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.to_string().contains("locked"));

        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorKind::Conflict);
        assert_eq!(api.message, "Resource was modified concurrently");
    }

    impl DbError {
        fn duplicate_for_test() -> Self {
            DbError::UniqueViolation {
                field: "item_claims.inventory_item_id".into(),
                value: "unknown".into(),
            }
        }
    }
}
