//! # Error Types
//!
//! Domain error taxonomy for skinbay-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  skinbay-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                        │
//! │  ├── ValidationError  - Input validation failures                       │
//! │  └── ErrorKind        - Category the HTTP layer renders                 │
//! │                                                                         │
//! │  skinbay-db errors (separate crate)                                    │
//! │  ├── DbError          - Storage failures                                │
//! │  └── MarketError      - CoreError | DbError, classified by ErrorKind    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → MarketError → dto::ApiError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Kinds
//! `InsufficientFunds` is deliberately separate from `BadRequest`: the
//! storefront shows a top-up prompt for it instead of a generic error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Invalid input, business-rule violation or invalid state transition.
    BadRequest,
    /// Referenced entity is absent.
    NotFound,
    /// Balance shortfall.
    InsufficientFunds,
    /// The resource does not belong to the caller.
    Unauthorized,
    /// Lost a race against a concurrent writer.
    Conflict,
    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for the excluded transport layer.
    pub const fn http_status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientFunds | ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule errors raised by the claim engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Business-rule violation or invalid state transition.
    ///
    /// ## When This Occurs
    /// - Listing an item the seller does not own
    /// - Cancelling a listing that has a pending buyer
    /// - Checking out a hold whose reservation expired
    #[error("{0}")]
    BadRequest(String),

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Buyer or renter cannot cover the amount.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Caller is acting on somebody else's resource.
    #[error("{0}")]
    Unauthorized(String),

    /// A concurrent writer claimed the resource first.
    ///
    /// ## User Workflow
    /// ```text
    /// Buyer A: add_item(listing) ──► listing RESERVED ✓
    /// Buyer B: add_item(listing) ──► conditional update hits 0 rows
    ///                                     │
    ///                                     ▼
    ///                         Conflict("Sale listing is already reserved")
    /// ```
    #[error("{0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a BadRequest error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        CoreError::BadRequest(message.into())
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        CoreError::Unauthorized(message.into())
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    /// Returns the category the caller should render.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::BadRequest(_) | CoreError::Validation(_) => ErrorKind::BadRequest,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is read or written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            required: 3000,
            available: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 3000, available 2000"
        );

        let err = CoreError::not_found("Sale listing", "abc");
        assert_eq!(err.to_string(), "Sale listing not found: abc");
    }

    #[test]
    fn test_validation_converts_to_bad_request() {
        let err: CoreError = ValidationError::MustBePositive {
            field: "price".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_kinds_map_to_statuses() {
        assert_eq!(CoreError::bad_request("x").kind().http_status(), 400);
        assert_eq!(CoreError::unauthorized("x").kind().http_status(), 403);
        assert_eq!(CoreError::not_found("Item", "1").kind().http_status(), 404);
        assert_eq!(CoreError::conflict("x").kind(), ErrorKind::Conflict);
        assert_eq!(ErrorKind::InsufficientFunds.http_status(), 409);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
    }
}
