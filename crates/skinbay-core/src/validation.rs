//! # Validation Module
//!
//! Field-level checks that run before any row is read or written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (external)                                        │
//! │  └── Deserialization, auth                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── positive prices, day bounds, id format, search length             │
//! │  └── fails fast, before a transaction is opened                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: lifecycle rules (state-dependent, inside the transaction)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite constraints (UNIQUE claim keys, CHECKs, FKs)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_RENTAL_DAYS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Validates that `value` is a UUID.
///
/// ## Example
/// ```rust
/// use skinbay_core::validation::validate_id;
///
/// assert!(validate_id("listing_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("listing_id", "").is_err());
/// assert!(validate_id("listing_id", "not-a-uuid").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Uuid::parse_str(value).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

// =============================================================================
// Amounts
// =============================================================================

/// Listing prices, daily rates and instant-buy quotes must be > 0.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a rental listing's `max_days` against `1..=365`.
pub fn validate_max_days(max_days: i64) -> ValidationResult<()> {
    if !(1..=MAX_RENTAL_DAYS).contains(&max_days) {
        return Err(ValidationError::OutOfRange {
            field: "maxDays".to_string(),
            min: 1,
            max: MAX_RENTAL_DAYS,
        });
    }
    Ok(())
}

/// Top-ups and other balance credits must be > 0.
pub fn validate_credit(amount: Money) -> ValidationResult<()> {
    validate_price("amount", amount)
}

// =============================================================================
// Text
// =============================================================================

/// Normalizes an optional search facet.
///
/// Blank becomes `None`; anything over 100 characters is rejected.
pub fn validate_search_term(field: &str, term: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if term.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(Some(term.to_string()))
}

/// Validates a display nickname.
pub fn validate_nickname(nickname: &str) -> ValidationResult<()> {
    let nickname = nickname.trim();

    if nickname.is_empty() {
        return Err(ValidationError::Required {
            field: "nickname".to_string(),
        });
    }

    if nickname.chars().count() > 64 {
        return Err(ValidationError::TooLong {
            field: "nickname".to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
