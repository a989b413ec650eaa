//! # Rental Quoting & Outcomes
//!
//! Pure pieces of the rent operation: cost quoting, contract end dates,
//! and the structured outcome returned to callers.
//!
//! ## Rent Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rent(renter, listing, days)                                            │
//! │       │                                                                 │
//! │       ├── days ∉ [1, max_days] ──► hard Err(BadRequest), nothing read   │
//! │       │                            beyond the listing                   │
//! │       ▼                                                                 │
//! │  quote_rental() ──► total = price_per_day × days                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  one transaction: availability, balance, debit, credit, contract        │
//! │       │                                                                 │
//! │       ├── expected failure ──► RentOutcome { success: false,            │
//! │       │                                      failure: Some(reason) }    │
//! │       └── committed        ──► RentOutcome { success: true, ... }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are classified by [`RentFailure`], never by message text.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ErrorKind, ValidationError};
use crate::money::Money;

// =============================================================================
// Quote
// =============================================================================

/// Price of a rental before any money moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalQuote {
    pub days: i64,
    pub price_per_day: Money,
    pub total_cost: Money,
}

/// Rejects a day count outside `[1, max_days]`.
pub fn validate_rental_days(days: i64, max_days: i64) -> CoreResult<()> {
    if days < 1 || days > max_days {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: max_days,
        }
        .into());
    }
    Ok(())
}

/// Quotes `price_per_day × days`.
///
/// ## Example
/// ```rust
/// use skinbay_core::money::Money;
/// use skinbay_core::rental::quote_rental;
///
/// let quote = quote_rental(Money::from_cents(10), 5, 3).unwrap();
/// assert_eq!(quote.total_cost, Money::from_cents(30));
/// assert!(quote_rental(Money::from_cents(10), 5, 6).is_err());
/// ```
pub fn quote_rental(price_per_day: Money, max_days: i64, days: i64) -> CoreResult<RentalQuote> {
    validate_rental_days(days, max_days)?;

    let total_cost = price_per_day
        .checked_times(days)
        .filter(Money::is_positive)
        .ok_or_else(|| CoreError::bad_request("Rental cost must be positive"))?;

    Ok(RentalQuote {
        days,
        price_per_day,
        total_cost,
    })
}

/// End of a contract that starts at `start` and runs `days` days.
pub fn contract_end(start: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    start + Duration::days(days)
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a rent attempt did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RentFailure {
    ListingNotFound,
    RenterNotFound,
    /// The renter owns the listed item.
    SelfRental,
    /// Another contract is already active on the listing.
    Unavailable,
    InsufficientFunds,
}

impl RentFailure {
    pub const fn kind(self) -> ErrorKind {
        match self {
            RentFailure::ListingNotFound | RentFailure::RenterNotFound => ErrorKind::NotFound,
            RentFailure::InsufficientFunds => ErrorKind::InsufficientFunds,
            RentFailure::SelfRental | RentFailure::Unavailable => ErrorKind::BadRequest,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            RentFailure::ListingNotFound => "Rental listing not found",
            RentFailure::RenterNotFound => "Renter not found",
            RentFailure::SelfRental => "Owner cannot rent their own item",
            RentFailure::Unavailable => "Item is already rented",
            RentFailure::InsufficientFunds => "Insufficient balance",
        }
    }
}

/// Result of a rent attempt, successful or not.
///
/// Callers render `message` directly; `failure` carries the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentOutcome {
    pub success: bool,
    pub message: String,
    pub contract_id: Option<String>,
    pub total_cost_cents: Option<i64>,
    pub failure: Option<RentFailure>,
}

impl RentOutcome {
    pub fn succeeded(contract_id: impl Into<String>, total_cost: Money) -> Self {
        RentOutcome {
            success: true,
            message: "Rental created".to_string(),
            contract_id: Some(contract_id.into()),
            total_cost_cents: Some(total_cost.cents()),
            failure: None,
        }
    }

    pub fn failed(failure: RentFailure, total_cost: Option<Money>) -> Self {
        RentOutcome {
            success: false,
            message: failure.message().to_string(),
            contract_id: None,
            total_cost_cents: total_cost.map(|m| m.cents()),
            failure: Some(failure),
        }
    }

    /// Category of the failure, `None` on success.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.failure.map(RentFailure::kind)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_basic() {
        let quote = quote_rental(Money::from_cents(10), 5, 3).unwrap();
        assert_eq!(quote.days, 3);
        assert_eq!(quote.total_cost.cents(), 30);
    }

    #[test]
    fn test_quote_day_bounds() {
        assert!(quote_rental(Money::from_cents(10), 5, 1).is_ok());
        assert!(quote_rental(Money::from_cents(10), 5, 5).is_ok());

        let err = quote_rental(Money::from_cents(10), 5, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "Validation error: days must be between 1 and 5");

        assert!(quote_rental(Money::from_cents(10), 5, 0).is_err());
        assert!(quote_rental(Money::from_cents(10), 5, -2).is_err());
    }

    #[test]
    fn test_quote_rejects_non_positive_or_overflowing_cost() {
        assert!(quote_rental(Money::zero(), 5, 2).is_err());
        assert!(quote_rental(Money::from_cents(i64::MAX), 5, 2).is_err());
    }

    #[test]
    fn test_contract_end() {
        let start = Utc::now();
        assert_eq!(contract_end(start, 3) - start, Duration::days(3));
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(RentFailure::ListingNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(RentFailure::RenterNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(RentFailure::InsufficientFunds.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(RentFailure::Unavailable.kind(), ErrorKind::BadRequest);
        assert_eq!(RentFailure::SelfRental.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_outcomes() {
        let ok = RentOutcome::succeeded("contract-1", Money::from_cents(30));
        assert!(ok.success);
        assert_eq!(ok.total_cost_cents, Some(30));
        assert_eq!(ok.kind(), None);

        let broke = RentOutcome::failed(RentFailure::InsufficientFunds, Some(Money::from_cents(30)));
        assert!(!broke.success);
        assert_eq!(broke.message, "Insufficient balance");
        assert_eq!(broke.kind(), Some(ErrorKind::InsufficientFunds));
        assert_eq!(broke.total_cost_cents, Some(30));
    }
}
