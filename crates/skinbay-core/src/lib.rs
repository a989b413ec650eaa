//! # skinbay-core: Pure Domain Logic for the Skin Marketplace
//!
//! This crate holds the rules of the inventory claim & reservation engine
//! as pure functions and plain data. It never touches a database, a clock,
//! or the network: callers pass `now` in and persist what comes out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Skinbay Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer / storefront (external)                 │   │
//! │  │    list item ──► add to cart ──► checkout ──► rent              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ dto::* records                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ skinbay-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ lifecycle │  │  rental   │  │ validation│  │   │
//! │  │   │  Listing  │  │  status   │  │  quotes   │  │   rules   │  │   │
//! │  │   │ CartItem  │  │  checks   │  │ outcomes  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  skinbay-db (Database Layer)                    │   │
//! │  │     claim registry, settlement, sweeper passes, migrations      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (InventoryItem, SaleListing, CartItem, ...)
//! - [`money`] - Integer minor-unit money
//! - [`lifecycle`] - Status transition rules for listings, holds and contracts
//! - [`rental`] - Rental cost quoting and typed rent outcomes
//! - [`validation`] - Field-level input checks
//! - [`dto`] - Request/response records exposed to the HTTP layer
//! - [`error`] - Domain error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use skinbay_core::money::Money;
//! use skinbay_core::rental::quote_rental;
//!
//! let quote = quote_rental(Money::from_cents(10), 5, 3).unwrap();
//! assert_eq!(quote.total_cost.cents(), 30);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dto;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod rental;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use rental::{RentFailure, RentOutcome, RentalQuote};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default lifetime of a cart hold, in seconds.
///
/// ## Business Reason
/// Long enough to finish checkout, short enough that an abandoned cart
/// does not lock a listing away from other buyers for an afternoon.
/// Overridable through `[reservations] window_secs`.
pub const DEFAULT_RESERVATION_WINDOW_SECS: i64 = 15 * 60;

/// Upper bound for a rental listing's `max_days`.
pub const MAX_RENTAL_DAYS: i64 = 365;

/// Maximum live holds in a single cart.
///
/// ## Business Reason
/// Prevents one account from parking the whole market in a cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Default sweeper interval in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 30_000;

/// Default number of rows a single sweeper pass may touch.
pub const DEFAULT_SWEEP_BATCH_LIMIT: i64 = 500;
