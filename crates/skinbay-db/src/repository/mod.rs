//! # Repository Module
//!
//! One repository per engine component.
//!
//! ## Transaction Boundaries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Public repository methods own their transaction:                      │
//! │                                                                         │
//! │      let mut tx = self.pool.begin().await?;                            │
//! │      ... read, ensure_*(), conditional writes ...                      │
//! │      tx.commit().await?;                                               │
//! │                                                                         │
//! │  Shared steps are `*_in(conn, ...)` helpers taking                     │
//! │  `&mut SqliteConnection`, so one transaction can span components:      │
//! │                                                                         │
//! │      checkout_item ──► settle_purchase_in ──► users::debit_in          │
//! │                                         └──► claims::release_in        │
//! │                                                                         │
//! │  Dropping a transaction without commit rolls everything back.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`users::UserRepository`] - Identity collaborator and balances
//! - [`skins::SkinRepository`] - Catalog and instant-buy quotes
//! - [`inventory::InventoryRepository`] - Owned items and tradability view
//! - [`claims::ClaimRepository`] - Single-claim registry
//! - [`sale_listings::SaleListingRepository`] - Sale listing state machine
//! - [`carts::CartRepository`] - Holds, checkout, hold expiry
//! - [`rentals::RentalRepository`] - Rental listings and contracts
//! - [`settlement::SettlementRepository`] - Atomic purchase settlement
//! - [`availability::AvailabilityRepository`] - Busy-item aggregation

pub mod availability;
pub mod carts;
pub mod claims;
pub mod inventory;
pub mod rentals;
pub mod sale_listings;
pub mod settlement;
pub mod skins;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;
