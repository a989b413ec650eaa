//! # skinbay-db: Claim & Reservation Engine Storage
//!
//! Every marketplace write (listing, hold, checkout, rent, sweep) as one
//! SQLite transaction, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Skinbay Data Flow                                │
//! │                                                                         │
//! │  HTTP handler / ExpirySweeper                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   skinbay-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ SaleListingRepo    │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ CartRepo           │  │ 001_schema │  │   │
//! │  │   │ ClaimPolicy   │    │ RentalRepo         │  │ 002_claims │  │   │
//! │  │   │               │    │ SettlementRepo     │  │            │  │   │
//! │  │   └───────────────┘    │ Availability, ...  │  └────────────┘  │   │
//! │  │                        └────────────────────┘                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (conditional UPDATEs + partial unique indexes arbitrate races) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and claim policy
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the operation-level `MarketError`
//! - [`repository`] - One repository per component
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skinbay_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("market.db")).await?;
//! let listing = db.sale_listings().create_listing(&seller_id, &request).await?;
//! let cart = db.carts().add_item(&buyer_id, &AddToCartRequest { sale_listing_id: listing.id }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, MarketError, MarketResult};
pub use pool::{ClaimPolicy, Database, DbConfig};

pub use repository::availability::AvailabilityRepository;
pub use repository::carts::CartRepository;
pub use repository::claims::ClaimRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::rentals::RentalRepository;
pub use repository::sale_listings::SaleListingRepository;
pub use repository::settlement::{PurchaseOrder, SettlementRepository};
pub use repository::skins::SkinRepository;
pub use repository::users::UserRepository;
