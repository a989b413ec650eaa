//! # Domain Types
//!
//! Records shared by every layer of the marketplace.
//!
//! ## Claim Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who can claim an InventoryItem                       │
//! │                                                                         │
//! │                        ┌─────────────────┐                              │
//! │                        │  InventoryItem  │                              │
//! │                        │  owner, flag    │                              │
//! │                        └────────┬────────┘                              │
//! │                                 │ at most one ItemClaim                 │
//! │                 ┌───────────────┴───────────────┐                       │
//! │                 ▼                               ▼                       │
//! │        ┌─────────────────┐             ┌─────────────────┐              │
//! │        │  SaleListing    │             │ RentalListing   │              │
//! │        │  ACTIVE/RESERVED│             │ (+0..1 ACTIVE   │              │
//! │        └────────┬────────┘             │  RentalContract)│              │
//! │                 │ 0..1 live            └─────────────────┘              │
//! │        ┌────────▼────────┐                                              │
//! │        │    CartItem     │  price frozen at hold time                   │
//! │        └─────────────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ids are UUID v4 strings; all amounts are `*_cents` integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Users & Catalog
// =============================================================================

/// A marketplace account as seen by the claim engine.
///
/// Authentication lives elsewhere; the engine only needs the balance.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub nickname: String,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A catalog entry (the skin design, not a specific copy of it).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Skin {
    pub id: String,
    pub name: String,
    pub collection: Option<String>,
    pub rarity: Option<String>,
    /// Wear level, e.g. "Factory New".
    pub condition: Option<String>,
}

/// The platform's standing offer for a skin, used by instant sell.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstantBuyPrice {
    pub skin_id: String,
    pub price_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Whether an inventory item is still held by a user.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipFlag {
    /// Held by `user_id` and usable in listings.
    Owned,
    /// Bought back by the platform through instant sell.
    SoldToPlatform,
}

/// One concrete copy of a skin owned by a user.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    /// Current owner.
    pub user_id: String,
    pub skin_id: String,
    pub ownership_flag: OwnershipFlag,
    /// When the current owner received the item.
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
}

impl InventoryItem {
    /// True when `user_id` owns this item and it has not left their hands.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id && self.ownership_flag == OwnershipFlag::Owned
    }
}

// =============================================================================
// Sale Listing
// =============================================================================

/// Status of a sale listing.
///
/// ```text
///            add_item              checkout
///  ACTIVE ───────────► RESERVED ───────────► SOLD
///    │  ◄───────────      │
///    │  remove / expiry   └── (cancel refused while a buyer is pending)
///    ├──► INSTANT_SALE
///    └──► CANCELLED
/// ```
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleListingStatus {
    Active,
    Reserved,
    Sold,
    InstantSale,
    Cancelled,
}

impl SaleListingStatus {
    /// ACTIVE and RESERVED listings hold a claim on their item.
    #[inline]
    pub const fn is_live(self) -> bool {
        matches!(self, SaleListingStatus::Active | SaleListingStatus::Reserved)
    }
}

/// An item offered for outright sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleListing {
    pub id: String,
    pub inventory_item_id: String,
    pub seller_id: String,
    pub price_cents: i64,
    pub status: SaleListingStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SaleListing {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    CheckedOut,
}

/// A buyer's cart. A user has at most one ACTIVE cart.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub status: CartStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Status of a cart hold.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartItemStatus {
    /// Held with no deadline.
    Active,
    /// Held until `reserved_until`.
    Reserved,
    Purchased,
    Expired,
}

impl CartItemStatus {
    /// ACTIVE and RESERVED holds pin their sale listing.
    #[inline]
    pub const fn is_live(self) -> bool {
        matches!(self, CartItemStatus::Active | CartItemStatus::Reserved)
    }
}

/// A hold on a sale listing.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub sale_listing_id: String,
    /// Listing price at hold time (frozen).
    pub price_cents: i64,
    pub item_status: CartItemStatus,
    #[ts(as = "Option<String>")]
    pub reserved_until: Option<DateTime<Utc>>,
    /// Settlement record, set once purchased.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Rentals
// =============================================================================

/// An item offered for rent. One per inventory item.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalListing {
    pub id: String,
    pub inventory_item_id: String,
    pub owner_id: String,
    pub price_per_day_cents: i64,
    pub max_days: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl RentalListing {
    #[inline]
    pub fn price_per_day(&self) -> Money {
        Money::from_cents(self.price_per_day_cents)
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RentalContractStatus {
    Active,
    /// Closed by the sweeper after `end_at`.
    Expired,
    /// Closed early by the renter.
    Returned,
}

/// A paid, time-bounded rental of a listing.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalContract {
    pub id: String,
    pub rental_listing_id: String,
    pub renter_id: String,
    pub days: i64,
    pub total_cost_cents: i64,
    pub status: RentalContractStatus,
    #[ts(as = "String")]
    pub start_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Audit Trail
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Rental,
    InstantSale,
}

/// Durable record of one settlement.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    /// Paying user; `None` when the platform pays (instant sale).
    pub buyer_id: Option<String>,
    /// Receiving user (seller or rental owner).
    pub seller_id: String,
    pub inventory_item_id: String,
    /// Sale listing id or rental contract id.
    pub reference_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Claim Registry
// =============================================================================

/// Which avenue holds an item.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Sale,
    Rental,
}

impl ClaimKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Sale => "sale",
            ClaimKind::Rental => "rental",
        }
    }
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single outstanding claim on an inventory item.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemClaim {
    pub inventory_item_id: String,
    pub kind: ClaimKind,
    /// Sale listing id or rental listing id.
    pub reference_id: String,
    #[ts(as = "String")]
    pub claimed_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
