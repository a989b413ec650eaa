//! # Request & Response Records
//!
//! Plain data exchanged with the HTTP layer. Requests carry a `validate()`
//! that runs the field checks from [`crate::validation`]; the repositories
//! call it before opening a transaction.
//!
//! Every record is exported to TypeScript so the storefront and the engine
//! agree on field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ErrorKind};
use crate::money::Money;
use crate::types::{CartItem, CartStatus, InventoryItem, OwnershipFlag};
use crate::validation::{
    validate_id, validate_max_days, validate_price, validate_search_term, ValidationResult,
};

// =============================================================================
// Sale Listings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleListingRequest {
    pub inventory_item_id: String,
    pub price_cents: i64,
}

impl CreateSaleListingRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("inventoryItemId", &self.inventory_item_id)?;
        validate_price("price", Money::from_cents(self.price_cents))
    }
}

/// Facets for browsing ACTIVE sale listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    /// Only listings by this seller.
    pub owner_id: Option<String>,
    /// Substring of the skin name.
    pub q: Option<String>,
    pub collection: Option<String>,
    pub rarity: Option<String>,
    pub condition: Option<String>,
    pub limit: Option<i64>,
}

impl ListingFilter {
    /// Trims facets, drops blanks and clamps the page size to `1..=200`.
    pub fn normalized(&self) -> ValidationResult<ListingFilter> {
        Ok(ListingFilter {
            owner_id: validate_search_term("ownerId", self.owner_id.as_deref())?,
            q: validate_search_term("q", self.q.as_deref())?,
            collection: validate_search_term("collection", self.collection.as_deref())?,
            rarity: validate_search_term("rarity", self.rarity.as_deref())?,
            condition: validate_search_term("condition", self.condition.as_deref())?,
            limit: Some(self.limit.unwrap_or(50).clamp(1, 200)),
        })
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub sale_listing_id: String,
}

impl AddToCartRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("saleListingId", &self.sale_listing_id)
    }
}

/// A user's active cart with its holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: String,
    pub user_id: String,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
    /// Sum of frozen prices over live holds.
    pub total_cents: i64,
}

impl CartView {
    pub fn new(cart_id: String, user_id: String, status: CartStatus, items: Vec<CartItem>) -> Self {
        let total_cents = items
            .iter()
            .filter(|item| item.item_status.is_live())
            .map(|item| item.price_cents)
            .sum();
        CartView {
            cart_id,
            user_id,
            status,
            items,
            total_cents,
        }
    }
}

/// What the buyer sees after a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub cart_item_id: String,
    pub sale_listing_id: String,
    pub inventory_item_id: String,
    pub transaction_id: String,
    pub amount_cents: i64,
    pub buyer_balance_cents: i64,
    pub cart_status: CartStatus,
}

// =============================================================================
// Rentals
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalListingRequest {
    pub inventory_item_id: String,
    pub price_per_day_cents: i64,
    pub max_days: i64,
}

impl CreateRentalListingRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("inventoryItemId", &self.inventory_item_id)?;
        validate_price("pricePerDay", Money::from_cents(self.price_per_day_cents))?;
        validate_max_days(self.max_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    pub rental_listing_id: String,
    pub days: i64,
}

// =============================================================================
// Inventory & Maintenance
// =============================================================================

/// An inventory item with its catalog name and tradability.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemView {
    pub id: String,
    pub skin_id: String,
    pub skin_name: String,
    pub ownership_flag: OwnershipFlag,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    /// OWNED and under no claim.
    pub tradable: bool,
}

impl InventoryItemView {
    pub fn new(item: InventoryItem, skin_name: String, busy: bool) -> Self {
        let tradable = item.ownership_flag == OwnershipFlag::Owned && !busy;
        InventoryItemView {
            id: item.id,
            skin_id: item.skin_id,
            skin_name,
            ownership_flag: item.ownership_flag,
            received_at: item.received_at,
            tradable,
        }
    }
}

/// Rows reclaimed by one sweeper run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub released_holds: u64,
    pub expired_contracts: u64,
}

impl CleanupResponse {
    pub fn total(&self) -> u64 {
        self.released_holds + self.expired_contracts
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned to the HTTP layer.
///
/// ```json
/// { "code": "INSUFFICIENT_FUNDS", "message": "Insufficient funds: required 3000, available 2000" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApiError {
    pub code: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        self.code.http_status()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CartItemStatus;

    #[test]
    fn test_create_listing_request_validation() {
        let ok = CreateSaleListingRequest {
            inventory_item_id: uuid::Uuid::new_v4().to_string(),
            price_cents: 100,
        };
        assert!(ok.validate().is_ok());

        let free = CreateSaleListingRequest {
            price_cents: 0,
            ..ok.clone()
        };
        assert_eq!(free.validate().unwrap_err().to_string(), "price must be positive");
    }

    #[test]
    fn test_rental_request_validation() {
        let base = CreateRentalListingRequest {
            inventory_item_id: uuid::Uuid::new_v4().to_string(),
            price_per_day_cents: 10,
            max_days: 5,
        };
        assert!(base.validate().is_ok());
        assert!(CreateRentalListingRequest { max_days: 0, ..base.clone() }.validate().is_err());
        assert!(CreateRentalListingRequest { max_days: 366, ..base.clone() }.validate().is_err());
        assert!(CreateRentalListingRequest { price_per_day_cents: 0, ..base }.validate().is_err());
    }

    #[test]
    fn test_filter_normalization() {
        let filter = ListingFilter {
            q: Some("  dragon ".to_string()),
            rarity: Some("".to_string()),
            limit: Some(10_000),
            ..Default::default()
        };
        let normalized = filter.normalized().unwrap();
        assert_eq!(normalized.q.as_deref(), Some("dragon"));
        assert_eq!(normalized.rarity, None);
        assert_eq!(normalized.limit, Some(200));
    }

    #[test]
    fn test_cart_total_ignores_dead_holds() {
        let now = Utc::now();
        let hold = |status, price| CartItem {
            id: uuid::Uuid::new_v4().to_string(),
            cart_id: "cart".to_string(),
            sale_listing_id: uuid::Uuid::new_v4().to_string(),
            price_cents: price,
            item_status: status,
            reserved_until: None,
            transaction_id: None,
            created_at: now,
        };
        let view = CartView::new(
            "cart".to_string(),
            "buyer".to_string(),
            CartStatus::Active,
            vec![
                hold(CartItemStatus::Reserved, 100),
                hold(CartItemStatus::Active, 50),
                hold(CartItemStatus::Purchased, 999),
                hold(CartItemStatus::Expired, 999),
            ],
        );
        assert_eq!(view.total_cents, 150);
    }

    #[test]
    fn test_inventory_view_tradability() {
        let item = InventoryItem {
            id: "i".to_string(),
            user_id: "u".to_string(),
            skin_id: "s".to_string(),
            ownership_flag: OwnershipFlag::Owned,
            received_at: Utc::now(),
        };
        assert!(InventoryItemView::new(item.clone(), "AWP".into(), false).tradable);
        assert!(!InventoryItemView::new(item.clone(), "AWP".into(), true).tradable);

        let sold = InventoryItem {
            ownership_flag: OwnershipFlag::SoldToPlatform,
            ..item
        };
        assert!(!InventoryItemView::new(sold, "AWP".into(), false).tradable);
    }

    #[test]
    fn test_api_error_from_core() {
        let api: ApiError = CoreError::conflict("Sale listing is already reserved").into();
        assert_eq!(api.code, ErrorKind::Conflict);
        assert_eq!(api.status(), 409);

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["message"], "Sale listing is already reserved");
    }
}
