//! # Lifecycle Rules
//!
//! Pure checks for every status transition the claim engine performs.
//!
//! The database layer loads rows inside a transaction, runs the matching
//! `ensure_*` function, and only then writes. The conditional `UPDATE`
//! that follows re-checks the same status in SQL, so a row that changed
//! between the read and the write is caught there and surfaced as a
//! conflict.
//!
//! ## Authoritative Field
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Is this listing claimable?" is answered by SaleListing.status ONLY.  │
//! │                                                                         │
//! │  add_item      ACTIVE   → RESERVED   + hold inserted      (one tx)     │
//! │  remove_item   RESERVED → ACTIVE     + hold deleted       (one tx)     │
//! │  sweeper       RESERVED → ACTIVE     + hold EXPIRED       (one tx)     │
//! │  checkout      RESERVED → SOLD       + hold PURCHASED     (one tx)     │
//! │                                                                         │
//! │  The cart item status is derived bookkeeping and never consulted       │
//! │  on its own to decide claimability.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    CartItem, CartItemStatus, InventoryItem, RentalContract, RentalContractStatus, SaleListing,
    SaleListingStatus,
};

// =============================================================================
// Inventory
// =============================================================================

/// The caller must own the item, and it must still be in their hands.
pub fn ensure_item_owned(item: &InventoryItem, user_id: &str) -> CoreResult<()> {
    if !item.is_owned_by(user_id) {
        return Err(CoreError::bad_request("Inventory item is not owned"));
    }
    Ok(())
}

// =============================================================================
// Sale Listing
// =============================================================================

/// Checks a seller's cancel request.
///
/// RESERVED listings have a pending buyer and are never cancelled silently.
pub fn ensure_cancellable(listing: &SaleListing, seller_id: &str) -> CoreResult<()> {
    if listing.seller_id != seller_id {
        return Err(CoreError::unauthorized(
            "Sale listing does not belong to this user",
        ));
    }
    match listing.status {
        SaleListingStatus::Active => Ok(()),
        SaleListingStatus::Reserved => Err(CoreError::bad_request(
            "Sale listing is reserved by a buyer and cannot be cancelled",
        )),
        _ => Err(CoreError::bad_request("Sale listing is not active")),
    }
}

/// Checks a seller's instant-sell request.
pub fn ensure_instant_sellable(listing: &SaleListing, seller_id: &str) -> CoreResult<()> {
    if listing.status != SaleListingStatus::Active {
        return Err(CoreError::bad_request("Sale listing is not active"));
    }
    if listing.seller_id != seller_id {
        return Err(CoreError::bad_request("Seller mismatch"));
    }
    Ok(())
}

/// Checks that `buyer_id` may place a hold on the listing.
pub fn ensure_holdable(listing: &SaleListing, buyer_id: &str) -> CoreResult<()> {
    match listing.status {
        SaleListingStatus::Active => {}
        SaleListingStatus::Reserved => {
            return Err(CoreError::conflict("Sale listing is already reserved"))
        }
        _ => return Err(CoreError::bad_request("Sale listing is not active")),
    }
    if listing.seller_id == buyer_id {
        return Err(CoreError::bad_request("Buyer cannot be seller"));
    }
    Ok(())
}

// =============================================================================
// Cart Holds
// =============================================================================

/// Status and deadline for a new hold.
///
/// With a reservation window the hold is RESERVED until `now + window`;
/// without one it is ACTIVE and never expires on its own.
pub fn new_hold(now: DateTime<Utc>, window: Option<Duration>) -> (CartItemStatus, Option<DateTime<Utc>>) {
    match window {
        Some(window) => (CartItemStatus::Reserved, Some(now + window)),
        None => (CartItemStatus::Active, None),
    }
}

/// A hold is expired once its deadline is at or before `now`.
pub fn is_hold_expired(item: &CartItem, now: DateTime<Utc>) -> bool {
    item.reserved_until.is_some_and(|until| until <= now)
}

pub fn ensure_removable(item: &CartItem) -> CoreResult<()> {
    if item.item_status == CartItemStatus::Purchased {
        return Err(CoreError::bad_request(
            "Purchased cart items cannot be removed",
        ));
    }
    Ok(())
}

/// Checks a hold and its listing right before settlement.
///
/// ## Checkout Gate
/// ```text
/// hold live?           no  → "Cart item is not purchasable"
/// deadline passed?     yes → "Reservation expired"
/// listing RESERVED?    no  → "Sale listing is not active"
/// buyer == seller?     yes → "Buyer cannot be seller"
/// ```
pub fn ensure_checkout_ready(
    item: &CartItem,
    listing: &SaleListing,
    buyer_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if !item.item_status.is_live() {
        return Err(CoreError::bad_request("Cart item is not purchasable"));
    }
    if is_hold_expired(item, now) {
        return Err(CoreError::bad_request("Reservation expired"));
    }
    if listing.status != SaleListingStatus::Reserved {
        return Err(CoreError::bad_request("Sale listing is not active"));
    }
    if listing.seller_id == buyer_id {
        return Err(CoreError::bad_request("Buyer cannot be seller"));
    }
    Ok(())
}

// =============================================================================
// Rental Contracts
// =============================================================================

/// Checks a renter's request to hand an item back early.
pub fn ensure_contract_endable(contract: &RentalContract, renter_id: &str) -> CoreResult<()> {
    if contract.renter_id != renter_id {
        return Err(CoreError::unauthorized(
            "Rental contract does not belong to this user",
        ));
    }
    if contract.status != RentalContractStatus::Active {
        return Err(CoreError::bad_request("Rental contract is not active"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::OwnershipFlag;

    fn listing(status: SaleListingStatus) -> SaleListing {
        let now = Utc::now();
        SaleListing {
            id: "listing-1".to_string(),
            inventory_item_id: "item-1".to_string(),
            seller_id: "seller".to_string(),
            price_cents: 100,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn hold(status: CartItemStatus, reserved_until: Option<DateTime<Utc>>) -> CartItem {
        CartItem {
            id: "hold-1".to_string(),
            cart_id: "cart-1".to_string(),
            sale_listing_id: "listing-1".to_string(),
            price_cents: 100,
            item_status: status,
            reserved_until,
            transaction_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_must_be_owned() {
        let item = InventoryItem {
            id: "item-1".to_string(),
            user_id: "seller".to_string(),
            skin_id: "skin".to_string(),
            ownership_flag: OwnershipFlag::Owned,
            received_at: Utc::now(),
        };
        assert!(ensure_item_owned(&item, "seller").is_ok());
        let err = ensure_item_owned(&item, "someone-else").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_cancel_rules() {
        assert!(ensure_cancellable(&listing(SaleListingStatus::Active), "seller").is_ok());

        let err = ensure_cancellable(&listing(SaleListingStatus::Active), "buyer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = ensure_cancellable(&listing(SaleListingStatus::Reserved), "seller").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = ensure_cancellable(&listing(SaleListingStatus::Sold), "seller").unwrap_err();
        assert_eq!(err.to_string(), "Sale listing is not active");
    }

    #[test]
    fn test_instant_sell_rules() {
        assert!(ensure_instant_sellable(&listing(SaleListingStatus::Active), "seller").is_ok());
        assert!(ensure_instant_sellable(&listing(SaleListingStatus::Active), "other").is_err());
        assert!(ensure_instant_sellable(&listing(SaleListingStatus::Reserved), "seller").is_err());
    }

    #[test]
    fn test_holdable() {
        assert!(ensure_holdable(&listing(SaleListingStatus::Active), "buyer").is_ok());

        let err = ensure_holdable(&listing(SaleListingStatus::Reserved), "buyer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Sale listing is already reserved");

        let err = ensure_holdable(&listing(SaleListingStatus::Active), "seller").unwrap_err();
        assert_eq!(err.to_string(), "Buyer cannot be seller");

        let err = ensure_holdable(&listing(SaleListingStatus::Cancelled), "buyer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_new_hold_with_and_without_window() {
        let now = Utc::now();
        let (status, until) = new_hold(now, Some(Duration::minutes(15)));
        assert_eq!(status, CartItemStatus::Reserved);
        assert_eq!(until, Some(now + Duration::minutes(15)));

        let (status, until) = new_hold(now, None);
        assert_eq!(status, CartItemStatus::Active);
        assert!(until.is_none());
    }

    #[test]
    fn test_checkout_gate() {
        let now = Utc::now();
        let reserved = listing(SaleListingStatus::Reserved);

        let live = hold(CartItemStatus::Reserved, Some(now + Duration::minutes(5)));
        assert!(ensure_checkout_ready(&live, &reserved, "buyer", now).is_ok());

        let expired = hold(CartItemStatus::Reserved, Some(now - Duration::seconds(1)));
        let err = ensure_checkout_ready(&expired, &reserved, "buyer", now).unwrap_err();
        assert_eq!(err.to_string(), "Reservation expired");

        let bought = hold(CartItemStatus::Purchased, None);
        let err = ensure_checkout_ready(&bought, &reserved, "buyer", now).unwrap_err();
        assert_eq!(err.to_string(), "Cart item is not purchasable");

        let open = hold(CartItemStatus::Active, None);
        let err =
            ensure_checkout_ready(&open, &listing(SaleListingStatus::Sold), "buyer", now).unwrap_err();
        assert_eq!(err.to_string(), "Sale listing is not active");

        let err = ensure_checkout_ready(&open, &reserved, "seller", now).unwrap_err();
        assert_eq!(err.to_string(), "Buyer cannot be seller");
    }

    #[test]
    fn test_purchased_hold_not_removable() {
        assert!(ensure_removable(&hold(CartItemStatus::Active, None)).is_ok());
        assert!(ensure_removable(&hold(CartItemStatus::Expired, None)).is_ok());
        assert!(ensure_removable(&hold(CartItemStatus::Purchased, None)).is_err());
    }

    #[test]
    fn test_contract_end_rules() {
        let now = Utc::now();
        let mut contract = RentalContract {
            id: "c-1".to_string(),
            rental_listing_id: "r-1".to_string(),
            renter_id: "renter".to_string(),
            days: 3,
            total_cost_cents: 30,
            status: RentalContractStatus::Active,
            start_at: now,
            end_at: now + Duration::days(3),
            closed_at: None,
        };
        assert!(ensure_contract_endable(&contract, "renter").is_ok());
        assert_eq!(
            ensure_contract_endable(&contract, "owner").unwrap_err().kind(),
            ErrorKind::Unauthorized
        );

        contract.status = RentalContractStatus::Expired;
        assert_eq!(
            ensure_contract_endable(&contract, "renter").unwrap_err().kind(),
            ErrorKind::BadRequest
        );
    }
}
