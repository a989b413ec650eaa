//! # Cart Reservation Manager
//!
//! Holds on sale listings, checkout, and hold expiry.
//!
//! ## Hold Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   add_item ──► hold RESERVED (until now + window)   listing RESERVED   │
//! │                     │                                                   │
//! │        ┌────────────┼─────────────────────┬─────────────────────┐      │
//! │        ▼            ▼                     ▼                     │      │
//! │   remove_item   checkout_item      release_expired_holds        │      │
//! │   (row deleted) hold PURCHASED     hold EXPIRED                 │      │
//! │   listing       listing SOLD       listing ACTIVE               │      │
//! │   ACTIVE        + settlement                                    │      │
//! │                                                                         │
//! │   Without a reservation window the hold is ACTIVE with no deadline     │
//! │   and only remove/checkout end it.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Race Arbitration
//! Two buyers adding the same listing both read it ACTIVE. The conditional
//! `UPDATE sale_listings ... WHERE status = 'active'` lets exactly one flip
//! it to RESERVED; the other sees zero rows and gets Conflict "Sale listing
//! is already reserved". The partial unique index
//! `uq_cart_items_live_listing` backs this up at the hold level.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use skinbay_core::dto::{AddToCartRequest, CartView, CheckoutReceipt};
use skinbay_core::lifecycle::{ensure_checkout_ready, ensure_holdable, ensure_removable, new_hold};
use skinbay_core::{Cart, CartItem, CartStatus, CoreError, ErrorKind, SaleListingStatus};

use crate::error::{MarketError, MarketResult};
use crate::pool::ClaimPolicy;
use crate::repository::settlement::{self, PurchaseOrder};
use crate::repository::{sale_listings, users};

const CART_COLUMNS: &str = "id, user_id, status, created_at";
const CART_ITEM_COLUMNS: &str =
    "id, cart_id, sale_listing_id, price_cents, item_status, reserved_until, transaction_id, created_at";

#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
    policy: ClaimPolicy,
}

impl CartRepository {
    pub fn new(pool: SqlitePool, policy: ClaimPolicy) -> Self {
        CartRepository { pool, policy }
    }

    // =========================================================================
    // Holds
    // =========================================================================

    /// Places a hold on a sale listing in the user's active cart.
    pub async fn add_item(&self, user_id: &str, request: &AddToCartRequest) -> MarketResult<CartView> {
        self.add_item_at(user_id, request, Utc::now()).await
    }

    /// [`add_item`](Self::add_item) with an explicit clock.
    pub async fn add_item_at(
        &self,
        user_id: &str,
        request: &AddToCartRequest,
        now: DateTime<Utc>,
    ) -> MarketResult<CartView> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;

        if users::get_in(&mut tx, user_id).await?.is_none() {
            return Err(CoreError::not_found("User", user_id).into());
        }
        let listing = sale_listings::require_in(&mut tx, &request.sale_listing_id).await?;
        let existing_cart = active_cart_in(&mut tx, user_id).await?;

        if let Some(cart) = &existing_cart {
            if live_hold_in_cart_in(&mut tx, &cart.id, &listing.id).await? {
                return Err(CoreError::bad_request("Item already in cart").into());
            }
        }

        ensure_holdable(&listing, user_id)?;

        if let Some(cart) = &existing_cart {
            let held = live_count_in(&mut tx, &cart.id).await?;
            if held >= self.policy.max_cart_items as i64 {
                return Err(CoreError::bad_request("Cart is full").into());
            }
        }

        sale_listings::transition_in(
            &mut tx,
            &listing.id,
            SaleListingStatus::Active,
            SaleListingStatus::Reserved,
            now,
        )
        .await
        .map_err(reserved_conflict)?;

        let cart = match existing_cart {
            Some(cart) => cart,
            None => create_cart_in(&mut tx, user_id, now).await?,
        };

        let (item_status, reserved_until) = new_hold(now, self.policy.reservation_window);
        let hold = CartItem {
            id: Uuid::new_v4().to_string(),
            cart_id: cart.id.clone(),
            sale_listing_id: listing.id.clone(),
            price_cents: listing.price_cents,
            item_status,
            reserved_until,
            transaction_id: None,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO cart_items (
                id, cart_id, sale_listing_id, price_cents, item_status, reserved_until, transaction_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&hold.id)
        .bind(&hold.cart_id)
        .bind(&hold.sale_listing_id)
        .bind(hold.price_cents)
        .bind(hold.item_status)
        .bind(hold.reserved_until)
        .bind(&hold.transaction_id)
        .bind(hold.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| reserved_conflict(e.into()))?;

        let view = view_in(&mut tx, &cart).await?;
        tx.commit().await?;

        info!(
            cart_item_id = %hold.id,
            sale_listing_id = %hold.sale_listing_id,
            user_id = %user_id,
            reserved_until = ?hold.reserved_until,
            "Hold placed"
        );
        Ok(view)
    }

    /// The user's ACTIVE cart.
    pub async fn get_cart(&self, user_id: &str) -> MarketResult<CartView> {
        let mut conn = self.pool.acquire().await?;
        let cart = active_cart_in(&mut conn, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Cart", user_id))?;
        view_in(&mut conn, &cart).await
    }

    /// Drops a hold. A live hold hands its listing back to ACTIVE.
    pub async fn remove_item(&self, user_id: &str, cart_item_id: &str) -> MarketResult<CartView> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = require_item_in(&mut tx, cart_item_id).await?;
        let cart = owned_cart_in(&mut tx, &item, user_id).await?;
        if cart.status != CartStatus::Active {
            return Err(CoreError::not_found("Cart", user_id).into());
        }
        ensure_removable(&item)?;

        sqlx::query("DELETE FROM cart_items WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;

        if item.item_status.is_live() {
            sale_listings::transition_in(
                &mut tx,
                &item.sale_listing_id,
                SaleListingStatus::Reserved,
                SaleListingStatus::Active,
                now,
            )
            .await?;
        }

        let view = view_in(&mut tx, &cart).await?;
        tx.commit().await?;

        info!(cart_item_id = %cart_item_id, user_id = %user_id, "Hold removed");
        Ok(view)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Buys one held listing at its frozen hold price.
    pub async fn checkout_item(&self, user_id: &str, cart_item_id: &str) -> MarketResult<CheckoutReceipt> {
        self.checkout_item_at(user_id, cart_item_id, Utc::now()).await
    }

    /// [`checkout_item`](Self::checkout_item) with an explicit clock.
    pub async fn checkout_item_at(
        &self,
        user_id: &str,
        cart_item_id: &str,
        now: DateTime<Utc>,
    ) -> MarketResult<CheckoutReceipt> {
        let mut tx = self.pool.begin().await?;

        let item = require_item_in(&mut tx, cart_item_id).await?;
        let cart = owned_cart_in(&mut tx, &item, user_id).await?;
        let listing = sale_listings::require_in(&mut tx, &item.sale_listing_id).await?;
        ensure_checkout_ready(&item, &listing, user_id, now)?;

        let order = PurchaseOrder {
            buyer_id: user_id.to_string(),
            seller_id: listing.seller_id.clone(),
            inventory_item_id: listing.inventory_item_id.clone(),
            sale_listing_id: listing.id.clone(),
            price: item.price(),
        };
        let record =
            settlement::settle_purchase_in(&mut tx, &order, SaleListingStatus::Reserved, now, None).await?;

        let purchased = sqlx::query(
            r#"
            UPDATE cart_items SET item_status = 'purchased', transaction_id = ?2
            WHERE id = ?1 AND item_status IN ('active', 'reserved')
            "#,
        )
        .bind(&item.id)
        .bind(&record.id)
        .execute(&mut *tx)
        .await?;
        if purchased.rows_affected() == 0 {
            return Err(CoreError::conflict("Cart item was modified concurrently").into());
        }

        let cart_status = if live_count_in(&mut tx, &cart.id).await? == 0 {
            sqlx::query("UPDATE carts SET status = 'checked_out' WHERE id = ?1 AND status = 'active'")
                .bind(&cart.id)
                .execute(&mut *tx)
                .await?;
            CartStatus::CheckedOut
        } else {
            cart.status
        };

        let buyer_balance = users::balance_in(&mut tx, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))?;

        tx.commit().await?;

        info!(
            cart_item_id = %item.id,
            transaction_id = %record.id,
            amount = %order.price,
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            cart_item_id: item.id,
            sale_listing_id: listing.id,
            inventory_item_id: listing.inventory_item_id,
            transaction_id: record.id,
            amount_cents: record.amount_cents,
            buyer_balance_cents: buyer_balance.cents(),
            cart_status,
        })
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    /// Expires at most `limit` holds whose deadline has passed.
    pub async fn release_expired_holds(&self, limit: i64) -> MarketResult<u64> {
        self.release_expired_holds_at(Utc::now(), limit).await
    }

    /// Each hold flips to EXPIRED only if it is still live and past its
    /// deadline, so concurrent sweepers and checkouts never double-apply.
    pub async fn release_expired_holds_at(&self, now: DateTime<Utc>, limit: i64) -> MarketResult<u64> {
        let mut tx = self.pool.begin().await?;

        let expired: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, sale_listing_id FROM cart_items
            WHERE item_status IN ('active', 'reserved')
              AND reserved_until IS NOT NULL
              AND reserved_until <= ?1
            ORDER BY reserved_until
            LIMIT ?2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut released = 0u64;
        for (cart_item_id, sale_listing_id) in &expired {
            let result = sqlx::query(
                r#"
                UPDATE cart_items SET item_status = 'expired'
                WHERE id = ?1 AND item_status IN ('active', 'reserved') AND reserved_until <= ?2
                "#,
            )
            .bind(cart_item_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                continue;
            }

            sqlx::query(
                "UPDATE sale_listings SET status = 'active', updated_at = ?2 WHERE id = ?1 AND status = 'reserved'",
            )
            .bind(sale_listing_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            debug!(cart_item_id = %cart_item_id, sale_listing_id = %sale_listing_id, "Hold expired");
            released += 1;
        }

        tx.commit().await?;
        Ok(released)
    }
}

// =============================================================================
// In-transaction helpers
// =============================================================================

fn reserved_conflict(err: MarketError) -> MarketError {
    match err.kind() {
        ErrorKind::Conflict => CoreError::conflict("Sale listing is already reserved").into(),
        _ => err,
    }
}

async fn active_cart_in(conn: &mut SqliteConnection, user_id: &str) -> MarketResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?1 AND status = 'active'"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(cart)
}

async fn create_cart_in(conn: &mut SqliteConnection, user_id: &str, now: DateTime<Utc>) -> MarketResult<Cart> {
    let cart = Cart {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        status: CartStatus::Active,
        created_at: now,
    };

    sqlx::query("INSERT INTO carts (id, user_id, status, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&cart.id)
        .bind(&cart.user_id)
        .bind(cart.status)
        .bind(cart.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| MarketError::from(e).or_conflict("Cart was created concurrently"))?;

    debug!(cart_id = %cart.id, user_id = %user_id, "Cart created");
    Ok(cart)
}

async fn require_item_in(conn: &mut SqliteConnection, cart_item_id: &str) -> MarketResult<CartItem> {
    sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = ?1"
    ))
    .bind(cart_item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::not_found("Cart item", cart_item_id).into())
}

/// The cart holding `item`, provided it belongs to `user_id`.
async fn owned_cart_in(conn: &mut SqliteConnection, item: &CartItem, user_id: &str) -> MarketResult<Cart> {
    let cart = sqlx::query_as::<_, Cart>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = ?1"))
        .bind(&item.cart_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Cart", &item.cart_id))?;

    if cart.user_id != user_id {
        return Err(CoreError::unauthorized("Cart item does not belong to this user").into());
    }
    Ok(cart)
}

async fn live_hold_in_cart_in(conn: &mut SqliteConnection, cart_id: &str, sale_listing_id: &str) -> MarketResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM cart_items
        WHERE cart_id = ?1 AND sale_listing_id = ?2 AND item_status IN ('active', 'reserved')
        "#,
    )
    .bind(cart_id)
    .bind(sale_listing_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

async fn live_count_in(conn: &mut SqliteConnection, cart_id: &str) -> MarketResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cart_items WHERE cart_id = ?1 AND item_status IN ('active', 'reserved')",
    )
    .bind(cart_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn view_in(conn: &mut SqliteConnection, cart: &Cart) -> MarketResult<CartView> {
    let items = sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = ?1 ORDER BY created_at"
    ))
    .bind(&cart.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(CartView::new(cart.id.clone(), cart.user_id.clone(), cart.status, items))
}

// =============================================================================
// Unit Tests
// =============================================================================
