//! # Settlement
//!
//! Moves money and ownership for a purchase in one transaction.
//!
//! ## Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  settle_purchase_in(conn, order, from)                                  │
//! │                                                                         │
//! │  1. buyer ≠ seller, price > 0                                           │
//! │     seller, item and price match the stored listing   (BadRequest)      │
//! │  2. buyer balance covers price       (NotFound / InsufficientFunds)     │
//! │  3. listing from ──► SOLD            (conditional; loser → Conflict)    │
//! │  4. debit buyer                      (conditional on balance)           │
//! │  5. credit seller                                                       │
//! │  6. item owner seller ──► buyer      (conditional; else Conflict)       │
//! │  7. PURCHASE transaction record                                         │
//! │  8. release sale claim                                                  │
//! │                                                                         │
//! │  Any `?` before commit drops the transaction: nothing is applied.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use skinbay_core::{
    ClaimKind, CoreError, ErrorKind, Money, SaleListingStatus, TransactionKind, TransactionRecord,
};

use crate::error::{DbError, MarketError, MarketResult};
use crate::repository::{claims, sale_listings, users};

/// Everything settlement needs to know about a purchase.
///
/// Seller, item and price must agree with the stored sale listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub buyer_id: String,
    pub seller_id: String,
    pub inventory_item_id: String,
    pub sale_listing_id: String,
    pub price: Money,
}

/// Point between settlement steps where a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(test), allow(dead_code))]
pub(crate) enum SettlementFault {
    AfterDebit,
}

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Settles a direct purchase of an ACTIVE listing.
    pub async fn settle_purchase(&self, order: &PurchaseOrder) -> MarketResult<TransactionRecord> {
        let mut tx = self.pool.begin().await?;
        let record = settle_purchase_in(&mut tx, order, SaleListingStatus::Active, Utc::now(), None).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Every record where the user paid or was paid, newest first.
    pub async fn history(&self, user_id: &str) -> MarketResult<Vec<TransactionRecord>> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, kind, amount_cents, buyer_id, seller_id, inventory_item_id, reference_id, created_at
            FROM transactions
            WHERE buyer_id = ?1 OR seller_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

// =============================================================================
// In-transaction helpers
// =============================================================================

/// Runs every settlement step on `conn`. The caller commits.
///
/// `from` is the listing status the purchase expects: ACTIVE for a direct
/// purchase, RESERVED for a cart checkout.
pub(crate) async fn settle_purchase_in(
    conn: &mut SqliteConnection,
    order: &PurchaseOrder,
    from: SaleListingStatus,
    now: DateTime<Utc>,
    fault: Option<SettlementFault>,
) -> MarketResult<TransactionRecord> {
    if order.buyer_id == order.seller_id {
        return Err(CoreError::bad_request("Buyer cannot be seller").into());
    }
    if !order.price.is_positive() {
        return Err(CoreError::bad_request("Price must be positive").into());
    }

    let listing = sale_listings::require_in(conn, &order.sale_listing_id).await?;
    if listing.seller_id != order.seller_id
        || listing.inventory_item_id != order.inventory_item_id
        || listing.price() != order.price
    {
        return Err(CoreError::bad_request("Purchase order does not match the sale listing").into());
    }

    let available = users::balance_in(conn, &order.buyer_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", &order.buyer_id))?;
    if !available.covers(order.price) {
        return Err(CoreError::InsufficientFunds {
            required: order.price.cents(),
            available: available.cents(),
        }
        .into());
    }

    sale_listings::transition_in(conn, &order.sale_listing_id, from, SaleListingStatus::Sold, now)
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::Conflict => MarketError::from(CoreError::conflict("Sale listing is no longer available")),
            _ => err,
        })?;

    users::debit_in(conn, &order.buyer_id, order.price).await?;
    if fault == Some(SettlementFault::AfterDebit) {
        return Err(DbError::Internal("injected fault after debit".to_string()).into());
    }
    users::credit_in(conn, &order.seller_id, order.price).await?;

    let transferred = sqlx::query(
        r#"
        UPDATE inventory_items SET user_id = ?3, received_at = ?4
        WHERE id = ?1 AND user_id = ?2 AND ownership_flag = 'owned'
        "#,
    )
    .bind(&order.inventory_item_id)
    .bind(&order.seller_id)
    .bind(&order.buyer_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if transferred.rows_affected() == 0 {
        return Err(CoreError::conflict("Inventory item is no longer owned by the seller").into());
    }

    let record = TransactionRecord {
        id: Uuid::new_v4().to_string(),
        kind: TransactionKind::Purchase,
        amount_cents: order.price.cents(),
        buyer_id: Some(order.buyer_id.clone()),
        seller_id: order.seller_id.clone(),
        inventory_item_id: order.inventory_item_id.clone(),
        reference_id: order.sale_listing_id.clone(),
        created_at: now,
    };
    insert_record_in(conn, &record).await?;

    claims::release_in(conn, &order.inventory_item_id, ClaimKind::Sale, &order.sale_listing_id).await?;

    info!(
        transaction_id = %record.id,
        sale_listing_id = %order.sale_listing_id,
        amount = %order.price,
        "Purchase settled"
    );
    Ok(record)
}

pub(crate) async fn insert_record_in(conn: &mut SqliteConnection, record: &TransactionRecord) -> MarketResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, kind, amount_cents, buyer_id, seller_id, inventory_item_id, reference_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&record.id)
    .bind(record.kind)
    .bind(record.amount_cents)
    .bind(&record.buyer_id)
    .bind(&record.seller_id)
    .bind(&record.inventory_item_id)
    .bind(&record.reference_id)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{balance, db, file_db, item, listing, user};
    use skinbay_core::OwnershipFlag;

    #[tokio::test]
    async fn test_purchase_round_trip() {
        let db = db().await;
        let seller = user(&db, "seller", 0).await;
        let buyer = user(&db, "buyer", 250).await;
        let item = item(&db, &seller).await;
        let listing = listing(&db, &seller, &item, 100).await;

        let record = db
            .settlement()
            .settle_purchase(&PurchaseOrder {
                buyer_id: buyer.id.clone(),
                seller_id: seller.id.clone(),
                inventory_item_id: item.id.clone(),
                sale_listing_id: listing.id.clone(),
                price: Money::from_cents(100),
            })
            .await
            .unwrap();

        assert_eq!(record.amount_cents, 100);
        assert_eq!(record.kind, TransactionKind::Purchase);
        assert_eq!(balance(&db, &buyer.id).await, 150);
        assert_eq!(balance(&db, &seller.id).await, 100);

        let moved = db.inventory().get(&item.id).await.unwrap().unwrap();
        assert_eq!(moved.user_id, buyer.id);
        assert_eq!(moved.ownership_flag, OwnershipFlag::Owned);
        assert_eq!(
            db.sale_listings().get(&listing.id).await.unwrap().unwrap().status,
            SaleListingStatus::Sold
        );
        assert!(db.claims().get(&item.id).await.unwrap().is_none());

        assert_eq!(db.settlement().history(&buyer.id).await.unwrap().len(), 1);
        assert_eq!(db.settlement().history(&seller.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_purchase_conflicts() {
        let db = db().await;
        let seller = user(&db, "seller", 0).await;
        let first = user(&db, "first", 500).await;
        let second = user(&db, "second", 500).await;
        let item = item(&db, &seller).await;
        let listing = listing(&db, &seller, &item, 100).await;

        let order = |buyer_id: &str| PurchaseOrder {
            buyer_id: buyer_id.to_string(),
            seller_id: seller.id.clone(),
            inventory_item_id: item.id.clone(),
            sale_listing_id: listing.id.clone(),
            price: Money::from_cents(100),
        };

        db.settlement().settle_purchase(&order(&first.id)).await.unwrap();
        let err = db.settlement().settle_purchase(&order(&second.id)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(balance(&db, &second.id).await, 500);
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let db = db().await;
        let seller = user(&db, "seller", 0).await;
        let buyer = user(&db, "buyer", 50).await;
        let item = item(&db, &seller).await;
        let listing = listing(&db, &seller, &item, 100).await;

        let err = db
            .settlement()
            .settle_purchase(&PurchaseOrder {
                buyer_id: buyer.id.clone(),
                seller_id: seller.id.clone(),
                inventory_item_id: item.id.clone(),
                sale_listing_id: listing.id.clone(),
                price: Money::from_cents(100),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(
            db.sale_listings().get(&listing.id).await.unwrap().unwrap().status,
            SaleListingStatus::Active
        );
    }

    #[tokio::test]
    async fn test_fault_after_debit_rolls_back() {
        let db = db().await;
        let seller = user(&db, "seller", 0).await;
        let buyer = user(&db, "buyer", 300).await;
        let item = item(&db, &seller).await;
        let listing = listing(&db, &seller, &item, 100).await;

        let order = PurchaseOrder {
            buyer_id: buyer.id.clone(),
            seller_id: seller.id.clone(),
            inventory_item_id: item.id.clone(),
            sale_listing_id: listing.id.clone(),
            price: Money::from_cents(100),
        };

        {
            let mut tx = db.pool().begin().await.unwrap();
            let err = settle_purchase_in(
                &mut tx,
                &order,
                SaleListingStatus::Active,
                Utc::now(),
                Some(SettlementFault::AfterDebit),
            )
            .await
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Internal);
            // tx dropped here without commit
        }

        assert_eq!(balance(&db, &buyer.id).await, 300);
        assert_eq!(balance(&db, &seller.id).await, 0);
        assert_eq!(db.inventory().get(&item.id).await.unwrap().unwrap().user_id, seller.id);
        assert_eq!(
            db.sale_listings().get(&listing.id).await.unwrap().unwrap().status,
            SaleListingStatus::Active
        );
        assert!(db.settlement().history(&buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_must_match_listing() {
        let db = db().await;
        let seller = user(&db, "seller", 0).await;
        let buyer = user(&db, "buyer", 1_000).await;
        let listed = item(&db, &seller).await;
        let other = item(&db, &seller).await;
        let listing = listing(&db, &seller, &listed, 500).await;

        let honest = PurchaseOrder {
            buyer_id: buyer.id.clone(),
            seller_id: seller.id.clone(),
            inventory_item_id: listed.id.clone(),
            sale_listing_id: listing.id.clone(),
            price: Money::from_cents(500),
        };
        let tampered = [
            PurchaseOrder {
                inventory_item_id: other.id.clone(),
                price: Money::from_cents(1),
                ..honest.clone()
            },
            PurchaseOrder {
                price: Money::from_cents(1),
                ..honest.clone()
            },
            PurchaseOrder {
                inventory_item_id: other.id.clone(),
                ..honest.clone()
            },
            PurchaseOrder {
                seller_id: buyer.id.clone(),
                buyer_id: seller.id.clone(),
                ..honest.clone()
            },
        ];

        for order in &tampered {
            let err = db.settlement().settle_purchase(order).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        }

        assert_eq!(balance(&db, &buyer.id).await, 1_000);
        assert_eq!(db.inventory().get(&other.id).await.unwrap().unwrap().user_id, seller.id);
        assert_eq!(
            db.sale_listings().get(&listing.id).await.unwrap().unwrap().status,
            SaleListingStatus::Active
        );
        assert_eq!(db.claims().get(&listed.id).await.unwrap().unwrap().kind, ClaimKind::Sale);
        assert!(db.availability().is_tradable(&other.id).await.unwrap());

        db.settlement().settle_purchase(&honest).await.unwrap();
        assert_eq!(balance(&db, &buyer.id).await, 500);
        assert!(db.claims().get(&listed.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_one_winner() {
        let (db, _dir) = file_db().await;
        let seller = user(&db, "seller", 0).await;

        for round in 0..10 {
            let first = user(&db, &format!("first{round}"), 500).await;
            let second = user(&db, &format!("second{round}"), 500).await;
            let item = item(&db, &seller).await;
            let listing = listing(&db, &seller, &item, 100).await;

            let order = |buyer_id: &str| PurchaseOrder {
                buyer_id: buyer_id.to_string(),
                seller_id: seller.id.clone(),
                inventory_item_id: item.id.clone(),
                sale_listing_id: listing.id.clone(),
                price: Money::from_cents(100),
            };
            let (a, b) = (order(&first.id), order(&second.id));
            let (db_a, db_b) = (db.clone(), db.clone());
            let task_a = tokio::spawn(async move { db_a.settlement().settle_purchase(&a).await });
            let task_b = tokio::spawn(async move { db_b.settlement().settle_purchase(&b).await });
            let results = [task_a.await.unwrap(), task_b.await.unwrap()];

            let winners = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(winners, 1, "round {round}");
            for result in &results {
                if let Err(err) = result {
                    assert_eq!(err.kind(), ErrorKind::Conflict, "round {round}: {err}");
                }
            }

            let spent = (500 - balance(&db, &first.id).await) + (500 - balance(&db, &second.id).await);
            assert_eq!(spent, 100, "round {round}");
        }
        assert_eq!(balance(&db, &seller.id).await, 1_000);
    }

    #[tokio::test]
    async fn test_self_purchase_rejected() {
        let db = db().await;
        let seller = user(&db, "seller", 500).await;
        let item = item(&db, &seller).await;
        let listing = listing(&db, &seller, &item, 100).await;

        let err = db
            .settlement()
            .settle_purchase(&PurchaseOrder {
                buyer_id: seller.id.clone(),
                seller_id: seller.id.clone(),
                inventory_item_id: item.id.clone(),
                sale_listing_id: listing.id.clone(),
                price: Money::from_cents(100),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Buyer cannot be seller");
    }
}
