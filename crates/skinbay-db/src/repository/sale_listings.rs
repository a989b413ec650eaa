//! # Sale Listing Repository
//!
//! The sale listing state machine.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_listing  ─────────────► ACTIVE     + sale claim acquired       │
//! │  cancel          ACTIVE ──────► CANCELLED  + claim released            │
//! │  instant_sell    ACTIVE ──────► INSTANT_SALE                           │
//! │                                 + seller credited at platform price    │
//! │                                 + item SOLD_TO_PLATFORM                │
//! │                                 + claim released                       │
//! │                                                                         │
//! │  RESERVED / SOLD are driven by carts.rs and settlement.rs.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is a conditional `UPDATE ... WHERE status = 'active'`.
//! Zero affected rows means another writer moved the listing first.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use skinbay_core::dto::{CreateSaleListingRequest, ListingFilter};
use skinbay_core::lifecycle::{ensure_cancellable, ensure_instant_sellable, ensure_item_owned};
use skinbay_core::{
    ClaimKind, CoreError, Money, SaleListing, SaleListingStatus, TransactionKind, TransactionRecord,
};

use crate::error::{MarketError, MarketResult};
use crate::repository::{claims, inventory, settlement, skins, users};

const LISTING_COLUMNS: &str =
    "sl.id, sl.inventory_item_id, sl.seller_id, sl.price_cents, sl.status, sl.created_at, sl.updated_at";

#[derive(Debug, Clone)]
pub struct SaleListingRepository {
    pool: SqlitePool,
}

impl SaleListingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleListingRepository { pool }
    }

    /// Lists an owned, unclaimed item for sale.
    ///
    /// ## Rejections
    /// - invalid price or id → BadRequest
    /// - unknown seller or item → NotFound
    /// - item not owned by the seller → BadRequest
    /// - item already in a live sale listing, a rental listing, or a cart → BadRequest
    pub async fn create_listing(
        &self,
        seller_id: &str,
        request: &CreateSaleListingRequest,
    ) -> MarketResult<SaleListing> {
        request.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if users::get_in(&mut tx, seller_id).await?.is_none() {
            return Err(CoreError::not_found("User", seller_id).into());
        }
        let item = inventory::require_in(&mut tx, &request.inventory_item_id).await?;
        ensure_item_owned(&item, seller_id)?;

        if live_listing_for_item_in(&mut tx, &item.id).await?.is_some() {
            return Err(CoreError::bad_request("Inventory item is already in sale listing").into());
        }
        if rental_listed_in(&mut tx, &item.id).await? {
            return Err(CoreError::bad_request("Inventory item is already in rental listing").into());
        }
        if held_in_cart_in(&mut tx, &item.id).await? {
            return Err(CoreError::bad_request("Inventory item is reserved in a cart").into());
        }

        let listing = SaleListing {
            id: Uuid::new_v4().to_string(),
            inventory_item_id: item.id.clone(),
            seller_id: seller_id.to_string(),
            price_cents: request.price_cents,
            status: SaleListingStatus::Active,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sale_listings (
                id, inventory_item_id, seller_id, price_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.inventory_item_id)
        .bind(&listing.seller_id)
        .bind(listing.price_cents)
        .bind(listing.status)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| MarketError::from(e).or_conflict("Inventory item is already in sale listing"))?;

        claims::acquire_in(&mut tx, &item.id, ClaimKind::Sale, &listing.id, now).await?;

        tx.commit().await?;

        info!(
            listing_id = %listing.id,
            inventory_item_id = %listing.inventory_item_id,
            price = %listing.price(),
            "Sale listing created"
        );
        Ok(listing)
    }

    pub async fn get(&self, listing_id: &str) -> MarketResult<Option<SaleListing>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, listing_id).await
    }

    /// Withdraws an ACTIVE listing.
    pub async fn cancel(&self, seller_id: &str, listing_id: &str) -> MarketResult<SaleListing> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let listing = require_in(&mut tx, listing_id).await?;
        ensure_cancellable(&listing, seller_id)?;

        transition_in(&mut tx, listing_id, SaleListingStatus::Active, SaleListingStatus::Cancelled, now)
            .await?;
        claims::release_in(&mut tx, &listing.inventory_item_id, ClaimKind::Sale, listing_id).await?;

        tx.commit().await?;

        info!(listing_id = %listing_id, "Sale listing cancelled");
        Ok(SaleListing {
            status: SaleListingStatus::Cancelled,
            updated_at: now,
            ..listing
        })
    }

    /// Sells the listed item to the platform at its instant-buy price.
    ///
    /// The listing's own asking price is ignored; the seller receives the
    /// platform quote for the skin.
    pub async fn instant_sell(&self, seller_id: &str, listing_id: &str) -> MarketResult<TransactionRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let listing = require_in(&mut tx, listing_id).await?;
        ensure_instant_sellable(&listing, seller_id)?;

        let item = inventory::require_in(&mut tx, &listing.inventory_item_id).await?;
        let quote = skins::instant_price_in(&mut tx, &item.skin_id)
            .await?
            .ok_or_else(|| CoreError::bad_request("No instant-buy price for this skin"))?;
        let payout = Money::from_cents(quote.price_cents);

        transition_in(&mut tx, listing_id, SaleListingStatus::Active, SaleListingStatus::InstantSale, now)
            .await?;

        let flagged = sqlx::query(
            r#"
            UPDATE inventory_items SET ownership_flag = 'sold_to_platform'
            WHERE id = ?1 AND user_id = ?2 AND ownership_flag = 'owned'
            "#,
        )
        .bind(&item.id)
        .bind(seller_id)
        .execute(&mut *tx)
        .await?;
        if flagged.rows_affected() == 0 {
            return Err(CoreError::conflict("Inventory item is no longer owned by the seller").into());
        }

        users::credit_in(&mut tx, seller_id, payout).await?;

        let record = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::InstantSale,
            amount_cents: payout.cents(),
            buyer_id: None,
            seller_id: seller_id.to_string(),
            inventory_item_id: item.id.clone(),
            reference_id: listing.id.clone(),
            created_at: now,
        };
        settlement::insert_record_in(&mut tx, &record).await?;

        claims::release_in(&mut tx, &item.id, ClaimKind::Sale, listing_id).await?;

        tx.commit().await?;

        info!(listing_id = %listing_id, payout = %payout, "Instant sale completed");
        Ok(record)
    }

    /// ACTIVE listings matching `filter`, newest first.
    pub async fn active_listings(&self, filter: &ListingFilter) -> MarketResult<Vec<SaleListing>> {
        let filter = filter.normalized()?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LISTING_COLUMNS} FROM sale_listings sl \
             JOIN inventory_items i ON i.id = sl.inventory_item_id \
             JOIN skins s ON s.id = i.skin_id \
             WHERE sl.status = 'active'"
        ));
        if let Some(owner_id) = &filter.owner_id {
            qb.push(" AND sl.seller_id = ").push_bind(owner_id.clone());
        }
        if let Some(q) = &filter.q {
            qb.push(" AND s.name LIKE ").push_bind(format!("%{}%", q));
        }
        if let Some(collection) = &filter.collection {
            qb.push(" AND s.collection = ").push_bind(collection.clone());
        }
        if let Some(rarity) = &filter.rarity {
            qb.push(" AND s.rarity = ").push_bind(rarity.clone());
        }
        if let Some(condition) = &filter.condition {
            qb.push(" AND s.condition = ").push_bind(condition.clone());
        }
        qb.push(" ORDER BY sl.created_at DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(50));

        let listings = qb.build_query_as::<SaleListing>().fetch_all(&self.pool).await?;
        Ok(listings)
    }

    /// All of a seller's listings in any status, newest first.
    pub async fn listings_by_seller(&self, seller_id: &str) -> MarketResult<Vec<SaleListing>> {
        let listings = sqlx::query_as::<_, SaleListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM sale_listings sl WHERE sl.seller_id = ?1 ORDER BY sl.created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }
}

// =============================================================================
// In-transaction helpers
// =============================================================================

pub(crate) async fn get_in(conn: &mut SqliteConnection, listing_id: &str) -> MarketResult<Option<SaleListing>> {
    let listing = sqlx::query_as::<_, SaleListing>(&format!(
        "SELECT {LISTING_COLUMNS} FROM sale_listings sl WHERE sl.id = ?1"
    ))
    .bind(listing_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(listing)
}

pub(crate) async fn require_in(conn: &mut SqliteConnection, listing_id: &str) -> MarketResult<SaleListing> {
    get_in(conn, listing_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Sale listing", listing_id).into())
}

/// Moves a listing `from → to`, failing with Conflict if it is no longer in
/// `from`.
pub(crate) async fn transition_in(
    conn: &mut SqliteConnection,
    listing_id: &str,
    from: SaleListingStatus,
    to: SaleListingStatus,
    now: DateTime<Utc>,
) -> MarketResult<()> {
    let result = sqlx::query("UPDATE sale_listings SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
        .bind(listing_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("Sale listing was modified concurrently").into());
    }

    debug!(listing_id = %listing_id, from = ?from, to = ?to, "Sale listing transition");
    Ok(())
}

async fn live_listing_for_item_in(
    conn: &mut SqliteConnection,
    inventory_item_id: &str,
) -> MarketResult<Option<String>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM sale_listings WHERE inventory_item_id = ?1 AND status IN ('active', 'reserved')",
    )
    .bind(inventory_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

async fn rental_listed_in(conn: &mut SqliteConnection, inventory_item_id: &str) -> MarketResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM rental_listings WHERE inventory_item_id = ?1 AND withdrawn_at IS NULL",
    )
    .bind(inventory_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

async fn held_in_cart_in(conn: &mut SqliteConnection, inventory_item_id: &str) -> MarketResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM cart_items ci
        JOIN sale_listings sl ON sl.id = ci.sale_listing_id
        WHERE sl.inventory_item_id = ?1 AND ci.item_status IN ('active', 'reserved')
        "#,
    )
    .bind(inventory_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

// =============================================================================
// Unit Tests
// =============================================================================
