//! # Claim Registry
//!
//! One row per claimed inventory item, keyed by the item id.
//!
//! ```text
//!   create sale listing    ──► acquire_in(item, Sale, listing_id)
//!   cancel / sell / settle ──► release_in(item, Sale, listing_id)
//!   create rental listing  ──► acquire_in(item, Rental, rental_listing_id)
//!   withdraw rental        ──► release_in(item, Rental, rental_listing_id)
//! ```
//!
//! Both calls run inside the caller's transaction, next to the write on the
//! listing table. The primary key on `item_claims.inventory_item_id` is what
//! keeps a sale and a rental from claiming the same item concurrently.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use skinbay_core::{ClaimKind, CoreError, ItemClaim};

use crate::error::MarketResult;

#[derive(Debug, Clone)]
pub struct ClaimRepository {
    pool: SqlitePool,
}

impl ClaimRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClaimRepository { pool }
    }

    /// The outstanding claim on an item, if any.
    pub async fn get(&self, inventory_item_id: &str) -> MarketResult<Option<ItemClaim>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, inventory_item_id).await
    }
}

pub(crate) async fn get_in(conn: &mut SqliteConnection, inventory_item_id: &str) -> MarketResult<Option<ItemClaim>> {
    let claim = sqlx::query_as::<_, ItemClaim>(
        "SELECT inventory_item_id, kind, reference_id, claimed_at FROM item_claims WHERE inventory_item_id = ?1",
    )
    .bind(inventory_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(claim)
}

/// Claims `inventory_item_id` for `reference_id`.
///
/// Fails with BadRequest when another claim is visible, and with Conflict
/// when a concurrent writer wins the primary key.
pub(crate) async fn acquire_in(
    conn: &mut SqliteConnection,
    inventory_item_id: &str,
    kind: ClaimKind,
    reference_id: &str,
    now: DateTime<Utc>,
) -> MarketResult<()> {
    if let Some(existing) = get_in(conn, inventory_item_id).await? {
        return Err(CoreError::bad_request(format!(
            "Inventory item is already claimed by a {} listing",
            existing.kind
        ))
        .into());
    }

    sqlx::query(
        "INSERT INTO item_claims (inventory_item_id, kind, reference_id, claimed_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(inventory_item_id)
    .bind(kind)
    .bind(reference_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| crate::error::MarketError::from(e).or_conflict("Inventory item was claimed concurrently"))?;

    debug!(inventory_item_id = %inventory_item_id, kind = %kind, reference_id = %reference_id, "Claim acquired");
    Ok(())
}

/// Drops the claim if `reference_id` still holds it. Returns whether a row
/// was removed.
pub(crate) async fn release_in(
    conn: &mut SqliteConnection,
    inventory_item_id: &str,
    kind: ClaimKind,
    reference_id: &str,
) -> MarketResult<bool> {
    let result = sqlx::query(
        "DELETE FROM item_claims WHERE inventory_item_id = ?1 AND kind = ?2 AND reference_id = ?3",
    )
    .bind(inventory_item_id)
    .bind(kind)
    .bind(reference_id)
    .execute(&mut *conn)
    .await?;

    let released = result.rows_affected() > 0;
    debug!(inventory_item_id = %inventory_item_id, kind = %kind, released, "Claim released");
    Ok(released)
}
