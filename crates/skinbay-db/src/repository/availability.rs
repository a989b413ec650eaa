//! # Availability Aggregator
//!
//! Answers "which of these items are busy?" for inventory screens.
//!
//! ## Busy Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  busy(item) = item appears in ANY of                                    │
//! │                                                                         │
//! │    sale_listings   status IN (active, reserved)                         │
//! │    rental_listings withdrawn_at IS NULL                                 │
//! │    cart_items      item_status IN (active, reserved)  (via its listing) │
//! │    item_claims     any row                                              │
//! │                                                                         │
//! │  tradable(item) = ownership_flag = owned AND NOT busy(item)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `item_claims` enforces exclusivity; the other sources are read so
//! the view matches the listing and hold tables row for row.

use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use skinbay_core::OwnershipFlag;

use crate::error::MarketResult;
use crate::repository::inventory;

/// Candidates per query; each appears four times in the statement.
const CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct AvailabilityRepository {
    pool: SqlitePool,
}

impl AvailabilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityRepository { pool }
    }

    /// Subset of `candidate_ids` that is currently claimed.
    pub async fn busy_inventory_item_ids(&self, candidate_ids: &[String]) -> MarketResult<HashSet<String>> {
        let mut conn = self.pool.acquire().await?;
        busy_in(&mut conn, candidate_ids).await
    }

    /// OWNED and not busy. Unknown items are not tradable.
    pub async fn is_tradable(&self, inventory_item_id: &str) -> MarketResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let Some(item) = inventory::get_in(&mut conn, inventory_item_id).await? else {
            return Ok(false);
        };
        if item.ownership_flag != OwnershipFlag::Owned {
            return Ok(false);
        }
        let busy = busy_in(&mut conn, std::slice::from_ref(&item.id)).await?;
        Ok(busy.is_empty())
    }
}

pub(crate) async fn busy_in(conn: &mut SqliteConnection, candidate_ids: &[String]) -> MarketResult<HashSet<String>> {
    let mut busy = HashSet::new();

    for chunk in candidate_ids.chunks(CHUNK_SIZE) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT inventory_item_id FROM sale_listings \
             WHERE status IN ('active', 'reserved') AND inventory_item_id IN ",
        );
        push_id_list(&mut qb, chunk);

        qb.push(
            " UNION SELECT inventory_item_id FROM rental_listings \
              WHERE withdrawn_at IS NULL AND inventory_item_id IN ",
        );
        push_id_list(&mut qb, chunk);

        qb.push(
            " UNION SELECT sl.inventory_item_id FROM cart_items ci \
              JOIN sale_listings sl ON sl.id = ci.sale_listing_id \
              WHERE ci.item_status IN ('active', 'reserved') AND sl.inventory_item_id IN ",
        );
        push_id_list(&mut qb, chunk);

        qb.push(" UNION SELECT inventory_item_id FROM item_claims WHERE inventory_item_id IN ");
        push_id_list(&mut qb, chunk);

        let ids: Vec<String> = qb.build_query_scalar::<String>().fetch_all(&mut *conn).await?;
        busy.extend(ids);
    }

    Ok(busy)
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}
