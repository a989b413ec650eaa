//! # Inventory Repository
//!
//! Concrete skin copies and who holds them.

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use skinbay_core::dto::InventoryItemView;
use skinbay_core::{CoreError, InventoryItem, OwnershipFlag};

use crate::error::MarketResult;
use crate::repository::{availability, users};

const ITEM_COLUMNS: &str = "id, user_id, skin_id, ownership_flag, received_at";

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

/// Item row joined with its skin name.
#[derive(Debug, FromRow)]
struct NamedItemRow {
    id: String,
    user_id: String,
    skin_id: String,
    ownership_flag: OwnershipFlag,
    received_at: chrono::DateTime<Utc>,
    skin_name: String,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Puts a new copy of `skin_id` into `user_id`'s inventory.
    pub async fn grant(&self, user_id: &str, skin_id: &str) -> MarketResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        if users::get_in(&mut tx, user_id).await?.is_none() {
            return Err(CoreError::not_found("User", user_id).into());
        }
        let skin_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM skins WHERE id = ?1")
            .bind(skin_id)
            .fetch_optional(&mut *tx)
            .await?;
        if skin_exists.is_none() {
            return Err(CoreError::not_found("Skin", skin_id).into());
        }

        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            skin_id: skin_id.to_string(),
            ownership_flag: OwnershipFlag::Owned,
            received_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, user_id, skin_id, ownership_flag, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&item.id)
        .bind(&item.user_id)
        .bind(&item.skin_id)
        .bind(item.ownership_flag)
        .bind(item.received_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %item.id, user_id = %user_id, skin_id = %skin_id, "Granted inventory item");
        Ok(item)
    }

    pub async fn get(&self, inventory_item_id: &str) -> MarketResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, inventory_item_id).await
    }

    /// Everything a user currently holds, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> MarketResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE user_id = ?1 AND ownership_flag = 'owned' \
             ORDER BY received_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// A user's items with skin names and a `tradable` flag.
    pub async fn user_inventory(&self, user_id: &str) -> MarketResult<Vec<InventoryItemView>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, NamedItemRow>(
            r#"
            SELECT i.id, i.user_id, i.skin_id, i.ownership_flag, i.received_at, s.name AS skin_name
            FROM inventory_items i
            JOIN skins s ON s.id = i.skin_id
            WHERE i.user_id = ?1
            ORDER BY i.received_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let busy = availability::busy_in(&mut conn, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let is_busy = busy.contains(&row.id);
                let item = InventoryItem {
                    id: row.id,
                    user_id: row.user_id,
                    skin_id: row.skin_id,
                    ownership_flag: row.ownership_flag,
                    received_at: row.received_at,
                };
                InventoryItemView::new(item, row.skin_name, is_busy)
            })
            .collect())
    }
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    inventory_item_id: &str,
) -> MarketResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1"
    ))
    .bind(inventory_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(item)
}

/// Loads an item or fails with NotFound.
pub(crate) async fn require_in(conn: &mut SqliteConnection, inventory_item_id: &str) -> MarketResult<InventoryItem> {
    get_in(conn, inventory_item_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Inventory item", inventory_item_id).into())
}
