//! # Skin Repository
//!
//! Catalog entries and the platform's instant-buy quotes.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use skinbay_core::dto::ListingFilter;
use skinbay_core::validation::validate_price;
use skinbay_core::{CoreError, InstantBuyPrice, Money, Skin};

use crate::error::MarketResult;

#[derive(Debug, Clone)]
pub struct SkinRepository {
    pool: SqlitePool,
}

impl SkinRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SkinRepository { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        collection: Option<&str>,
        rarity: Option<&str>,
        condition: Option<&str>,
    ) -> MarketResult<Skin> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::bad_request("Skin name is required").into());
        }

        let skin = Skin {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            collection: collection.map(str::to_string),
            rarity: rarity.map(str::to_string),
            condition: condition.map(str::to_string),
        };

        sqlx::query(
            "INSERT INTO skins (id, name, collection, rarity, condition) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&skin.id)
        .bind(&skin.name)
        .bind(&skin.collection)
        .bind(&skin.rarity)
        .bind(&skin.condition)
        .execute(&self.pool)
        .await?;

        debug!(id = %skin.id, name = %skin.name, "Created skin");
        Ok(skin)
    }

    pub async fn get(&self, skin_id: &str) -> MarketResult<Option<Skin>> {
        let skin = sqlx::query_as::<_, Skin>(
            "SELECT id, name, collection, rarity, condition FROM skins WHERE id = ?1",
        )
        .bind(skin_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(skin)
    }

    /// Catalog search using the name/collection/rarity/condition facets of
    /// `filter`. The owner facet does not apply to the catalog.
    pub async fn search(&self, filter: &ListingFilter) -> MarketResult<Vec<Skin>> {
        let filter = filter.normalized()?;

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, name, collection, rarity, condition FROM skins WHERE 1 = 1");
        if let Some(q) = &filter.q {
            qb.push(" AND name LIKE ").push_bind(format!("%{}%", q));
        }
        if let Some(collection) = &filter.collection {
            qb.push(" AND collection = ").push_bind(collection.clone());
        }
        if let Some(rarity) = &filter.rarity {
            qb.push(" AND rarity = ").push_bind(rarity.clone());
        }
        if let Some(condition) = &filter.condition {
            qb.push(" AND condition = ").push_bind(condition.clone());
        }
        qb.push(" ORDER BY name LIMIT ").push_bind(filter.limit.unwrap_or(50));

        let skins = qb.build_query_as::<Skin>().fetch_all(&self.pool).await?;
        Ok(skins)
    }

    /// Sets (or replaces) the platform's instant-buy price for a skin.
    pub async fn set_instant_price(&self, skin_id: &str, price: Money) -> MarketResult<InstantBuyPrice> {
        validate_price("instantPrice", price)?;

        if self.get(skin_id).await?.is_none() {
            return Err(CoreError::not_found("Skin", skin_id).into());
        }

        let quote = InstantBuyPrice {
            skin_id: skin_id.to_string(),
            price_cents: price.cents(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO instant_buy_prices (skin_id, price_cents, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(skin_id) DO UPDATE SET
                price_cents = excluded.price_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&quote.skin_id)
        .bind(quote.price_cents)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(skin_id = %skin_id, price = %price, "Set instant-buy price");
        Ok(quote)
    }

    pub async fn instant_price(&self, skin_id: &str) -> MarketResult<Option<InstantBuyPrice>> {
        let mut conn = self.pool.acquire().await?;
        instant_price_in(&mut conn, skin_id).await
    }
}

pub(crate) async fn instant_price_in(
    conn: &mut SqliteConnection,
    skin_id: &str,
) -> MarketResult<Option<InstantBuyPrice>> {
    let quote = sqlx::query_as::<_, InstantBuyPrice>(
        "SELECT skin_id, price_cents, updated_at FROM instant_buy_prices WHERE skin_id = ?1",
    )
    .bind(skin_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(quote)
}
