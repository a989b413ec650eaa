//! # Rental Repository
//!
//! Rental listings and time-bounded rental contracts.
//!
//! ## Contract States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   rent ──► ACTIVE ──┬── end_at passed (sweeper) ──► EXPIRED             │
//! │                     └── end_contract (renter)   ──► RETURNED            │
//! │                                                                         │
//! │   One ACTIVE contract per listing: uq_rental_contracts_active_listing.  │
//! │   The listing keeps its rental claim until withdrawn.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `rent` reports expected failures as a [`RentOutcome`] instead of an
//! error; only an invalid day count is a hard error.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use skinbay_core::dto::{CreateRentalListingRequest, RentRequest};
use skinbay_core::lifecycle::{ensure_contract_endable, ensure_item_owned};
use skinbay_core::rental::{contract_end, quote_rental, validate_rental_days, RentalQuote};
use skinbay_core::{
    ClaimKind, CoreError, ErrorKind, Money, RentFailure, RentOutcome, RentalContract, RentalContractStatus,
    RentalListing, TransactionKind, TransactionRecord, MAX_RENTAL_DAYS,
};

use crate::error::{MarketError, MarketResult};
use crate::repository::{claims, inventory, settlement, users};

const LISTING_COLUMNS: &str = "id, inventory_item_id, owner_id, price_per_day_cents, max_days, created_at";
const CONTRACT_COLUMNS: &str =
    "id, rental_listing_id, renter_id, days, total_cost_cents, status, start_at, end_at, closed_at";

#[derive(Debug, Clone)]
pub struct RentalRepository {
    pool: SqlitePool,
}

impl RentalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RentalRepository { pool }
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Offers an owned, unclaimed item for rent.
    pub async fn create_listing(
        &self,
        owner_id: &str,
        request: &CreateRentalListingRequest,
    ) -> MarketResult<RentalListing> {
        request.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if users::get_in(&mut tx, owner_id).await?.is_none() {
            return Err(CoreError::not_found("User", owner_id).into());
        }
        let item = inventory::require_in(&mut tx, &request.inventory_item_id).await?;
        ensure_item_owned(&item, owner_id)?;

        if let Some(claim) = claims::get_in(&mut tx, &item.id).await? {
            let message = match claim.kind {
                ClaimKind::Sale => "Inventory item is already in sale listing",
                ClaimKind::Rental => "Inventory item is already in rental listing",
            };
            return Err(CoreError::bad_request(message).into());
        }

        let listing = RentalListing {
            id: Uuid::new_v4().to_string(),
            inventory_item_id: item.id.clone(),
            owner_id: owner_id.to_string(),
            price_per_day_cents: request.price_per_day_cents,
            max_days: request.max_days,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO rental_listings (
                id, inventory_item_id, owner_id, price_per_day_cents, max_days, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.inventory_item_id)
        .bind(&listing.owner_id)
        .bind(listing.price_per_day_cents)
        .bind(listing.max_days)
        .bind(listing.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| MarketError::from(e).or_conflict("Inventory item is already in rental listing"))?;

        claims::acquire_in(&mut tx, &item.id, ClaimKind::Rental, &listing.id, now).await?;

        tx.commit().await?;

        info!(
            rental_listing_id = %listing.id,
            inventory_item_id = %listing.inventory_item_id,
            price_per_day = %listing.price_per_day(),
            max_days = listing.max_days,
            "Rental listing created"
        );
        Ok(listing)
    }

    /// Takes a listing off the market. Refused while a contract is running.
    pub async fn withdraw_listing(&self, owner_id: &str, rental_listing_id: &str) -> MarketResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let listing = require_listing_in(&mut tx, rental_listing_id).await?;
        if listing.owner_id != owner_id {
            return Err(CoreError::unauthorized("Rental listing does not belong to this user").into());
        }
        if active_contract_in(&mut tx, rental_listing_id).await?.is_some() {
            return Err(CoreError::bad_request("Rental listing has an active contract").into());
        }

        let result = sqlx::query(
            "UPDATE rental_listings SET withdrawn_at = ?2 WHERE id = ?1 AND withdrawn_at IS NULL",
        )
        .bind(rental_listing_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::conflict("Rental listing was modified concurrently").into());
        }

        claims::release_in(&mut tx, &listing.inventory_item_id, ClaimKind::Rental, rental_listing_id).await?;

        tx.commit().await?;

        info!(rental_listing_id = %rental_listing_id, "Rental listing withdrawn");
        Ok(())
    }

    pub async fn get_listing(&self, rental_listing_id: &str) -> MarketResult<Option<RentalListing>> {
        let mut conn = self.pool.acquire().await?;
        get_listing_in(&mut conn, rental_listing_id).await
    }

    /// Listings not currently rented, optionally for one owner.
    pub async fn list_available(&self, owner_id: Option<&str>) -> MarketResult<Vec<RentalListing>> {
        let listings = sqlx::query_as::<_, RentalListing>(&format!(
            r#"
            SELECT {LISTING_COLUMNS} FROM rental_listings rl
            WHERE rl.withdrawn_at IS NULL
              AND (?1 IS NULL OR rl.owner_id = ?1)
              AND NOT EXISTS (
                  SELECT 1 FROM rental_contracts rc
                  WHERE rc.rental_listing_id = rl.id AND rc.status = 'active'
              )
            ORDER BY rl.created_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    // =========================================================================
    // Contracts
    // =========================================================================

    /// Rents a listing for `days` days.
    pub async fn rent(&self, renter_id: &str, request: &RentRequest) -> MarketResult<RentOutcome> {
        self.rent_at(renter_id, request, Utc::now()).await
    }

    /// [`rent`](Self::rent) with an explicit clock.
    ///
    /// ## Outcomes
    /// ```text
    /// days < 1 or days > max_days   → Err(BadRequest), nothing written
    /// listing missing               → failure ListingNotFound
    /// renter owns the item          → failure SelfRental
    /// contract already ACTIVE       → failure Unavailable
    /// renter missing                → failure RenterNotFound
    /// balance < cost                → failure InsufficientFunds
    /// otherwise                     → success, money moved, contract ACTIVE
    /// ```
    pub async fn rent_at(
        &self,
        renter_id: &str,
        request: &RentRequest,
        now: DateTime<Utc>,
    ) -> MarketResult<RentOutcome> {
        validate_rental_days(request.days, MAX_RENTAL_DAYS)?;

        let mut tx = self.pool.begin().await?;

        // Renters of one listing queue here, so each sees the previous
        // winner's ACTIVE contract instead of a stale snapshot.
        if let Err(err) = lock_listing_in(&mut tx, &request.rental_listing_id).await {
            return lost_race(err, &request.rental_listing_id, None);
        }

        let Some(listing) = get_listing_in(&mut tx, &request.rental_listing_id).await? else {
            return Ok(RentOutcome::failed(RentFailure::ListingNotFound, None));
        };
        let quote = quote_rental(listing.price_per_day(), listing.max_days, request.days)?;
        let cost = quote.total_cost;

        if listing.owner_id == renter_id {
            return Ok(RentOutcome::failed(RentFailure::SelfRental, Some(cost)));
        }
        if active_contract_in(&mut tx, &listing.id).await?.is_some() {
            return Ok(RentOutcome::failed(RentFailure::Unavailable, Some(cost)));
        }
        let Some(balance) = users::balance_in(&mut tx, renter_id).await? else {
            return Ok(RentOutcome::failed(RentFailure::RenterNotFound, Some(cost)));
        };
        if !balance.covers(cost) {
            return Ok(RentOutcome::failed(RentFailure::InsufficientFunds, Some(cost)));
        }

        let contract = match open_contract_in(&mut tx, &listing, renter_id, &quote, now).await {
            Ok(contract) => contract,
            Err(err) => return lost_race(err, &listing.id, Some(cost)),
        };
        if let Err(err) = tx.commit().await {
            return lost_race(err.into(), &listing.id, Some(cost));
        }

        info!(
            contract_id = %contract.id,
            rental_listing_id = %listing.id,
            days = contract.days,
            cost = %cost,
            "Rental created"
        );
        Ok(RentOutcome::succeeded(contract.id, cost))
    }

    /// Hands an item back before `end_at`. No refund.
    pub async fn end_contract(&self, renter_id: &str, contract_id: &str) -> MarketResult<RentalContract> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let contract = get_contract_in(&mut tx, contract_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Rental contract", contract_id))?;
        ensure_contract_endable(&contract, renter_id)?;

        let result = sqlx::query(
            "UPDATE rental_contracts SET status = 'returned', closed_at = ?2 WHERE id = ?1 AND status = 'active'",
        )
        .bind(contract_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::bad_request("Rental contract is not active").into());
        }

        tx.commit().await?;

        info!(contract_id = %contract_id, "Rental contract returned");
        Ok(RentalContract {
            status: RentalContractStatus::Returned,
            closed_at: Some(now),
            ..contract
        })
    }

    pub async fn get_contract(&self, contract_id: &str) -> MarketResult<Option<RentalContract>> {
        let mut conn = self.pool.acquire().await?;
        get_contract_in(&mut conn, contract_id).await
    }

    /// A renter's contracts, newest first.
    pub async fn contracts_for_renter(&self, renter_id: &str) -> MarketResult<Vec<RentalContract>> {
        let contracts = sqlx::query_as::<_, RentalContract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM rental_contracts WHERE renter_id = ?1 ORDER BY start_at DESC"
        ))
        .bind(renter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    /// Closes at most `limit` ACTIVE contracts whose `end_at` has passed.
    pub async fn cleanup_expired_contracts(&self, limit: i64) -> MarketResult<u64> {
        self.cleanup_expired_contracts_at(Utc::now(), limit).await
    }

    pub async fn cleanup_expired_contracts_at(&self, now: DateTime<Utc>, limit: i64) -> MarketResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE rental_contracts SET status = 'expired', closed_at = ?1
            WHERE status = 'active' AND end_at <= ?1 AND id IN (
                SELECT id FROM rental_contracts
                WHERE status = 'active' AND end_at <= ?1
                ORDER BY end_at
                LIMIT ?2
            )
            "#,
        )
        .bind(now)
        .bind(limit)
        .execute(&self.pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            debug!(expired, "Rental contracts expired");
        }
        Ok(expired)
    }
}

// =============================================================================
// In-transaction helpers
// =============================================================================

/// Storage conflicts inside `rent` mean another renter got there first.
fn lost_race(err: MarketError, rental_listing_id: &str, cost: Option<Money>) -> MarketResult<RentOutcome> {
    if err.kind() == ErrorKind::Conflict {
        warn!(rental_listing_id = %rental_listing_id, error = ?err, "Lost rent race");
        return Ok(RentOutcome::failed(RentFailure::Unavailable, cost));
    }
    Err(err)
}

/// Takes SQLite's write lock before anything is read.
async fn lock_listing_in(conn: &mut SqliteConnection, rental_listing_id: &str) -> MarketResult<()> {
    sqlx::query("UPDATE rental_listings SET id = id WHERE id = ?1")
        .bind(rental_listing_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Moves the money, writes the ACTIVE contract and its record.
async fn open_contract_in(
    conn: &mut SqliteConnection,
    listing: &RentalListing,
    renter_id: &str,
    quote: &RentalQuote,
    now: DateTime<Utc>,
) -> MarketResult<RentalContract> {
    let cost = quote.total_cost;
    users::debit_in(conn, renter_id, cost).await?;
    users::credit_in(conn, &listing.owner_id, cost).await?;

    let contract = RentalContract {
        id: Uuid::new_v4().to_string(),
        rental_listing_id: listing.id.clone(),
        renter_id: renter_id.to_string(),
        days: quote.days,
        total_cost_cents: cost.cents(),
        status: RentalContractStatus::Active,
        start_at: now,
        end_at: contract_end(now, quote.days),
        closed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO rental_contracts (
            id, rental_listing_id, renter_id, days, total_cost_cents, status, start_at, end_at, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&contract.id)
    .bind(&contract.rental_listing_id)
    .bind(&contract.renter_id)
    .bind(contract.days)
    .bind(contract.total_cost_cents)
    .bind(contract.status)
    .bind(contract.start_at)
    .bind(contract.end_at)
    .bind(contract.closed_at)
    .execute(&mut *conn)
    .await?;

    let record = TransactionRecord {
        id: Uuid::new_v4().to_string(),
        kind: TransactionKind::Rental,
        amount_cents: cost.cents(),
        buyer_id: Some(renter_id.to_string()),
        seller_id: listing.owner_id.clone(),
        inventory_item_id: listing.inventory_item_id.clone(),
        reference_id: contract.id.clone(),
        created_at: now,
    };
    settlement::insert_record_in(conn, &record).await?;

    Ok(contract)
}

/// Non-withdrawn listing by id.
async fn get_listing_in(conn: &mut SqliteConnection, rental_listing_id: &str) -> MarketResult<Option<RentalListing>> {
    let listing = sqlx::query_as::<_, RentalListing>(&format!(
        "SELECT {LISTING_COLUMNS} FROM rental_listings WHERE id = ?1 AND withdrawn_at IS NULL"
    ))
    .bind(rental_listing_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(listing)
}

async fn require_listing_in(conn: &mut SqliteConnection, rental_listing_id: &str) -> MarketResult<RentalListing> {
    get_listing_in(conn, rental_listing_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Rental listing", rental_listing_id).into())
}

async fn active_contract_in(conn: &mut SqliteConnection, rental_listing_id: &str) -> MarketResult<Option<String>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM rental_contracts WHERE rental_listing_id = ?1 AND status = 'active'",
    )
    .bind(rental_listing_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

async fn get_contract_in(conn: &mut SqliteConnection, contract_id: &str) -> MarketResult<Option<RentalContract>> {
    let contract = sqlx::query_as::<_, RentalContract>(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM rental_contracts WHERE id = ?1"
    ))
    .bind(contract_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(contract)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::pool::Database;
    use crate::repository::testing::{balance, db, file_db, item, user};
    use skinbay_core::dto::{CreateRentalListingRequest, RentRequest};
    use skinbay_core::{
        ErrorKind, InventoryItem, RentFailure, RentalContractStatus, RentalListing, TransactionKind, User,
    };

    async fn rental(db: &Database, owner: &User, item: &InventoryItem) -> RentalListing {
        db.rentals()
            .create_listing(
                &owner.id,
                &CreateRentalListingRequest {
                    inventory_item_id: item.id.clone(),
                    price_per_day_cents: 10,
                    max_days: 5,
                },
            )
            .await
            .unwrap()
    }

    fn rent(listing: &RentalListing, days: i64) -> RentRequest {
        RentRequest {
            rental_listing_id: listing.id.clone(),
            days,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rent_loser_gets_unavailable() {
        let (db, _dir) = file_db().await;
        let owner = user(&db, "owner", 0).await;

        for round in 0..20 {
            let first = user(&db, &format!("first{round}"), 100).await;
            let second = user(&db, &format!("second{round}"), 100).await;
            let item = item(&db, &owner).await;
            let listing = rental(&db, &owner, &item).await;

            let (db_a, db_b) = (db.clone(), db.clone());
            let (req_a, req_b) = (rent(&listing, 2), rent(&listing, 2));
            let (id_a, id_b) = (first.id.clone(), second.id.clone());
            let task_a = tokio::spawn(async move { db_a.rentals().rent(&id_a, &req_a).await });
            let task_b = tokio::spawn(async move { db_b.rentals().rent(&id_b, &req_b).await });

            let outcomes = [
                task_a.await.unwrap().expect("rent race must not be a hard error"),
                task_b.await.unwrap().expect("rent race must not be a hard error"),
            ];
            assert_eq!(outcomes.iter().filter(|o| o.success).count(), 1, "round {round}");
            let loser = outcomes.iter().find(|o| !o.success).unwrap();
            assert_eq!(loser.failure, Some(RentFailure::Unavailable), "round {round}");

            let spent = (100 - balance(&db, &first.id).await) + (100 - balance(&db, &second.id).await);
            assert_eq!(spent, 20, "round {round}");
        }
        assert_eq!(balance(&db, &owner.id).await, 400);
    }

    #[tokio::test]
    async fn test_rent_scenario() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 50).await;
        let item = item(&db, &owner).await;
        let listing = rental(&db, &owner, &item).await;
        let now = Utc::now();

        let outcome = db.rentals().rent_at(&renter.id, &rent(&listing, 3), now).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, "Rental created");
        assert_eq!(outcome.total_cost_cents, Some(30));
        assert_eq!(balance(&db, &renter.id).await, 20);
        assert_eq!(balance(&db, &owner.id).await, 30);

        let contract_id = outcome.contract_id.unwrap();
        let contract = db.rentals().get_contract(&contract_id).await.unwrap().unwrap();
        assert_eq!(contract.status, RentalContractStatus::Active);
        assert_eq!(contract.end_at, now + Duration::days(3));

        let history = db.settlement().history(&renter.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Rental);
        assert_eq!(history[0].reference_id, contract_id);
    }

    #[tokio::test]
    async fn test_rent_over_max_days_is_hard_error() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 500).await;
        let listing = rental(&db, &owner, &item(&db, &owner).await).await;

        let err = db.rentals().rent(&renter.id, &rent(&listing, 6)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = db.rentals().rent(&renter.id, &rent(&listing, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        assert_eq!(balance(&db, &renter.id).await, 500);
        assert_eq!(balance(&db, &owner.id).await, 0);
        assert!(db.rentals().contracts_for_renter(&renter.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rent_failure_outcomes() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 100).await;
        let poor = user(&db, "poor", 5).await;
        let listing = rental(&db, &owner, &item(&db, &owner).await).await;

        let missing = RentRequest {
            rental_listing_id: uuid::Uuid::new_v4().to_string(),
            days: 1,
        };
        let outcome = db.rentals().rent(&renter.id, &missing).await.unwrap();
        assert_eq!(outcome.failure, Some(RentFailure::ListingNotFound));
        assert_eq!(outcome.kind(), Some(ErrorKind::NotFound));

        let outcome = db.rentals().rent(&owner.id, &rent(&listing, 1)).await.unwrap();
        assert_eq!(outcome.failure, Some(RentFailure::SelfRental));

        let outcome = db.rentals().rent(&poor.id, &rent(&listing, 1)).await.unwrap();
        assert_eq!(outcome.failure, Some(RentFailure::InsufficientFunds));
        assert_eq!(outcome.total_cost_cents, Some(10));
        assert_eq!(balance(&db, &poor.id).await, 5);

        let outcome = db
            .rentals()
            .rent(&uuid::Uuid::new_v4().to_string(), &rent(&listing, 1))
            .await
            .unwrap();
        assert_eq!(outcome.failure, Some(RentFailure::RenterNotFound));

        assert!(db.rentals().rent(&renter.id, &rent(&listing, 2)).await.unwrap().success);
        let outcome = db.rentals().rent(&poor.id, &rent(&listing, 1)).await.unwrap();
        assert_eq!(outcome.failure, Some(RentFailure::Unavailable));
        assert_eq!(outcome.message, "Item is already rented");
    }

    #[tokio::test]
    async fn test_rental_listing_claims_item() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let other = user(&db, "other", 0).await;
        let item = item(&db, &owner).await;

        let request = CreateRentalListingRequest {
            inventory_item_id: item.id.clone(),
            price_per_day_cents: 10,
            max_days: 5,
        };

        let err = db.rentals().create_listing(&other.id, &request).await.unwrap_err();
        assert_eq!(err.to_string(), "Inventory item is not owned");

        let invalid = CreateRentalListingRequest {
            max_days: 366,
            ..request.clone()
        };
        assert_eq!(
            db.rentals().create_listing(&owner.id, &invalid).await.unwrap_err().kind(),
            ErrorKind::BadRequest
        );

        rental(&db, &owner, &item).await;
        let err = db.rentals().create_listing(&owner.id, &request).await.unwrap_err();
        assert_eq!(err.to_string(), "Inventory item is already in rental listing");

        let err = db
            .sale_listings()
            .create_listing(
                &owner.id,
                &skinbay_core::dto::CreateSaleListingRequest {
                    inventory_item_id: item.id.clone(),
                    price_cents: 100,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_withdraw_listing() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 100).await;
        let item = item(&db, &owner).await;
        let listing = rental(&db, &owner, &item).await;

        let err = db.rentals().withdraw_listing(&renter.id, &listing.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let outcome = db.rentals().rent(&renter.id, &rent(&listing, 1)).await.unwrap();
        let err = db.rentals().withdraw_listing(&owner.id, &listing.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Rental listing has an active contract");

        db.rentals()
            .end_contract(&renter.id, &outcome.contract_id.unwrap())
            .await
            .unwrap();
        db.rentals().withdraw_listing(&owner.id, &listing.id).await.unwrap();

        assert!(db.rentals().get_listing(&listing.id).await.unwrap().is_none());
        assert!(db.claims().get(&item.id).await.unwrap().is_none());
        assert!(db.availability().is_tradable(&item.id).await.unwrap());

        // Re-listable after withdrawal.
        rental(&db, &owner, &item).await;
    }

    #[tokio::test]
    async fn test_end_contract() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 100).await;
        let listing = rental(&db, &owner, &item(&db, &owner).await).await;

        let contract_id = db
            .rentals()
            .rent(&renter.id, &rent(&listing, 2))
            .await
            .unwrap()
            .contract_id
            .unwrap();

        let err = db.rentals().end_contract(&owner.id, &contract_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let returned = db.rentals().end_contract(&renter.id, &contract_id).await.unwrap();
        assert_eq!(returned.status, RentalContractStatus::Returned);
        assert!(returned.closed_at.is_some());
        assert_eq!(balance(&db, &renter.id).await, 80);

        let err = db.rentals().end_contract(&renter.id, &contract_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // Rentable again.
        assert_eq!(db.rentals().list_available(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired_contracts() {
        let db = db().await;
        let owner = user(&db, "owner", 0).await;
        let renter = user(&db, "renter", 100).await;
        let listing = rental(&db, &owner, &item(&db, &owner).await).await;
        let now = Utc::now();

        db.rentals().rent_at(&renter.id, &rent(&listing, 1), now).await.unwrap();
        assert!(db.rentals().list_available(Some(&owner.id)).await.unwrap().is_empty());

        let rentals = db.rentals();
        assert_eq!(rentals.cleanup_expired_contracts_at(now, 100).await.unwrap(), 0);

        let later = now + Duration::days(1);
        assert_eq!(rentals.cleanup_expired_contracts_at(later, 100).await.unwrap(), 1);
        assert_eq!(rentals.cleanup_expired_contracts_at(later, 100).await.unwrap(), 0);

        let contracts = rentals.contracts_for_renter(&renter.id).await.unwrap();
        assert_eq!(contracts[0].status, RentalContractStatus::Expired);
        assert_eq!(rentals.list_available(Some(&owner.id)).await.unwrap().len(), 1);
    }
}
