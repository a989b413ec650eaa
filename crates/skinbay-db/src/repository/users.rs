//! # User Repository
//!
//! The identity collaborator: account lookup and balance mutation.
//!
//! Balances only move through [`debit_in`] and [`credit_in`], always inside
//! the caller's transaction. The debit is a conditional `UPDATE` on
//! `balance_cents >= amount`, so two concurrent spends can never overdraw.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use skinbay_core::validation::{validate_credit, validate_nickname};
use skinbay_core::{CoreError, Money, User};

use crate::error::{DbError, MarketResult};

const USER_COLUMNS: &str = "id, nickname, balance_cents, created_at";

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user with an opening balance.
    pub async fn create(&self, nickname: &str, opening_balance: Money) -> MarketResult<User> {
        validate_nickname(nickname)?;
        if !opening_balance.is_zero() {
            validate_credit(opening_balance)?;
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            nickname: nickname.trim().to_string(),
            balance_cents: opening_balance.cents(),
            created_at: Utc::now(),
        };

        debug!(id = %user.id, nickname = %user.nickname, "Creating user");

        sqlx::query(
            "INSERT INTO users (id, nickname, balance_cents, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&user.id)
        .bind(&user.nickname)
        .bind(user.balance_cents)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> MarketResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, user_id).await
    }

    /// Resolves the caller of an operation.
    ///
    /// An unknown caller is an authentication problem, not a missing
    /// resource.
    pub async fn require_user(&self, user_id: &str) -> MarketResult<User> {
        self.get(user_id)
            .await?
            .ok_or_else(|| CoreError::unauthorized("Unknown user").into())
    }

    /// Tops up a balance.
    pub async fn credit(&self, user_id: &str, amount: Money) -> MarketResult<User> {
        validate_credit(amount)?;

        let mut tx = self.pool.begin().await?;
        credit_in(&mut tx, user_id, amount).await?;
        let user = get_in(&mut tx, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        tx.commit().await?;

        debug!(user_id = %user_id, amount = %amount, balance = user.balance_cents, "Credited user");
        Ok(user)
    }
}

// =============================================================================
// In-transaction helpers
// =============================================================================

pub(crate) async fn get_in(conn: &mut SqliteConnection, user_id: &str) -> MarketResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

/// Current balance, `None` for an unknown user.
pub(crate) async fn balance_in(conn: &mut SqliteConnection, user_id: &str) -> MarketResult<Option<Money>> {
    let cents: Option<i64> = sqlx::query_scalar("SELECT balance_cents FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(cents.map(Money::from_cents))
}

/// Takes `amount` from `user_id`, failing when the balance does not cover it.
pub(crate) async fn debit_in(conn: &mut SqliteConnection, user_id: &str, amount: Money) -> MarketResult<()> {
    let result = sqlx::query(
        "UPDATE users SET balance_cents = balance_cents - ?2 WHERE id = ?1 AND balance_cents >= ?2",
    )
    .bind(user_id)
    .bind(amount.cents())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match balance_in(conn, user_id).await? {
            None => Err(CoreError::not_found("User", user_id).into()),
            Some(available) => Err(CoreError::InsufficientFunds {
                required: amount.cents(),
                available: available.cents(),
            }
            .into()),
        };
    }

    debug!(user_id = %user_id, amount = %amount, "Debited user");
    Ok(())
}

pub(crate) async fn credit_in(conn: &mut SqliteConnection, user_id: &str, amount: Money) -> MarketResult<()> {
    let result = sqlx::query("UPDATE users SET balance_cents = balance_cents + ?2 WHERE id = ?1")
        .bind(user_id)
        .bind(amount.cents())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("User", user_id).into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
