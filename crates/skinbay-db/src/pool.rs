//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  market-daemon startup                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool settings + claim policy                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │  request handlers and the expiry sweeper share the pool        │
//! │       ▼                                                                 │
//! │  Every write runs in its own transaction; SQLite serializes writers.   │
//! │  A writer that cannot get the lock within busy_timeout sees "database  │
//! │  is locked", which surfaces as Conflict.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use skinbay_core::{DEFAULT_RESERVATION_WINDOW_SECS, MAX_CART_ITEMS};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::availability::AvailabilityRepository;
use crate::repository::carts::CartRepository;
use crate::repository::claims::ClaimRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::rentals::RentalRepository;
use crate::repository::sale_listings::SaleListingRepository;
use crate::repository::settlement::SettlementRepository;
use crate::repository::skins::SkinRepository;
use crate::repository::users::UserRepository;

// =============================================================================
// Claim Policy
// =============================================================================

/// Tunables for cart holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// How long a new hold survives. `None` means holds never expire.
    pub reservation_window: Option<chrono::Duration>,
    pub max_cart_items: usize,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        ClaimPolicy {
            reservation_window: Some(chrono::Duration::seconds(DEFAULT_RESERVATION_WINDOW_SECS)),
            max_cart_items: MAX_CART_ITEMS,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/skinbay/market.db")
///     .max_connections(8)
///     .reservation_window(Some(chrono::Duration::minutes(10)));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a writer waits for SQLite's lock before giving up.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    pub policy: ClaimPolicy,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            policy: ClaimPolicy::default(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the hold lifetime. `None` disables deadlines.
    pub fn reservation_window(mut self, window: Option<chrono::Duration>) -> Self {
        self.policy.reservation_window = window;
        self
    }

    pub fn max_cart_items(mut self, max: usize) -> Self {
        self.policy.max_cart_items = max;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each call yields an isolated database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            policy: ClaimPolicy::default(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; every repository gets its own pool handle.
///
/// ## Usage
/// ```rust,ignore
/// let view = db.carts().add_item(&buyer_id, &AddToCartRequest { sale_listing_id }).await?;
/// let receipt = db.carts().checkout_item(&buyer_id, &view.items[0].id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: ClaimPolicy,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL, NORMAL synchronous, foreign keys, busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            reservation_window_secs = config.policy.reservation_window.map(|w| w.num_seconds()),
            "Database pool created"
        );

        let db = Database {
            pool,
            policy: config.policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Raw pool, for queries not covered by a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn policy(&self) -> ClaimPolicy {
        self.policy
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn skins(&self) -> SkinRepository {
        SkinRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn claims(&self) -> ClaimRepository {
        ClaimRepository::new(self.pool.clone())
    }

    pub fn sale_listings(&self) -> SaleListingRepository {
        SaleListingRepository::new(self.pool.clone())
    }

    /// Cart holds, governed by this database's [`ClaimPolicy`].
    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone(), self.policy)
    }

    pub fn rentals(&self) -> RentalRepository {
        RentalRepository::new(self.pool.clone())
    }

    pub fn settlement(&self) -> SettlementRepository {
        SettlementRepository::new(self.pool.clone())
    }

    pub fn availability(&self) -> AvailabilityRepository {
        AvailabilityRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        a.users()
            .create("alice", skinbay_core::Money::zero())
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(b.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/market.db")
            .max_connections(10)
            .min_connections(2)
            .reservation_window(None)
            .max_cart_items(3);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.policy.reservation_window, None);
        assert_eq!(config.policy.max_cart_items, 3);
    }

    #[test]
    fn test_default_policy() {
        let policy = ClaimPolicy::default();
        assert_eq!(policy.reservation_window, Some(chrono::Duration::minutes(15)));
        assert_eq!(policy.max_cart_items, 100);
    }
}
