//! Fixtures shared by the repository tests.

use skinbay_core::dto::CreateSaleListingRequest;
use skinbay_core::{InventoryItem, Money, SaleListing, User};

use crate::pool::{Database, DbConfig};

pub(crate) async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A database file with several pooled connections, so concurrent
/// transactions really overlap. Keep the `TempDir` alive for the test.
pub(crate) async fn file_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("market.db")).max_connections(8);
    (Database::new(config).await.unwrap(), dir)
}

pub(crate) async fn user(db: &Database, nickname: &str, cents: i64) -> User {
    db.users().create(nickname, Money::from_cents(cents)).await.unwrap()
}

/// Grants `owner` a fresh copy of a new skin.
pub(crate) async fn item(db: &Database, owner: &User) -> InventoryItem {
    let skin = db
        .skins()
        .create("AK-47 | Redline", Some("Phoenix"), Some("Classified"), Some("Field-Tested"))
        .await
        .unwrap();
    db.inventory().grant(&owner.id, &skin.id).await.unwrap()
}

pub(crate) async fn listing(db: &Database, seller: &User, item: &InventoryItem, cents: i64) -> SaleListing {
    db.sale_listings()
        .create_listing(
            &seller.id,
            &CreateSaleListingRequest {
                inventory_item_id: item.id.clone(),
                price_cents: cents,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn balance(db: &Database, user_id: &str) -> i64 {
    db.users().get(user_id).await.unwrap().unwrap().balance_cents
}
