//! # Seed Data Generator
//!
//! Populates the database with a small demo marketplace for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./skinbay_dev.db
//! cargo run -p skinbay-db --bin seed
//!
//! # Specify database path
//! cargo run -p skinbay-db --bin seed -- --db ./data/market.db
//! ```
//!
//! ## Generated Data
//! - Three traders with opening balances
//! - A catalog of skins, each with a platform instant-buy price
//! - Inventory items dealt round-robin to the traders
//! - A few active sale listings and one rental listing

use std::env;

use skinbay_core::dto::{CreateRentalListingRequest, CreateSaleListingRequest, ListingFilter};
use skinbay_core::Money;
use skinbay_db::{Database, DbConfig};

/// (nickname, opening balance in cents)
const TRADERS: &[(&str, i64)] = &[("alice", 100_000), ("bob", 25_000), ("carol", 5_000)];

/// (name, collection, rarity, condition, instant price in cents)
const SKINS: &[(&str, &str, &str, &str, i64)] = &[
    ("AK-47 | Redline", "Phoenix", "Classified", "Field-Tested", 1_250),
    ("AWP | Asiimov", "Phoenix", "Covert", "Field-Tested", 7_400),
    ("M4A4 | Howl", "Huntsman", "Contraband", "Minimal Wear", 250_000),
    ("Desert Eagle | Blaze", "Dust", "Restricted", "Factory New", 36_000),
    ("Glock-18 | Water Elemental", "Breakout", "Restricted", "Field-Tested", 450),
    ("USP-S | Kill Confirmed", "Shadow", "Covert", "Well-Worn", 3_900),
    ("P250 | Sand Dune", "Dust 2", "Consumer Grade", "Battle-Scarred", 3),
    ("Karambit | Doppler", "Chroma", "Covert", "Factory New", 95_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./skinbay_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Skinbay Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./skinbay_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Skinbay Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.skins().search(&ListingFilter::default()).await?;
    if !existing.is_empty() {
        println!("⚠ Catalog already has {} skins", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut traders = Vec::with_capacity(TRADERS.len());
    for (nickname, cents) in TRADERS {
        let user = db.users().create(nickname, Money::from_cents(*cents)).await?;
        println!("  Trader {:<6} balance {}", user.nickname, user.balance());
        traders.push(user);
    }

    let mut items = Vec::with_capacity(SKINS.len());
    for (idx, (name, collection, rarity, condition, instant_cents)) in SKINS.iter().enumerate() {
        let skin = db
            .skins()
            .create(name, Some(*collection), Some(*rarity), Some(*condition))
            .await?;
        db.skins().set_instant_price(&skin.id, Money::from_cents(*instant_cents)).await?;

        let owner = &traders[idx % traders.len()];
        let item = db.inventory().grant(&owner.id, &skin.id).await?;
        items.push((owner.clone(), item, *instant_cents));
    }
    println!("✓ Granted {} inventory items", items.len());

    // Every other item goes up for sale at 110% of the instant price.
    let mut listed = 0;
    for (owner, item, instant_cents) in items.iter().step_by(2) {
        let request = CreateSaleListingRequest {
            inventory_item_id: item.id.clone(),
            price_cents: instant_cents + instant_cents / 10,
        };
        if let Err(e) = db.sale_listings().create_listing(&owner.id, &request).await {
            eprintln!("Failed to list {}: {}", item.id, e);
            continue;
        }
        listed += 1;
    }
    println!("✓ Created {} sale listings", listed);

    if let Some((owner, item, _)) = items.get(1) {
        let request = CreateRentalListingRequest {
            inventory_item_id: item.id.clone(),
            price_per_day_cents: 150,
            max_days: 14,
        };
        db.rentals().create_listing(&owner.id, &request).await?;
        println!("✓ Created 1 rental listing");
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
