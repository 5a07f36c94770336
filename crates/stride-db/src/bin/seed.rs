//! # Seed Data Generator
//!
//! Populates the database with sample shoes and vouchers for development.
//!
//! ## Usage
//! ```bash
//! # 60 products (default)
//! cargo run -p stride-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p stride-db --bin seed -- --count 200 --db ./data/stride.db
//! ```
//!
//! ## Generated Data
//! - Products cycle through brands, models, sizes and condition scores.
//!   Prices scale with condition; every seventh listing is featured.
//! - Vouchers: `WELCOME10` (10%, capped), `FLAT500` (fixed, minimum order),
//!   `EXPIRED20` (already expired, for testing the rejection path).

use chrono::{Duration, Utc};
use std::env;
use stride_core::types::condition_label;
use stride_core::validation::slugify;
use stride_core::{DiscountType, Product, Voucher};
use stride_db::{Database, DbConfig};
use uuid::Uuid;

/// Brand and models for realistic listings.
const MODELS: &[(&str, &[&str])] = &[
    ("Nike", &["Air Max 90", "Air Force 1", "Dunk Low", "Blazer Mid", "Pegasus 39"]),
    ("Adidas", &["Samba OG", "Stan Smith", "Ultraboost 22", "Gazelle", "Forum Low"]),
    ("New Balance", &["550", "574", "990v5", "2002R"]),
    ("Asics", &["Gel-Kayano 14", "Gel-Lyte III", "GT-2160"]),
    ("Puma", &["Suede Classic", "RS-X", "Palermo"]),
    ("Vans", &["Old Skool", "Sk8-Hi", "Authentic"]),
    ("Converse", &["Chuck 70 Hi", "Run Star Hike"]),
];

const SIZES: &[&str] = &["UK 6", "UK 7", "UK 8", "UK 9", "UK 10", "UK 11"];

/// Condition scores, weighted towards the good end like real resale stock.
const CONDITIONS: &[i64] = &[10, 9, 9, 8, 8, 8, 7, 7, 6, 5, 4];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./stride.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stride Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./stride.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stride Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for seed in 0..count {
        let product = generate_product(seed);

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.slug, e);
            continue;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} products...", generated);
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    println!();
    println!("Generating vouchers...");
    for voucher in sample_vouchers() {
        match db.vouchers().insert(&voucher).await {
            Ok(()) => println!("  {}", voucher.code),
            Err(e) => eprintln!("Failed to insert voucher {}: {}", voucher.code, e),
        }
    }

    println!();
    println!("Brands: {}", db.products().brands().await?.join(", "));
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single listing with realistic data.
fn generate_product(seed: usize) -> Product {
    let now = Utc::now();

    let (brand, models) = MODELS[seed % MODELS.len()];
    let model = models[(seed / MODELS.len()) % models.len()];
    let size = SIZES[(seed * 7) % SIZES.len()];
    let condition = CONDITIONS[(seed * 3) % CONDITIONS.len()];

    // Retail 15,000 - 45,000; resale 40-95% of retail depending on condition
    let retail_cents = (15_000 + ((seed * 1_370) % 30_000) as i64) * 100;
    let price_cents = retail_cents * (condition * 10 - 5).clamp(40, 95) / 100;

    let name = format!("{} {}", brand, model);
    let slug = format!("{}-{}-{}", slugify(&name), slugify(size), seed + 1);

    Product {
        id: Uuid::new_v4().to_string(),
        slug: slug.clone(),
        name,
        brand: brand.to_string(),
        size: size.to_string(),
        description: Some(format!(
            "Pre-owned {} {} in {} condition. Cleaned and inspected.",
            brand,
            model,
            condition_label(condition).to_lowercase()
        )),
        price_cents,
        original_price_cents: Some(retail_cents),
        condition_score: condition,
        condition_label: condition_label(condition).to_string(),
        stock: if seed % 11 == 0 { 0 } else { 1 + (seed % 2) as i64 },
        images: vec![
            format!("https://images.stride.local/{}/1.jpg", slug),
            format!("https://images.stride.local/{}/2.jpg", slug),
        ],
        is_visible: true,
        is_featured: seed % 7 == 0,
        created_at: now - Duration::minutes(seed as i64),
        updated_at: now,
    }
}

fn sample_vouchers() -> Vec<Voucher> {
    let now = Utc::now();
    let voucher = |code: &str, discount_type: DiscountType, value: i64, min_order_cents: i64| Voucher {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        description: None,
        discount_type,
        value,
        min_order_cents,
        max_discount_cents: None,
        usage_limit: None,
        used_count: 0,
        is_active: true,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };

    let mut welcome = voucher("WELCOME10", DiscountType::Percentage, 10, 0);
    welcome.max_discount_cents = Some(300_000);
    welcome.description = Some("10% off your first pair".to_string());

    let mut flat = voucher("FLAT500", DiscountType::Fixed, 50_000, 1_000_000);
    flat.usage_limit = Some(100);

    let mut expired = voucher("EXPIRED20", DiscountType::Percentage, 20, 0);
    expired.expires_at = Some(now - Duration::days(1));

    vec![welcome, flat, expired]
}
