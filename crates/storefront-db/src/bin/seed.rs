//! # Seed Data Generator
//!
//! Populates the document store with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./storefront_dev.db with the default catalog
//! cargo run -p storefront-db --bin seed
//!
//! # More reviews per product, custom database path
//! cargo run -p storefront-db --bin seed -- --reviews 12 --db ./data/catalog.db
//! ```
//!
//! ## Generated Data
//! - Products across Fashion, Home and Beauty, each with a subcategory,
//!   tags and every fourth one flagged top-selling
//! - Reviews with deterministic scores (1 to 5)
//! - A few combos over the generated products
//!
//! Ratings are left at zero; run `catalog-admin recompute-ratings` after
//! seeding to fill them in.

use chrono::{Duration, Utc};
use clap::Parser;
use storefront_core::{Combo, ComboSelection, Product, Rating, Review, SuggestedCombination};
use storefront_db::{Database, DbConfig};

/// Category → subcategory → (product names, tags)
const CATALOG: &[(&str, &[(&str, &[&str], &[&str])])] = &[
    (
        "Fashion",
        &[
            (
                "Shirts",
                &["Linen Tee", "Oxford Shirt", "Camp Collar Shirt", "Henley"],
                &["summer", "linen", "casual"],
            ),
            (
                "Pants",
                &["Chino", "Linen Trouser", "Cargo Pant"],
                &["summer", "linen", "workwear"],
            ),
        ],
    ),
    (
        "Home",
        &[
            (
                "Decor",
                &["Ceramic Vase", "Wool Throw", "Table Lamp"],
                &["cozy", "ceramic", "gift"],
            ),
            (
                "Kitchen",
                &["Stoneware Mug", "Chef Knife", "Olive Board"],
                &["ceramic", "gift", "cooking"],
            ),
        ],
    ),
    (
        "Beauty",
        &[(
            "Skincare",
            &["Face Oil", "Clay Mask", "Lip Balm"],
            &["organic", "gift"],
        )],
    ),
];

/// Seed the storefront document store with demo data.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./storefront_dev.db")]
    db: String,

    /// Maximum reviews per product
    #[arg(short, long, default_value_t = 6)]
    reviews: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("🌱 Storefront Seed Data Generator");
    println!("=================================");
    println!("Database: {}", args.db);
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut products = Vec::new();
    let mut seed = 0usize;

    for (category, subcategories) in CATALOG {
        for (subcategory, names, tags) in subcategories.iter() {
            for name in names.iter() {
                let product = generate_product(category, subcategory, name, tags, seed);
                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.product_code, e);
                    continue;
                }
                products.push(product);
                seed += 1;
            }
        }
    }
    println!("✓ Generated {} products", products.len());

    let mut review_count = 0;
    for (index, product) in products.iter().enumerate() {
        // Some products stay without reviews.
        let count = (index * 7) % (args.reviews + 1);
        for n in 0..count {
            let review = generate_review(&product.product_code, index + n);
            db.reviews().insert(&review).await?;
            review_count += 1;
        }
    }
    println!("✓ Generated {} reviews", review_count);

    let mut combo_count = 0;
    for pair in products.chunks(2).filter(|pair| pair.len() == 2).take(3) {
        db.combos().insert(&generate_combo(&pair[0], &pair[1])).await?;
        combo_count += 1;
    }
    println!("✓ Generated {} combos", combo_count);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());
    println!("  Next: catalog-admin --db {} recompute-ratings", args.db);

    Ok(())
}

/// Generates a single product with deterministic data.
fn generate_product(
    category: &str,
    subcategory: &str,
    name: &str,
    tags: &[&str],
    seed: usize,
) -> Product {
    let prefix: String = category.chars().take(3).collect::<String>().to_uppercase();
    let product_code = format!("{}-{:03}", prefix, seed + 1);

    // 9.99 - 89.99
    let price = 9.99 + ((seed * 17) % 80) as f64;

    // Each product carries two of its group's tags.
    let product_tags = tags
        .iter()
        .cycle()
        .skip(seed % tags.len())
        .take(2)
        .map(|t| t.to_string())
        .collect();

    Product {
        id: String::new(),
        product_code: product_code.clone(),
        name: name.to_string(),
        description: Some(format!("{} from our {} collection.", name, subcategory)),
        price,
        images: vec![format!("https://cdn.example.com/products/{}.jpg", product_code)],
        category: category.to_string(),
        subcategory: Some(subcategory.to_string()),
        tags: product_tags,
        top_selling: seed % 4 == 0,
        rating: Rating::zero(),
        reviews: 0,
        created_at: Some(Utc::now()),
    }
}

/// Generates a review with a deterministic score.
fn generate_review(product_code: &str, seed: usize) -> Review {
    const NAMES: &[&str] = &["Ada", "Grace", "Linus", "Barbara", "Ken", "Margaret"];
    const TEXTS: &[&str] = &[
        "Not what I expected.",
        "Okay for the price.",
        "Does the job.",
        "Really nice quality.",
        "Love it, would buy again!",
    ];

    let rating = (seed * 3 % 5) as u8 + 1;
    Review {
        id: String::new(),
        product_code: product_code.to_string(),
        rating,
        text: TEXTS[usize::from(rating) - 1].to_string(),
        name: NAMES[seed % NAMES.len()].to_string(),
        verified: seed % 3 != 0,
        created_at: Utc::now() - Duration::days(seed as i64),
    }
}

/// Generates a two-product combo.
fn generate_combo(first: &Product, second: &Product) -> Combo {
    let combo_code = format!("COMBO-{}-{}", first.product_code, second.product_code);
    Combo {
        id: String::new(),
        combo_code,
        name: format!("{} + {}", first.name, second.name),
        price: ((first.price + second.price) * 0.85 * 100.0).round() / 100.0,
        pick_count: 2,
        product_options: vec![first.product_code.clone(), second.product_code.clone()],
        suggested_combinations: vec![SuggestedCombination {
            name: "Classic".to_string(),
            selections: vec![
                ComboSelection {
                    product_code: first.product_code.clone(),
                    size: "M".to_string(),
                },
                ComboSelection {
                    product_code: second.product_code.clone(),
                    size: "M".to_string(),
                },
            ],
        }],
    }
}
