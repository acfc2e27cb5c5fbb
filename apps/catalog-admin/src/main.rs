//! # Catalog Admin
//!
//! Command-line access to the catalog services for operators.
//!
//! ## Usage
//! ```bash
//! # Recompute every product rating and zero the unreviewed ones
//! catalog-admin --db ./storefront_dev.db recompute-ratings
//!
//! # Recompute one product
//! catalog-admin recompute-ratings --code FAS-001
//!
//! # Related products for a product page
//! catalog-admin related FAS-001 --exclude FAS-002 --limit 8
//!
//! # Schema and catalog size
//! catalog-admin status
//!
//! # Effective configuration (file + environment)
//! catalog-admin --config ./storefront.toml config
//! ```
//!
//! Output is JSON on stdout; logs go to stderr and honour `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront_catalog::auth::Role;
use storefront_catalog::{RelatedOptions, Storefront, StorefrontConfig, SystemClock};
use storefront_core::NewReview;
use storefront_db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Storefront catalog administration.
#[derive(Debug, Parser)]
#[command(name = "catalog-admin", version)]
struct Cli {
    /// Config file (defaults to ./storefront.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute product ratings from reviews
    RecomputeRatings {
        /// Only this product
        #[arg(long)]
        code: Option<String>,
    },

    /// Show products related to a product
    Related {
        /// Source product code
        code: String,

        /// Another product code to leave out
        #[arg(long)]
        exclude: Option<String>,

        /// Maximum number of results (configured default when omitted)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List all products
    Products,

    /// List all combos
    Combos,

    /// Store a review and refresh the product rating
    AddReview {
        #[arg(long)]
        code: String,

        /// Stars, 1 to 5
        #[arg(long)]
        rating: i64,

        /// Reviewer name
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        text: String,

        #[arg(long)]
        verified: bool,
    },

    /// Issue a session token for local testing
    IssueToken {
        #[arg(long)]
        user: String,

        #[arg(long)]
        email: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,

        /// Token lifetime in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// Database health, schema and catalog size
    Status,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config =
        StorefrontConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    match cli.command {
        Command::Config => {
            let mut shown = config.clone();
            shown.auth.jwt_secret = "********".to_string();
            print!("{}", shown.to_toml());
            return Ok(());
        }
        Command::IssueToken {
            user,
            email,
            admin,
            hours,
        } => {
            let role = if admin { Role::Admin } else { Role::Customer };
            let token = storefront_catalog::JwtVerifier::new(config.auth.jwt_secret.clone())
                .issue(&user, email.as_deref(), role, chrono::Duration::hours(hours))?;
            println!("{token}");
            return Ok(());
        }
        _ => {}
    }

    let db = Database::new(config.database.db_config())
        .await
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;
    info!(path = %config.database.path.display(), "Database ready");

    if let Command::Status = cli.command {
        let result = status(&db).await;
        db.close().await;
        return result;
    }

    let storefront = Storefront::new(&config, db.store(), Arc::new(SystemClock));
    let result = run(&storefront, cli.command).await;

    db.close().await;
    result
}

async fn run(storefront: &Storefront, command: Command) -> anyhow::Result<()> {
    match command {
        Command::RecomputeRatings { code: Some(code) } => {
            let summary = storefront.ratings.recompute_rating(&code).await?;
            print_json(&summary)
        }
        Command::RecomputeRatings { code: None } => {
            let report = storefront.ratings.recompute_all_ratings().await?;
            print_json(&report)?;
            if !report.is_complete() {
                anyhow::bail!(
                    "recompute incomplete: {} failed, timed out: {}",
                    report.failed,
                    report.timed_out
                );
            }
            Ok(())
        }
        Command::Related {
            code,
            exclude,
            limit,
        } => {
            let mut options = match limit {
                Some(limit) => RelatedOptions::new(limit),
                None => storefront.related_options(),
            };
            if let Some(exclude) = exclude {
                options = options.excluding(exclude);
            }
            let related = storefront.related.find_related(&code, options).await?;
            print_json(&related)
        }
        Command::Products => print_json(&*storefront.catalog.products().await?),
        Command::Combos => print_json(&*storefront.catalog.combos().await?),
        Command::AddReview {
            code,
            rating,
            name,
            text,
            verified,
        } => {
            let receipt = storefront
                .reviews
                .submit(NewReview {
                    product_code: code,
                    rating,
                    text,
                    name,
                    verified,
                })
                .await?;
            print_json(&receipt)
        }
        Command::Config | Command::IssueToken { .. } | Command::Status => Ok(()),
    }
}

async fn status(db: &Database) -> anyhow::Result<()> {
    let migrations = db.migration_status().await?;
    print_json(&serde_json::json!({
        "healthy": db.health_check().await,
        "migrations": migrations,
        "products": db.products().count().await?,
        "reviewedProducts": db.reviews().distinct_product_codes().await?.len(),
    }))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initializes the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=storefront=trace` - Trace the storefront crates only
/// - Default: INFO, DEBUG for storefront crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
