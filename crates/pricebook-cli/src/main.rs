//! Pricebook CLI - browse and synchronize the product catalog
//!
//! Quick lookup from the terminal; `pricebook watch` keeps the local
//! store current in the background.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use pricebook_core::db::{
    Database, ProductRepository, SettingsRepository, SqliteProductRepository,
    SqliteSettingsRepository, SqliteWatermarkRepository, WatermarkRepository,
};
use pricebook_core::remote::HttpCatalogSource;
use pricebook_core::sync::{Outcome, SyncReport, Synchronizer};
use pricebook_core::Product;
use serde::Serialize;
use thiserror::Error;

mod scheduler;

use scheduler::Scheduler;

#[derive(Parser)]
#[command(name = "pricebook")]
#[command(about = "Browse the product catalog from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Quick lookup: pricebook "taladro percutor"
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search products by reference or description
    #[command(alias = "find")]
    Search {
        /// Search query (a double space searches references only)
        query: Vec<String>,
        /// Number of products to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List products
    List {
        /// Number of products to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
        /// Number of products to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one product by exact reference
    Show {
        /// Product reference
        reference: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show local catalog status
    Status,
    /// Synchronize the catalog once
    Sync,
    /// Keep the catalog synchronized on an hourly cadence
    Watch,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] pricebook_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("No product found for reference: {0}")]
    ProductNotFound(String),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricebook=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Some(Commands::Search { query, limit, json }) => {
            run_search(&query.join(" "), limit, json, &db_path)?;
        }
        Some(Commands::List {
            limit,
            offset,
            json,
        }) => run_list(limit, offset, json, &db_path)?,
        Some(Commands::Show { reference, json }) => run_show(&reference, json, &db_path)?,
        Some(Commands::Status) => run_status(&db_path)?,
        Some(Commands::Sync) => run_sync(&db_path).await?,
        Some(Commands::Watch) => run_watch(&db_path).await?,
        None => {
            // Quick lookup mode: pricebook "taladro"
            if cli.query.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_search(&cli.query.join(" "), 25, false, &db_path)?;
            }
        }
    }

    Ok(())
}

fn run_search(query: &str, limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    // Trailing whitespace is significant: a double space marks a
    // reference-only query, so only reject fully blank input
    if query.trim().is_empty() {
        return Err(CliError::EmptySearchQuery);
    }

    let db = open_database(db_path)?;
    let repo = SqliteProductRepository::new(db.connection());
    let products = repo.search(query, limit)?;

    print_products(&products, as_json)
}

fn run_list(limit: usize, offset: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let repo = SqliteProductRepository::new(db.connection());
    let products = repo.list(limit, offset)?;

    print_products(&products, as_json)
}

fn run_show(reference: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let repo = SqliteProductRepository::new(db.connection());

    let product = repo
        .get(reference.trim())?
        .ok_or_else(|| CliError::ProductNotFound(reference.trim().to_string()))?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&product_to_list_item(&product))?
        );
    } else {
        for line in format_product_detail(&product) {
            println!("{line}");
        }
    }

    Ok(())
}

fn run_status(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let products = SqliteProductRepository::new(db.connection());
    let watermarks = SqliteWatermarkRepository::new(db.connection());
    let settings = SqliteSettingsRepository::new(db.connection());

    println!("Database:     {}", db_path.display());
    println!("Products:     {}", products.count()?);

    match watermarks.get()? {
        Some(watermark) => {
            println!("Dataset:      {}", watermark.version);
            println!("Last sync:    {}", format_timestamp(watermark.timestamp));
        }
        None => println!("Last sync:    never"),
    }

    if !settings.first_run_completed()? {
        println!("First sync:   pending");
    }

    Ok(())
}

async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let remote = HttpCatalogSource::from_env()?;
    let sync = Synchronizer::new(remote);

    match sync.run(&db).await? {
        Outcome::UpToDate => println!("Already up to date"),
        Outcome::AlreadyRunning => println!("A sync is already running"),
        Outcome::Completed(report) => print_sync_report(&report),
    }

    Ok(())
}

async fn run_watch(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let remote = HttpCatalogSource::from_env()?;
    let sync = Synchronizer::new(remote);

    tracing::info!(db = %db_path.display(), "watching catalog");
    Scheduler::new(&sync).watch(&db).await?;
    Ok(())
}

fn print_products(products: &[Product], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = products
            .iter()
            .map(product_to_list_item)
            .collect::<Vec<ProductListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_product_lines(products) {
            println!("{line}");
        }
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    let mode = if report.full_dataset {
        "full dataset"
    } else {
        "changes"
    };
    println!(
        "Synced {mode}: {} applied, {} rejected, {} removed ({} batches)",
        report.applied, report.rejected, report.swept, report.batches
    );
    println!("Catalog as of {}", format_timestamp(report.timestamp));
}

#[derive(Debug, Serialize)]
struct ProductListItem {
    reference: String,
    description: String,
    family: String,
    price: f64,
    stock: f64,
    discount: String,
    state: String,
    location: String,
    available: bool,
    updated_at: i64,
}

fn product_to_list_item(product: &Product) -> ProductListItem {
    ProductListItem {
        reference: product.reference.clone(),
        description: product.description.clone(),
        family: product.family.clone(),
        price: product.price,
        stock: product.stock,
        discount: product.discount.clone(),
        state: product.state.to_string(),
        location: product.location.clone(),
        available: product.is_available(),
        updated_at: product.updated_at,
    }
}

fn format_product_lines(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|product| {
            let marker = if product.is_available() { " " } else { "!" };
            let description = truncate(&product.description, 40);
            format!(
                "{marker} {:<14}  {description:<40}  {:>9.2}  {:>7.1}",
                product.reference, product.price, product.stock
            )
        })
        .collect()
}

fn format_product_detail(product: &Product) -> Vec<String> {
    let mut lines = vec![
        format!("Reference:    {}", product.reference),
        format!("Description:  {}", product.description),
        format!("Family:       {}", product.family),
        format!("Price:        {:.2}", product.price),
        format!("Stock:        {:.1}", product.stock),
        format!("State:        {}", product.state),
        format!("Updated:      {}", format_timestamp(product.updated_at)),
    ];

    if !product.discount.is_empty() {
        lines.push(format!("Discount:     {}", product.discount));
    }
    if !product.location.is_empty() {
        lines.push(format!("Location:     {}", product.location));
    }
    if product.pack_quantity > 0.0 {
        lines.push(format!("Pack qty:     {:.1}", product.pack_quantity));
    }

    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(
            || format!("{timestamp_ms} ms"),
            |instant| instant.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PRICEBOOK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricebook")
        .join("pricebook.db")
}

fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path)?)
}
