//! stockroom - command-line front end for the inventory cache.
//!
//! Reads go through the two-tier cache, so repeated runs are served from the
//! persisted tier until it expires. Mutations are applied optimistically to
//! the cached list and rolled back if the server refuses them.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockroom_core::cache::{FileStore, PersistentStore};
use stockroom_core::models::{Category, Instrument, InstrumentChanges, IssueOrder, Subcategory};
use stockroom_core::mutation::{InstrumentList, ListHandle, MutationController};
use stockroom_core::utils::truncate_string;
use stockroom_core::{ApiClient, CacheResult, Config, InventoryCache, InventoryError, Prefetcher};

/// Column width for names in table output
const NAME_WIDTH: usize = 32;

#[derive(Parser)]
#[command(name = "stockroom", version, about = "Cached access to the stockroom inventory")]
struct Cli {
    /// Path to a config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the inventory API
    #[arg(long, global = true, env = "STOCKROOM_API_URL")]
    api_url: Option<String>,

    /// Session cookie forwarded with every request
    #[arg(long, global = true, env = "STOCKROOM_SESSION", hide_env_values = true)]
    session: Option<String>,

    /// Keep the cache in memory only for this run
    #[arg(long, global = true)]
    no_persist: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List categories
    Categories,
    /// List the subcategories of a category
    Subcategories { category_id: i64 },
    /// List the instruments of a subcategory
    Items {
        subcategory_id: i64,
        /// Also warm the next subcategory of the parent category
        #[arg(long)]
        prefetch: bool,
    },
    /// Fetch every list into the cache
    Warm,
    /// Edit an instrument
    Modify {
        subcategory_id: i64,
        item_id: i64,
        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Delete an instrument
    Delete { subcategory_id: i64, item_id: i64 },
    /// Request units of an instrument
    Issue {
        subcategory_id: i64,
        item_id: i64,
        quantity: u64,
        /// Role recorded on the request (defaults to the configured role)
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Show the age of every cached list
    CacheAges,
}

#[derive(Args)]
struct ChangeArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    serial_number: Option<String>,
    #[arg(long)]
    cost: Option<String>,
    #[arg(long)]
    quantity: Option<String>,
    #[arg(long)]
    gst_number: Option<String>,
    #[arg(long)]
    buyer_name: Option<String>,
    #[arg(long)]
    buyer_email: Option<String>,
    #[arg(long)]
    purchase_date: Option<String>,
    #[arg(long)]
    bill_number: Option<String>,
    #[arg(long)]
    remarks: Option<String>,
}

impl From<ChangeArgs> for InstrumentChanges {
    fn from(args: ChangeArgs) -> Self {
        InstrumentChanges {
            name: args.name,
            serial_number: args.serial_number,
            cost: args.cost,
            quantity: args.quantity,
            gst_number: args.gst_number,
            buyer_name: args.buyer_name,
            buyer_email: args.buyer_email,
            purchase_date: args.purchase_date,
            bill_number: args.bill_number,
            remarks: args.remarks,
        }
    }
}

/// Initialize the tracing subscriber. Logs go to stderr, and to a daily
/// file when a log directory is configured.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stockroom.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = Some(url.clone());
    }

    let _log_guard = init_tracing(&config);
    info!(api = config.api_base_url(), "stockroom starting");

    let mut client = ApiClient::new(config.api_base_url(), config.include_credentials)?;
    if let Some(cookie) = &cli.session {
        client = client.with_session_cookie(cookie.clone());
    }

    let store = if cli.no_persist {
        PersistentStore::in_memory()
    } else {
        let dir = config.cache_dir()?;
        PersistentStore::new(Arc::new(FileStore::new(dir)?))
    };
    let cache = InventoryCache::new(Arc::new(client), store, config.cache_settings());

    run(cli.command, cli.json, &config, cache).await
}

async fn run(
    command: Command,
    json: bool,
    config: &Config,
    cache: InventoryCache<ApiClient>,
) -> Result<()> {
    match command {
        Command::Categories => {
            let result = cache.list_categories().await?;
            report_source(&result);
            if json {
                return print_json(&result.data);
            }
            for category in &result.data {
                print_category(category);
            }
        }
        Command::Subcategories { category_id } => {
            let result = cache.list_subcategories_for(category_id).await?;
            report_source(&result);
            if json {
                return print_json(&result.data);
            }
            for sub in &result.data {
                print_subcategory(sub);
            }
        }
        Command::Items {
            subcategory_id,
            prefetch,
        } => {
            let result = cache.list_instruments_for(subcategory_id).await?;
            report_source(&result);
            if prefetch {
                prefetch_neighbours(&cache, &result.data, subcategory_id).await;
            }
            if json {
                return print_json(&result.data);
            }
            print_instrument_header();
            for item in &result.data {
                print_instrument(item);
            }
        }
        Command::Warm => {
            let report = Prefetcher::new(cache.clone()).warm_all().await;
            println!(
                "Warmed {} categories, {} subcategory lists, {} instrument lists",
                report.categories, report.subcategories, report.instruments
            );
            for (target, error) in &report.failures {
                eprintln!("  {}: {}", target, error);
            }
            if !report.is_complete() {
                anyhow::bail!("{} lists could not be fetched", report.failures.len());
            }
        }
        Command::Modify {
            subcategory_id,
            item_id,
            changes,
        } => {
            let list = load_list(&cache, subcategory_id).await?;
            let controller = MutationController::new(cache.clone());
            let outcome = controller.modify(&list, item_id, &changes.into()).await;
            let updated = finish(&list, outcome)?;
            if json {
                return print_json(&updated);
            }
        }
        Command::Delete {
            subcategory_id,
            item_id,
        } => {
            let list = load_list(&cache, subcategory_id).await?;
            let controller = MutationController::new(cache.clone());
            let outcome = controller.delete(&list, item_id).await;
            finish(&list, outcome)?;
        }
        Command::Issue {
            subcategory_id,
            item_id,
            quantity,
            role,
            remarks,
        } => {
            let role = role
                .or_else(|| config.user_role.clone())
                .context("No user role given. Pass --role or set user_role in the config file")?;
            let order = IssueOrder::new(quantity, role).with_remarks(remarks);

            let list = load_list(&cache, subcategory_id).await?;
            let controller = MutationController::new(cache.clone());
            let outcome = controller.issue(&list, item_id, &order).await;
            let request = finish(&list, outcome)?;
            if json {
                return print_json(&request);
            }
        }
        Command::CacheAges => {
            let ages = cache.cache_ages();
            if ages.is_empty() {
                println!("Nothing cached in memory");
            }
            for (key, age) in ages {
                println!("{:<24} {}", key, age);
            }
        }
    }
    Ok(())
}

async fn load_list(cache: &InventoryCache<ApiClient>, subcategory_id: i64) -> Result<ListHandle> {
    let result = cache.list_instruments_for(subcategory_id).await?;
    Ok(InstrumentList::new(subcategory_id, result.data).into_handle())
}

/// Print the controller's status message and pass the outcome through.
fn finish<T>(list: &ListHandle, outcome: Result<T, InventoryError>) -> Result<T> {
    let message = list
        .lock()
        .ok()
        .and_then(|state| state.message.clone());
    if let Some(message) = message {
        if message.is_error() {
            eprintln!("{}", message.text);
        } else {
            println!("{}", message.text);
        }
    }
    Ok(outcome?)
}

async fn prefetch_neighbours(
    cache: &InventoryCache<ApiClient>,
    instruments: &[Instrument],
    subcategory_id: i64,
) {
    let Some(category_id) = instruments.first().map(|i| i.category.id) else {
        return;
    };
    let siblings = match cache.list_subcategories_for(category_id).await {
        Ok(result) => result.data,
        Err(e) => {
            warn!(category_id, error = %e, "Skipping prefetch");
            return;
        }
    };
    let Some(index) = siblings.iter().position(|s| s.id == subcategory_id) else {
        return;
    };
    let prefetcher = Prefetcher::new(cache.clone());
    if let Some(handle) = prefetcher.on_subcategory_focused(&siblings, index) {
        let _ = handle.await;
    }
}

fn report_source<T>(result: &CacheResult<T>) {
    info!(source = ?result.source, cached_at = %result.cached_at, "Loaded");
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_category(category: &Category) {
    println!("{:>6}  {}", category.id, category.name);
}

fn print_subcategory(sub: &Subcategory) {
    println!("{:>6}  {}", sub.id, sub.name);
}

fn print_instrument_header() {
    println!("{:>6}  {:<width$}  {:>8}  {}", "ID", "NAME", "QTY", "SERIAL", width = NAME_WIDTH);
}

fn print_instrument(item: &Instrument) {
    println!(
        "{:>6}  {:<width$}  {:>8}  {}",
        item.id,
        truncate_string(&item.name, NAME_WIDTH),
        item.quantity,
        item.serial_number,
        width = NAME_WIDTH
    );
}
