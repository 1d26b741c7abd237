use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use groceries::config::{AppConfig, LogFormat};
use groceries::errors::authenticated;
use groceries::model::{GroceryUpdate, NewGrocery};
use groceries::seed::seed_defaults;
use groceries::store::postgres::init_database_schema;
use groceries::store::{GroceryStore, MemoryStore, PgStore};
use groceries::Services;

#[derive(Parser, Debug)]
#[command(name = "groceries", about = "Grocery inventory and recipe recommendations")]
struct Args {
    /// Run against a throwaway in-memory store seeded with sample data
    #[arg(long, global = true)]
    memory: bool,

    /// Acting user id
    #[arg(long, global = true, env = "GROCERIES_USER")]
    user: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema and seed default data
    Init,
    /// Search the catalog
    Search {
        text: Option<String>,
        #[arg(long)]
        type_id: Option<i64>,
        /// Group results by grocery type
        #[arg(long)]
        grouped: bool,
    },
    /// List the user's inventory
    Groceries,
    /// List rows below their reminder threshold
    LowStock,
    /// Add an inventory row by item name
    Add {
        name: String,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Overwrite an inventory row
    Update {
        grocery_id: i64,
        quantity: f64,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Use one unit of an inventory row
    Use { grocery_id: i64 },
    /// Delete an inventory row
    Remove { grocery_id: i64 },
    /// Add items from receipt text read from a file or stdin
    Ingest {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Rank recipes by what the user stocks
    Recommend,
    /// Consume a recipe's ingredients and count the cook
    Cook {
        recipe_id: i64,
        #[arg(long)]
        post_id: Option<i64>,
    },
    /// Show a recipe with its cook counts
    Recipe { recipe_id: i64 },
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(false).compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Receipt text from `path`, or from `input` when no path is given
fn read_receipt_input<R: Read>(path: Option<&Path>, mut input: R) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read receipt file: {}", path.display())),
        None => {
            let mut text = String::new();
            input
                .read_to_string(&mut text)
                .context("Failed to read receipt text from stdin")?;
            Ok(text)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(args: &Args, config: &AppConfig) -> Result<Arc<dyn GroceryStore>> {
    if args.memory {
        let store: Arc<dyn GroceryStore> = Arc::new(MemoryStore::new());
        seed_defaults(store.clone()).await?;
        return Ok(store);
    }

    let database_url = config.require_database_url()?;
    let store = PgStore::connect(database_url, config.max_connections).await?;
    init_database_schema(store.pool()).await?;
    let store: Arc<dyn GroceryStore> = Arc::new(store);
    if config.seed_on_start || matches!(args.command, Command::Init) {
        seed_defaults(store.clone()).await?;
    }
    Ok(store)
}

async fn run(args: Args, services: Services) -> Result<()> {
    let user = || authenticated(args.user).context("Pass --user or set GROCERIES_USER");

    match args.command {
        Command::Init => info!(backend = services.store.backend_name(), "Store ready"),
        Command::Search {
            ref text,
            type_id,
            grouped,
        } => {
            let text = text.as_deref();
            if grouped {
                print_json(&services.catalog.search_grouped(text, type_id).await?)?;
            } else {
                print_json(&services.catalog.search(text, type_id).await?)?;
            }
        }
        Command::Groceries => print_json(&services.inventory.list(user()?).await?)?,
        Command::LowStock => print_json(&services.inventory.low_stock(user()?).await?)?,
        Command::Add {
            ref name,
            quantity,
            ref unit,
            threshold,
        } => {
            let new = NewGrocery {
                name: Some(name.clone()),
                unit: unit.clone(),
                quantity,
                low_threshold: threshold,
                ..Default::default()
            };
            print_json(&services.inventory.add(user()?, new).await?)?;
        }
        Command::Update {
            grocery_id,
            quantity,
            ref unit,
            threshold,
        } => {
            let update = GroceryUpdate {
                unit: unit.clone(),
                quantity,
                low_threshold: threshold,
            };
            let updated = services.inventory.update(user()?, grocery_id, update).await?;
            print_json(&updated)?;
        }
        Command::Use { grocery_id } => {
            let grocery = services.inventory.decrement_by_one(user()?, grocery_id).await?;
            print_json(&grocery)?;
        }
        Command::Remove { grocery_id } => {
            let deleted = services.inventory.remove(user()?, grocery_id).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        Command::Ingest { ref file } => {
            let user_id = user()?;
            let text = read_receipt_input(file.as_deref(), std::io::stdin().lock())?;
            let report = services.inventory.ingest_receipt_text(user_id, &text).await?;
            print_json(&report)?;
        }
        Command::Recommend => print_json(&services.recommender.recommend(user()?).await?)?,
        Command::Cook { recipe_id, post_id } => {
            let report = services
                .inventory
                .consume_for_recipe(user()?, recipe_id, post_id)
                .await?;
            print_json(&report)?;
        }
        Command::Recipe { recipe_id } => {
            let detail = services.recipes.recipe_detail(recipe_id, args.user).await?;
            print_json(&detail)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_env()?;
    init_logging(config.log_format);

    let store = open_store(&args, &config).await?;
    info!(backend = store.backend_name(), "Groceries starting");

    let services = Services::new(store, config.search_limit);
    run(args, services).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_receipt_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2 Milk $3.99").unwrap();
        writeln!(file, "Bread").unwrap();

        let text = read_receipt_input(Some(file.path()), std::io::empty()).unwrap();
        assert!(text.contains("2 Milk $3.99"));
        assert!(text.contains("Bread"));
    }

    #[test]
    fn test_read_receipt_from_reader() {
        let text = read_receipt_input(None, "Eggs\nButter\n".as_bytes()).unwrap();
        assert_eq!(text, "Eggs\nButter\n");
    }

    #[test]
    fn test_missing_receipt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("receipt.txt");
        let err = read_receipt_input(Some(&missing), std::io::empty()).unwrap_err();
        assert!(err.to_string().contains("receipt.txt"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args =
            Args::try_parse_from(["groceries", "--memory", "--user", "7", "cook", "3"]).unwrap();
        assert!(args.memory);
        assert_eq!(args.user, Some(7));
        assert!(matches!(
            args.command,
            Command::Cook {
                recipe_id: 3,
                post_id: None
            }
        ));
    }
}
