mod conciliation;
mod sales;
mod stock;
mod warehouse;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::conciliation::ConciliationCommands;
use crate::sales::SalesCommands;
use crate::stock::StockCommands;
use crate::warehouse::WarehouseCommands;

#[derive(Debug, Parser)]
#[command(name = "stockrec")]
#[command(about = "Marketplace sales reporting and three-source stock reconciliation")]
struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sales ledger and reports for a civil date range
    Sales {
        #[command(subcommand)]
        command: SalesCommands,
    },
    /// Unified stock across marketplace, fulfillment and warehouse
    Stock {
        #[command(subcommand)]
        command: StockCommands,
    },
    /// Warehouse snapshot management
    Warehouse {
        #[command(subcommand)]
        command: WarehouseCommands,
    },
    /// Warehouse to marketplace SKU mapping
    Conciliation {
        #[command(subcommand)]
        command: ConciliationCommands,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = stockrec_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let json = cli.json;
    match cli.command {
        Some(Commands::Sales { command }) => {
            let client = marketplace_client(&config)?;
            sales::run_sales(&client, command, json).await?;
        }
        Some(Commands::Stock { command }) => {
            let pool = connect(&config).await?;
            let marketplace = marketplace_client(&config)?;
            let fulfillment = config
                .fulfillment
                .as_ref()
                .map(|creds| stockrec_fulfillment::FulfillmentClient::new(creds, &config.user_agent))
                .transpose()?;
            stock::run_stock(&pool, &marketplace, fulfillment.as_ref(), command, json).await?;
        }
        Some(Commands::Warehouse { command }) => {
            let pool = connect(&config).await?;
            warehouse::run_warehouse(&pool, &config, command, json).await?;
        }
        Some(Commands::Conciliation { command }) => {
            let pool = connect(&config).await?;
            conciliation::run_conciliation(&pool, &config, command, json).await?;
        }
        Some(Commands::Migrate) => {
            let pool = connect(&config).await?;
            let applied = stockrec_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        None => println!("no command given; run `stockrec --help`"),
    }

    Ok(())
}

pub(crate) fn marketplace_client(
    config: &stockrec_core::AppConfig,
) -> anyhow::Result<stockrec_marketplace::MarketplaceClient> {
    Ok(stockrec_marketplace::MarketplaceClient::new(
        config.require_marketplace()?,
        &config.user_agent,
    )?)
}

async fn connect(config: &stockrec_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = stockrec_db::PoolConfig::from_app_config(config);
    let pool = stockrec_db::connect_pool(config.require_database_url()?, pool_config).await?;
    Ok(pool)
}

/// Pretty-prints `value` as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shortens `text` to `max` characters for table display.
pub(crate) fn clip(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max.saturating_sub(3)).collect::<String>())
    } else {
        text.to_owned()
    }
}
