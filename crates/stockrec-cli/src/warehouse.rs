//! Warehouse snapshot import and display.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use stockrec_core::{normalize_warehouse_rows, AppConfig, StockRow, WarehouseScrapeRow};

/// Sub-commands available under `warehouse`.
#[derive(Debug, Subcommand)]
pub enum WarehouseCommands {
    /// Replace the snapshot with a scraped JSON table
    Import {
        /// JSON array of `{sku, product, location?, quantity}` rows
        file: PathBuf,
        /// Parse and normalize without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the stored snapshot
    Show,
}

/// Reads a scrape export and normalizes it.
pub(crate) fn read_scrape_file(path: &Path, default_location: &str) -> anyhow::Result<Vec<StockRow>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading warehouse export {}", path.display()))?;
    let raw: Vec<WarehouseScrapeRow> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing warehouse export {}", path.display()))?;
    let scraped = raw.len();
    let rows = normalize_warehouse_rows(raw, default_location);
    tracing::info!(scraped, kept = rows.len(), "warehouse export normalized");
    Ok(rows)
}

pub(crate) async fn run_warehouse(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: WarehouseCommands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        WarehouseCommands::Import { file, dry_run } => {
            let rows = read_scrape_file(&file, &config.warehouse_location)?;
            if dry_run {
                println!("[dry-run] would replace warehouse snapshot with {} row(s)", rows.len());
                return Ok(());
            }
            let written = stockrec_db::save_warehouse_stock(pool, &rows).await?;
            println!("warehouse snapshot replaced: {written} row(s)");
        }
        WarehouseCommands::Show => {
            let rows = stockrec_db::load_warehouse_stock(pool).await?;
            if json {
                return crate::print_json(&rows);
            }
            match stockrec_db::warehouse_snapshot_taken_at(pool).await? {
                Some(at) => println!("snapshot taken {}", at.format("%Y-%m-%d %H:%M UTC")),
                None => {
                    println!("no warehouse snapshot; run `warehouse import` first");
                    return Ok(());
                }
            }
            crate::stock::print_rows(&rows);
        }
    }
    Ok(())
}
