//! Conciliation mapping display and replacement.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use stockrec_core::{
    conciliation_status, load_mapping_file, validate_against_catalog, AppConfig,
    ConciliationMapping, ConciliationStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Reconciled,
    Unreconciled,
}

impl StatusFilter {
    fn keeps(self, row: &ConciliationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Reconciled => row.is_reconciled(),
            Self::Unreconciled => !row.is_reconciled(),
        }
    }
}

/// Sub-commands available under `conciliation`.
#[derive(Debug, Subcommand)]
pub enum ConciliationCommands {
    /// List warehouse SKUs with their marketplace mapping
    Show {
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
    },
    /// Validate a YAML mapping file and replace the stored mapping with it.
    /// Every marketplace SKU must be listed in the live marketplace catalog.
    Apply {
        file: PathBuf,
        /// Validate and resolve without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Serialize)]
struct ConciliationReport {
    rows: Vec<ConciliationStatus>,
    reconciled: usize,
    unreconciled: usize,
}

/// Filters the status rows; the counts always cover the full table.
fn build_report(all: Vec<ConciliationStatus>, filter: StatusFilter) -> ConciliationReport {
    let reconciled = all.iter().filter(|r| r.is_reconciled()).count();
    let unreconciled = all.len() - reconciled;
    ConciliationReport {
        rows: all.into_iter().filter(|r| filter.keeps(r)).collect(),
        reconciled,
        unreconciled,
    }
}

pub(crate) async fn run_conciliation(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: ConciliationCommands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        ConciliationCommands::Show { status } => {
            let snapshot = stockrec_db::load_warehouse_stock(pool).await?;
            let mappings = stockrec_db::load_conciliation_mapping(pool).await?;
            let report = build_report(conciliation_status(&snapshot, &mappings), status);
            if json {
                return crate::print_json(&report);
            }
            print_report(&report);
        }
        ConciliationCommands::Apply { file, dry_run } => {
            let snapshot = stockrec_db::load_warehouse_stock(pool).await?;
            let mappings = load_mapping_file(&file)?.resolve(&snapshot, &config.warehouse_location);
            stockrec_core::validate_mappings(&mappings)?;
            check_catalog(config, &mappings).await?;
            let reconciled = mappings.iter().filter(|m| m.is_reconciled()).count();
            if dry_run {
                println!(
                    "[dry-run] mapping is valid: {} row(s), {reconciled} reconciled",
                    mappings.len()
                );
                return Ok(());
            }
            let written = stockrec_db::save_conciliation_mapping(pool, &mappings).await?;
            println!("conciliation mapping replaced: {written} row(s), {reconciled} reconciled");
        }
    }
    Ok(())
}

/// Rejects marketplace SKUs the marketplace does not list. The catalog is
/// only fetched when at least one row is reconciled.
async fn check_catalog(config: &AppConfig, mappings: &[ConciliationMapping]) -> anyhow::Result<()> {
    if !mappings.iter().any(ConciliationMapping::is_reconciled) {
        return Ok(());
    }
    let client = crate::marketplace_client(config)?;
    let catalog = client
        .fetch_stock()
        .await
        .context("fetching the marketplace catalog to check mapped SKUs")?;
    let known: HashSet<&str> = catalog.iter().map(|row| row.sku.as_str()).collect();
    tracing::debug!(known = known.len(), "marketplace catalog loaded");
    validate_against_catalog(mappings, &known)?;
    Ok(())
}

fn print_report(report: &ConciliationReport) {
    println!(
        "{:<22}{:<26}{:<22}{:>8}  PRODUCT",
        "WAREHOUSE SKU", "MARKETPLACE SKU", "LOCATION", "QTY"
    );
    for row in &report.rows {
        println!(
            "{:<22}{:<26}{:<22}{:>8}  {}",
            crate::clip(&row.warehouse_sku, 21),
            crate::clip(row.marketplace_sku.as_deref().unwrap_or("-"), 25),
            crate::clip(&row.location, 21),
            row.quantity,
            row.product
        );
    }
    println!();
    println!(
        "reconciled: {}  unreconciled: {}",
        report.reconciled, report.unreconciled
    );
}
