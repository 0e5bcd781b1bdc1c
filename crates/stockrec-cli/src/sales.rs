//! Sales command handlers: raw ledger, monthly report, daily series,
//! rankings and modality listing.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use stockrec_core::{
    aggregate_by_day_and_sku, aggregate_by_month_and_sku, rank_skus_by_quantity,
    rank_skus_by_revenue, DailySkuSales, SalesAggregate, SalesRecord, SalesTotals, SkuRanking,
};
use stockrec_marketplace::MarketplaceClient;

/// Inclusive civil date range, `DD/MM/YYYY` or `YYYY-MM-DD`.
#[derive(Debug, Clone, Args)]
pub struct DateRangeArgs {
    /// First day of the range
    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,
    /// Last day of the range (inclusive)
    #[arg(long, value_parser = parse_date)]
    pub end: NaiveDate,
}

/// Sub-commands available under `sales`.
#[derive(Debug, Subcommand)]
pub enum SalesCommands {
    /// Every order line item with refund-aware amounts
    Ledger(DateRangeArgs),
    /// Units and revenue by month and SKU, excluding cancelled orders
    Report(DateRangeArgs),
    /// Line items with logistic type and cost, newest first
    Modality(DateRangeArgs),
    /// Units and revenue per day and SKU with running totals
    Daily(DateRangeArgs),
    /// SKUs ranked by units sold and by revenue
    Ranking {
        #[command(flatten)]
        range: DateRangeArgs,
        /// Keep only the first N SKUs of each ranking
        #[arg(long, default_value_t = 5, conflicts_with = "all")]
        top: usize,
        /// List every SKU
        #[arg(long)]
        all: bool,
    },
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    stockrec_marketplace::parse_civil_date(input).map_err(|e| e.to_string())
}

#[derive(Debug, Serialize)]
struct SalesReport {
    rows: Vec<SalesAggregate>,
    totals: SalesTotals,
}

#[derive(Debug, Serialize)]
struct SalesRanking {
    by_quantity: Vec<SkuRanking>,
    by_revenue: Vec<SkuRanking>,
}

pub(crate) async fn run_sales(
    client: &MarketplaceClient,
    command: SalesCommands,
    json: bool,
) -> anyhow::Result<()> {
    let (range, kind) = match command {
        SalesCommands::Ledger(range) => (range, Kind::Ledger),
        SalesCommands::Report(range) => (range, Kind::Report),
        SalesCommands::Modality(range) => (range, Kind::Modality),
        SalesCommands::Daily(range) => (range, Kind::Daily),
        SalesCommands::Ranking { range, top, all } => {
            (range, Kind::Ranking((!all).then_some(top)))
        }
    };
    let records = client.compute_sales_ledger(range.start, range.end).await?;
    if records.is_empty() {
        println!(
            "no sales between {} and {}",
            range.start.format("%d/%m/%Y"),
            range.end.format("%d/%m/%Y")
        );
        return Ok(());
    }

    match kind {
        Kind::Ledger if json => crate::print_json(&records)?,
        Kind::Ledger => print_ledger(&records),
        Kind::Report => {
            let (rows, totals) = aggregate_by_month_and_sku(&records);
            if json {
                crate::print_json(&SalesReport { rows, totals })?;
            } else {
                print_report(&rows, &totals);
            }
        }
        Kind::Modality => {
            let rows = modality_rows(records);
            if json {
                crate::print_json(&rows)?;
            } else {
                print_modality(&rows);
            }
        }
        Kind::Daily => {
            let rows = aggregate_by_day_and_sku(&records);
            if json {
                crate::print_json(&rows)?;
            } else {
                print_daily(&rows);
            }
        }
        Kind::Ranking(top) => {
            let ranking = SalesRanking {
                by_quantity: rank_skus_by_quantity(&records, top),
                by_revenue: rank_skus_by_revenue(&records, top),
            };
            if json {
                crate::print_json(&ranking)?;
            } else {
                print_ranking("BY UNITS", &ranking.by_quantity);
                println!();
                print_ranking("BY REVENUE", &ranking.by_revenue);
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Ledger,
    Report,
    Modality,
    Daily,
    /// `None` keeps every SKU.
    Ranking(Option<usize>),
}

/// Orders ledger lines newest first, larger quantities first within the
/// same instant.
pub(crate) fn modality_rows(mut records: Vec<SalesRecord>) -> Vec<SalesRecord> {
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.quantity.cmp(&a.quantity)));
    records
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn print_ledger(records: &[SalesRecord]) {
    println!(
        "{:<17}{:<16}{:<20}{:<22}{:>5}{:>12}{:>12}{:>12}{:>10}  {:<16}PRODUCT",
        "DATE", "ORDER", "STATUS", "SKU", "QTY", "UNIT", "PAID", "NO SHIP", "SHIP", "LOGISTIC"
    );
    for r in records {
        println!(
            "{:<17}{:<16}{:<20}{:<22}{:>5}{:>12}{:>12}{:>12}{:>10}  {:<16}{}",
            r.date.format("%d/%m/%Y %H:%M"),
            r.order_id,
            r.order_status,
            crate::clip(&r.sku, 21),
            r.quantity,
            money(r.unit_price),
            money(r.paid_amount_calculated),
            money(r.paid_amount_calculated_no_ship_cost),
            money(r.logistic_cost),
            r.logistic_type,
            crate::clip(&r.product_name, 40)
        );
    }
}

fn print_report(rows: &[SalesAggregate], totals: &SalesTotals) {
    println!("{:<10}{:<24}{:>8}{:>14}", "MONTH", "SKU", "QTY", "REVENUE");
    for row in rows {
        println!(
            "{:<10}{:<24}{:>8}{:>14}",
            row.month,
            crate::clip(&row.sku, 23),
            row.quantity,
            money(row.revenue)
        );
    }
    println!();
    println!(
        "{:<34}{:>8}{:>14}",
        "TOTAL",
        totals.quantity,
        money(totals.revenue)
    );
}

fn print_modality(records: &[SalesRecord]) {
    println!(
        "{:<17}{:<16}{:<22}{:<20}{:<12}{:>5}{:>12}{:>12}{:>10}  LOGISTIC",
        "DATE", "ORDER", "SKU", "STATUS", "PAYMENT", "QTY", "UNIT", "NO SHIP", "SHIP"
    );
    for r in records {
        println!(
            "{:<17}{:<16}{:<22}{:<20}{:<12}{:>5}{:>12}{:>12}{:>10}  {}",
            r.date.format("%d/%m/%Y %H:%M"),
            r.order_id,
            crate::clip(&r.sku, 21),
            r.order_status,
            r.payment_status,
            r.quantity,
            money(r.unit_price),
            money(r.paid_amount_calculated_no_ship_cost),
            money(r.logistic_cost),
            r.logistic_type
        );
    }
}

fn print_daily(rows: &[DailySkuSales]) {
    println!(
        "{:<12}{:<24}{:>8}{:>14}{:>10}{:>16}",
        "DATE", "SKU", "QTY", "REVENUE", "CUM QTY", "CUM REVENUE"
    );
    for row in rows {
        println!(
            "{:<12}{:<24}{:>8}{:>14}{:>10}{:>16}",
            row.date.format("%d/%m/%Y"),
            crate::clip(&row.sku, 23),
            row.quantity,
            money(row.revenue),
            row.cumulative_quantity,
            money(row.cumulative_revenue)
        );
    }
}

fn print_ranking(title: &str, rows: &[SkuRanking]) {
    println!("{title}");
    println!("{:>4}  {:<24}{:>8}{:>14}", "#", "SKU", "QTY", "REVENUE");
    for row in rows {
        println!(
            "{:>4}  {:<24}{:>8}{:>14}",
            row.rank,
            crate::clip(&row.sku, 23),
            row.quantity,
            money(row.revenue)
        );
    }
}
