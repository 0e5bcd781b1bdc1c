//! Unified stock: marketplace fulfilled feed, FBA feed and the reconciled
//! warehouse snapshot in one table.

use clap::{Args, Subcommand};
use serde::Serialize;
use stockrec_core::{unify_stock, ConciliationMapping, StockRow, StockSummary};
use stockrec_fulfillment::{FulfillmentClient, FulfillmentError};
use stockrec_marketplace::{MarketplaceClient, MarketplaceError};

pub(crate) const SOURCE_MARKETPLACE: &str = "marketplace";
pub(crate) const SOURCE_FULFILLMENT: &str = "fulfillment";

/// Row filters shared by `unified` and `summary`. Repeat a flag to allow
/// several values; no flag means no filtering.
#[derive(Debug, Clone, Default, Args)]
pub struct StockFilter {
    /// Keep only rows at this location
    #[arg(long = "location")]
    pub locations: Vec<String>,
    /// Keep only rows with this SKU
    #[arg(long = "sku")]
    pub skus: Vec<String>,
}

impl StockFilter {
    pub(crate) fn apply(&self, rows: Vec<StockRow>) -> Vec<StockRow> {
        rows.into_iter()
            .filter(|r| self.locations.is_empty() || self.locations.contains(&r.location))
            .filter(|r| self.skus.is_empty() || self.skus.contains(&r.sku))
            .collect()
    }
}

/// Sub-commands available under `stock`.
#[derive(Debug, Subcommand)]
pub enum StockCommands {
    /// Print the unified stock table
    Unified(StockFilter),
    /// Print location, SKU and unit counts for the unified table
    Summary(StockFilter),
}

/// A feed that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSource {
    pub source: &'static str,
    pub error: String,
}

/// The joined table plus any feeds that failed, so an outage is never
/// mistaken for an empty feed.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedStock {
    pub rows: Vec<StockRow>,
    pub failed_sources: Vec<FailedSource>,
}

/// Joins the fetched feeds with the stored snapshot and mapping.
///
/// A failed feed contributes no rows and is recorded in `failed_sources`.
/// A missing fulfillment client means the feed is not configured, which is
/// not a failure.
pub(crate) fn merge_sources(
    fulfilled: Result<Vec<StockRow>, MarketplaceError>,
    fba: Option<Result<Vec<StockRow>, FulfillmentError>>,
    warehouse: &[StockRow],
    mappings: &[ConciliationMapping],
) -> UnifiedStock {
    let mut failed_sources = Vec::new();

    let fulfilled = fulfilled.unwrap_or_else(|e| {
        tracing::error!(error = %e, "marketplace stock unavailable");
        failed_sources.push(FailedSource {
            source: SOURCE_MARKETPLACE,
            error: e.to_string(),
        });
        Vec::new()
    });

    let fba = match fba {
        Some(Ok(rows)) => rows,
        Some(Err(e)) => {
            tracing::error!(error = %e, "fulfillment stock unavailable");
            failed_sources.push(FailedSource {
                source: SOURCE_FULFILLMENT,
                error: e.to_string(),
            });
            Vec::new()
        }
        None => {
            tracing::debug!("fulfillment credentials not configured; skipping feed");
            Vec::new()
        }
    };

    UnifiedStock {
        rows: unify_stock(&fulfilled, &fba, warehouse, mappings),
        failed_sources,
    }
}

/// Fetches both remote feeds concurrently, loads the warehouse snapshot and
/// mapping, and joins them.
///
/// # Errors
///
/// Returns an error if the snapshot or mapping cannot be loaded. Remote feed
/// failures are reported in [`UnifiedStock::failed_sources`] instead.
pub(crate) async fn compute_unified_stock(
    pool: &sqlx::PgPool,
    marketplace: &MarketplaceClient,
    fulfillment: Option<&FulfillmentClient>,
) -> anyhow::Result<UnifiedStock> {
    let fba = async {
        match fulfillment {
            Some(client) => Some(client.fetch_stock().await),
            None => None,
        }
    };
    let (fulfilled, fba, warehouse, mappings) = tokio::join!(
        marketplace.fetch_stock(),
        fba,
        stockrec_db::load_warehouse_stock(pool),
        stockrec_db::load_conciliation_mapping(pool),
    );

    Ok(merge_sources(fulfilled, fba, &warehouse?, &mappings?))
}

pub(crate) async fn run_stock(
    pool: &sqlx::PgPool,
    marketplace: &MarketplaceClient,
    fulfillment: Option<&FulfillmentClient>,
    command: StockCommands,
    json: bool,
) -> anyhow::Result<()> {
    let unified = compute_unified_stock(pool, marketplace, fulfillment).await?;
    for failed in &unified.failed_sources {
        eprintln!("warning: {} feed failed: {}", failed.source, failed.error);
    }

    match command {
        StockCommands::Unified(filter) => {
            let unified = UnifiedStock {
                rows: filter.apply(unified.rows),
                failed_sources: unified.failed_sources,
            };
            if json {
                crate::print_json(&unified)?;
            } else {
                print_rows(&unified.rows);
            }
        }
        StockCommands::Summary(filter) => {
            let summary = StockSummary::from_rows(&filter.apply(unified.rows));
            if json {
                crate::print_json(&summary)?;
            } else {
                println!("locations:    {}", summary.locations);
                println!("unique SKUs:  {}", summary.unique_skus);
                println!("total units:  {}", summary.total_quantity);
            }
        }
    }
    Ok(())
}

pub(crate) fn print_rows(rows: &[StockRow]) {
    if rows.is_empty() {
        println!("no stock rows");
        return;
    }
    println!("{:<26}{:<26}{:>8}  PRODUCT", "SKU", "LOCATION", "QTY");
    for row in rows {
        println!(
            "{:<26}{:<26}{:>8}  {}",
            crate::clip(&row.sku, 25),
            crate::clip(&row.location, 25),
            row.quantity,
            row.product
        );
    }
}

#[cfg(test)]
mod tests {
    use stockrec_core::{LOCATION_MARKETPLACE_FBA, LOCATION_MARKETPLACE_FULFILLED};

    use super::*;

    fn row(sku: &str, location: &str, quantity: u32) -> StockRow {
        StockRow {
            sku: sku.to_owned(),
            product: format!("Product {sku}"),
            location: location.to_owned(),
            quantity,
        }
    }

    fn mapping(warehouse: &str, marketplace: &str, cached: i32) -> ConciliationMapping {
        ConciliationMapping {
            warehouse_sku: warehouse.to_owned(),
            marketplace_sku: marketplace.to_owned(),
            product: format!("Product {warehouse}"),
            warehouse_location: "Own Warehouse".to_owned(),
            warehouse_quantity: cached,
        }
    }

    #[test]
    fn failed_feed_is_reported_and_others_still_merge() {
        let fba = vec![row("M1", LOCATION_MARKETPLACE_FBA, 4)];
        let warehouse = vec![row("W1", "Own Warehouse", 6)];
        let mappings = vec![mapping("W1", "M1", 6)];

        let unified = merge_sources(
            Err(MarketplaceError::UnexpectedStatus {
                status: 503,
                url: "http://marketplace.test/users/me".to_owned(),
            }),
            Some(Ok(fba)),
            &warehouse,
            &mappings,
        );

        assert_eq!(unified.failed_sources.len(), 1);
        assert_eq!(unified.failed_sources[0].source, SOURCE_MARKETPLACE);
        assert!(unified.failed_sources[0].error.contains("503"));
        let locations: Vec<&str> = unified.rows.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec![LOCATION_MARKETPLACE_FBA, "Own Warehouse"]);
    }

    #[test]
    fn unconfigured_fulfillment_is_not_a_failure() {
        let fulfilled = vec![row("M1", LOCATION_MARKETPLACE_FULFILLED, 2)];
        let unified = merge_sources(Ok(fulfilled), None, &[], &[]);
        assert!(unified.failed_sources.is_empty());
        assert_eq!(unified.rows.len(), 1);
    }

    #[test]
    fn fulfillment_failure_is_reported() {
        let unified = merge_sources(
            Ok(Vec::new()),
            Some(Err(FulfillmentError::Authentication {
                reason: "refresh refused".to_owned(),
            })),
            &[],
            &[],
        );
        assert_eq!(
            unified.failed_sources.first().map(|f| f.source),
            Some(SOURCE_FULFILLMENT)
        );
        assert!(unified.rows.is_empty());
    }

    #[test]
    fn filter_matches_exact_values_and_empty_means_all() {
        let rows = vec![
            row("M1", LOCATION_MARKETPLACE_FULFILLED, 1),
            row("M1", LOCATION_MARKETPLACE_FBA, 2),
            row("M2", LOCATION_MARKETPLACE_FBA, 3),
        ];

        assert_eq!(StockFilter::default().apply(rows.clone()).len(), 3);

        let filter = StockFilter {
            locations: vec![LOCATION_MARKETPLACE_FBA.to_owned()],
            skus: vec!["M1".to_owned()],
        };
        let kept = filter.apply(rows.clone());
        assert_eq!(kept, vec![row("M1", LOCATION_MARKETPLACE_FBA, 2)]);

        let partial = StockFilter {
            locations: Vec::new(),
            skus: vec!["M".to_owned()],
        };
        assert!(partial.apply(rows).is_empty());
    }
}
