//! Canonical stock rows and the warehouse-scrape normalizer.
//!
//! Every inventory source (marketplace listings, fulfillment summaries,
//! warehouse scrape) is reduced to the same four columns before the
//! reconciliation join: SKU, product, location and a non-negative quantity.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Location label for stock held on the marketplace's own fulfilled listings.
pub const LOCATION_MARKETPLACE_FULFILLED: &str = "Marketplace (Fulfilled)";

/// Location label for stock held in the fulfillment-by-retailer network.
pub const LOCATION_MARKETPLACE_FBA: &str = "Marketplace (FBA)";

/// Product names longer than this are cut to keep report columns readable.
pub const MAX_PRODUCT_NAME_CHARS: usize = 70;

/// One `(SKU, location)` quantity from a single source snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub sku: String,
    pub product: String,
    pub location: String,
    pub quantity: u32,
}

/// A row as produced by the warehouse scrape, before normalization.
///
/// The quantity cell is copied verbatim from the warehouse UI, e.g.
/// `"1.250 un"`, so it may be text or a bare number.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseScrapeRow {
    pub sku: String,
    pub product: String,
    #[serde(default)]
    pub location: Option<String>,
    pub quantity: RawQuantity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(i64),
    Text(String),
}

impl RawQuantity {
    /// Parses the scraped quantity cell.
    ///
    /// Text cells use the first whitespace-separated token with `.` thousands
    /// separators removed; anything that is not all digits yields `None`.
    #[must_use]
    pub fn parse(&self) -> Option<i64> {
        match self {
            RawQuantity::Number(n) => Some(*n),
            RawQuantity::Text(text) => {
                let token = text.split_whitespace().next()?.replace('.', "");
                if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                token.parse::<i64>().ok()
            }
        }
    }
}

/// Converts scraped warehouse rows into canonical stock rows.
///
/// Only rows with a strictly positive quantity survive; rows with zero,
/// negative or unparseable stock are dropped entirely rather than being
/// carried as zero. Rows without their own location get `default_location`.
#[must_use]
pub fn normalize_warehouse_rows(
    rows: Vec<WarehouseScrapeRow>,
    default_location: &str,
) -> Vec<StockRow> {
    rows.into_iter()
        .filter_map(|row| {
            let sku = row.sku.trim().to_owned();
            if sku.is_empty() {
                tracing::warn!(product = %row.product, "skipping warehouse row without SKU");
                return None;
            }
            let quantity = row
                .quantity
                .parse()
                .filter(|q| *q > 0)
                .and_then(|q| u32::try_from(q).ok())?;
            let location = row
                .location
                .map(|l| l.trim().to_owned())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| default_location.to_owned());
            Some(StockRow {
                sku,
                product: row.product.trim().to_owned(),
                location,
                quantity,
            })
        })
        .collect()
}

/// Truncates a product name to [`MAX_PRODUCT_NAME_CHARS`] characters.
///
/// Counts `char`s, not bytes, so multi-byte names are never split mid-codepoint.
#[must_use]
pub fn truncate_product_name(name: &str) -> String {
    name.chars().take(MAX_PRODUCT_NAME_CHARS).collect()
}

/// Removes rows that repeat an earlier SKU, keeping the last occurrence's
/// values at the position of the first occurrence.
#[must_use]
pub fn dedup_by_sku_keep_last(rows: Vec<StockRow>) -> Vec<StockRow> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<StockRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(&idx) = position.get(&row.sku) {
            out[idx] = row;
        } else {
            position.insert(row.sku.clone(), out.len());
            out.push(row);
        }
    }
    out
}

/// Headline numbers for a stock table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub locations: usize,
    pub unique_skus: usize,
    pub total_quantity: u64,
}

impl StockSummary {
    #[must_use]
    pub fn from_rows(rows: &[StockRow]) -> Self {
        let locations: BTreeSet<&str> = rows.iter().map(|r| r.location.as_str()).collect();
        let skus: BTreeSet<&str> = rows.iter().map(|r| r.sku.as_str()).collect();
        Self {
            locations: locations.len(),
            unique_skus: skus.len(),
            total_quantity: rows.iter().map(|r| u64::from(r.quantity)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape(sku: &str, quantity: RawQuantity) -> WarehouseScrapeRow {
        WarehouseScrapeRow {
            sku: sku.to_owned(),
            product: "Lavadora Premium".to_owned(),
            location: None,
            quantity,
        }
    }

    fn row(sku: &str, location: &str, quantity: u32) -> StockRow {
        StockRow {
            sku: sku.to_owned(),
            product: format!("Product {sku}"),
            location: location.to_owned(),
            quantity,
        }
    }

    #[test]
    fn raw_quantity_parses_thousands_separator_and_unit() {
        let q = RawQuantity::Text("1.250 un".to_owned());
        assert_eq!(q.parse(), Some(1250));
    }

    #[test]
    fn raw_quantity_rejects_non_numeric_text() {
        assert_eq!(RawQuantity::Text("N/A".to_owned()).parse(), None);
        assert_eq!(RawQuantity::Text(String::new()).parse(), None);
        assert_eq!(RawQuantity::Text("-3".to_owned()).parse(), None);
    }

    #[test]
    fn warehouse_zero_quantity_row_is_excluded() {
        let rows = vec![
            scrape("A", RawQuantity::Number(0)),
            scrape("B", RawQuantity::Text("0 un".to_owned())),
            scrape("C", RawQuantity::Number(4)),
        ];
        let normalized = normalize_warehouse_rows(rows, "Own Warehouse");
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].sku, "C");
        assert_eq!(normalized[0].quantity, 4);
        assert_eq!(normalized[0].location, "Own Warehouse");
    }

    #[test]
    fn warehouse_negative_and_unparseable_rows_are_excluded() {
        let rows = vec![
            scrape("A", RawQuantity::Number(-2)),
            scrape("B", RawQuantity::Text("sem estoque".to_owned())),
        ];
        assert!(normalize_warehouse_rows(rows, "Own Warehouse").is_empty());
    }

    #[test]
    fn warehouse_row_keeps_its_own_location() {
        let mut r = scrape("A", RawQuantity::Number(3));
        r.location = Some("Grupo Vision".to_owned());
        let normalized = normalize_warehouse_rows(vec![r], "Own Warehouse");
        assert_eq!(normalized[0].location, "Grupo Vision");
    }

    #[test]
    fn warehouse_row_without_sku_is_skipped() {
        let rows = vec![scrape("  ", RawQuantity::Number(3))];
        assert!(normalize_warehouse_rows(rows, "Own Warehouse").is_empty());
    }

    #[test]
    fn truncate_product_name_counts_chars() {
        let long = "ç".repeat(100);
        let truncated = truncate_product_name(&long);
        assert_eq!(truncated.chars().count(), MAX_PRODUCT_NAME_CHARS);
        assert_eq!(truncate_product_name("short"), "short");
    }

    #[test]
    fn dedup_keeps_last_seen_values() {
        let rows = vec![
            row("A", LOCATION_MARKETPLACE_FULFILLED, 1),
            row("B", LOCATION_MARKETPLACE_FULFILLED, 2),
            row("A", LOCATION_MARKETPLACE_FULFILLED, 9),
        ];
        let deduped = dedup_by_sku_keep_last(rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].sku, "A");
        assert_eq!(deduped[0].quantity, 9);
        assert_eq!(deduped[1].sku, "B");
    }

    #[test]
    fn summary_counts_locations_skus_and_units() {
        let rows = vec![
            row("A", LOCATION_MARKETPLACE_FULFILLED, 3),
            row("A", LOCATION_MARKETPLACE_FBA, 4),
            row("B", "Own Warehouse", 5),
        ];
        let summary = StockSummary::from_rows(&rows);
        assert_eq!(
            summary,
            StockSummary {
                locations: 3,
                unique_skus: 2,
                total_quantity: 12,
            }
        );
    }
}
