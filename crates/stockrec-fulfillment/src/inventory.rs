//! Inventory summary normalization.

use stockrec_core::{
    dedup_by_sku_keep_last, truncate_product_name, StockRow, LOCATION_MARKETPLACE_FBA,
};

use crate::types::InventorySummary;

/// Coerces a raw fulfillable quantity to a non-negative integer.
///
/// Numbers and numeric strings are truncated toward zero; negatives, non-numeric
/// strings such as `"N/A"`, `null` and anything else become 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn coerce_quantity(raw: Option<&serde_json::Value>) -> u32 {
    let value = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.min(f64::from(u32::MAX)).trunc() as u32,
        _ => 0,
    }
}

/// Converts inventory summaries into canonical FBA stock rows.
///
/// Summaries without a seller SKU are skipped with a warning. Duplicate SKUs
/// keep the last summary seen.
#[must_use]
pub fn normalize_inventory(summaries: &[InventorySummary]) -> Vec<StockRow> {
    let mut rows = Vec::with_capacity(summaries.len());
    for (index, summary) in summaries.iter().enumerate() {
        let Some(sku) = summary
            .seller_sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            tracing::warn!(index, "skipping inventory summary without seller SKU");
            continue;
        };
        rows.push(StockRow {
            sku: sku.to_owned(),
            product: truncate_product_name(summary.product_name.as_deref().unwrap_or_default()),
            location: LOCATION_MARKETPLACE_FBA.to_owned(),
            quantity: coerce_quantity(
                summary
                    .inventory_details
                    .as_ref()
                    .and_then(|d| d.fulfillable_quantity.as_ref()),
            ),
        });
    }
    dedup_by_sku_keep_last(rows)
}
