//! Inventory summaries response types.
//!
//! Field names follow the upstream camelCase JSON. Everything the normalizer
//! tolerates being absent is optional here so one odd summary never fails
//! the whole page.

use serde::Deserialize;

/// One page of `GET /fba/inventory/v1/summaries`.
#[derive(Debug, Default, Deserialize)]
pub struct InventorySummariesResponse {
    #[serde(default)]
    pub payload: Option<InventoryPayload>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl InventorySummariesResponse {
    /// Consumes the page, returning its summaries and continuation token.
    #[must_use]
    pub fn into_parts(self) -> (Vec<InventorySummary>, Option<String>) {
        let summaries = self
            .payload
            .map(|p| p.inventory_summaries)
            .unwrap_or_default();
        let next = self
            .pagination
            .and_then(|p| p.next_token)
            .filter(|t| !t.is_empty());
        (summaries, next)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPayload {
    #[serde(default)]
    pub inventory_summaries: Vec<InventorySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    #[serde(default)]
    pub seller_sku: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub inventory_details: Option<InventoryDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetails {
    /// Kept raw: the upstream has been seen sending numbers, numeric strings
    /// and `"N/A"`.
    #[serde(default)]
    pub fulfillable_quantity: Option<serde_json::Value>,
}
