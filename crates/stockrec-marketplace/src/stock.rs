//! Seller-fulfilled listing stock.

use futures::stream::{self, StreamExt};
use stockrec_core::{
    dedup_by_sku_keep_last, truncate_product_name, StockRow, LOCATION_MARKETPLACE_FULFILLED,
};

use crate::client::{MarketplaceClient, MAX_PAGES};
use crate::error::MarketplaceError;
use crate::types::{seller_sku, ItemDetail, SearchResponse};

/// Page size for the active-items listing.
pub const ITEMS_PAGE_SIZE: usize = 50;

/// Expands one listing into canonical rows, one per variation.
///
/// Catalog listings yield nothing. A variation without its own `SELLER_SKU`
/// inherits the item's; with neither, the item id stands in.
#[must_use]
pub fn item_stock_rows(item: &ItemDetail) -> Vec<StockRow> {
    if item.catalog_listing.unwrap_or(false) {
        return Vec::new();
    }

    let item_sku = seller_sku(&item.attributes);
    let product = truncate_product_name(&item.title);
    let row = |sku: Option<&str>, quantity: Option<i64>| StockRow {
        sku: sku.or(item_sku).unwrap_or(item.id.as_str()).to_owned(),
        product: product.clone(),
        location: LOCATION_MARKETPLACE_FULFILLED.to_owned(),
        quantity: clamp_quantity(quantity),
    };

    if item.variations.is_empty() {
        return vec![row(None, item.available_quantity)];
    }
    item.variations
        .iter()
        .map(|v| row(seller_sku(&v.attributes), v.available_quantity))
        .collect()
}

fn clamp_quantity(quantity: Option<i64>) -> u32 {
    quantity.map_or(0, |q| u32::try_from(q.max(0)).unwrap_or(u32::MAX))
}

impl MarketplaceClient {
    /// Lists the ids of the seller's active items.
    ///
    /// # Errors
    ///
    /// Propagates request failures, or returns
    /// [`MarketplaceError::PaginationLimit`] after `MAX_PAGES` full pages.
    pub async fn fetch_active_item_ids(&self) -> Result<Vec<String>, MarketplaceError> {
        let path = format!("users/{}/items/search", self.seller_id);
        let mut ids: Vec<String> = Vec::new();
        let mut offset = 0usize;

        for page in 1..=MAX_PAGES {
            let mut url = self.endpoint(&path)?;
            url.query_pairs_mut()
                .append_pair("status", "active")
                .append_pair("limit", &ITEMS_PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            let response: SearchResponse<String> = self
                .get_json(&url, &format!("active items page {page}"), None)
                .await?;
            let count = response.results.len();
            ids.extend(response.results);

            if count < ITEMS_PAGE_SIZE {
                return Ok(ids);
            }
            offset += ITEMS_PAGE_SIZE;
        }

        Err(MarketplaceError::PaginationLimit {
            endpoint: path,
            max_pages: MAX_PAGES,
        })
    }

    /// # Errors
    ///
    /// Propagates any [`MarketplaceError`] from the request.
    pub async fn fetch_item(&self, id: &str) -> Result<ItemDetail, MarketplaceError> {
        let mut url = self.endpoint(&format!("items/{id}"))?;
        url.query_pairs_mut().append_pair("include_attributes", "all");
        self.get_json(&url, &format!("item {id}"), None).await
    }

    /// Current stock of every active, non-catalog listing as canonical rows,
    /// deduplicated by SKU keeping the last row seen.
    ///
    /// Item details are fetched concurrently but consumed in listing order.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the listing or any item fetch fails, so a partial
    /// snapshot is never reported as the full stock.
    pub async fn fetch_stock(&self) -> Result<Vec<StockRow>, MarketplaceError> {
        let ids = self.fetch_active_item_ids().await?;
        let items: Vec<Result<ItemDetail, MarketplaceError>> = stream::iter(ids.iter())
            .map(|id| self.fetch_item(id))
            .buffered(self.shipment_concurrency)
            .collect()
            .await;

        let mut rows = Vec::new();
        let mut catalog = 0usize;
        for item in items {
            let item = item?;
            if item.catalog_listing.unwrap_or(false) {
                catalog += 1;
                continue;
            }
            rows.extend(item_stock_rows(&item));
        }

        let rows = dedup_by_sku_keep_last(rows);
        tracing::info!(
            active_items = ids.len(),
            catalog_listings = catalog,
            rows = rows.len(),
            "marketplace stock fetched"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> ItemDetail {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn item_without_variations_uses_item_sku() {
        let rows = item_stock_rows(&item(json!({
            "id": "MLB1",
            "title": "Lavadora Premium",
            "available_quantity": 8,
            "attributes": [{"id": "SELLER_SKU", "value_name": "DVLAVADORAPREMIUM"}]
        })));
        assert_eq!(
            rows,
            vec![StockRow {
                sku: "DVLAVADORAPREMIUM".to_owned(),
                product: "Lavadora Premium".to_owned(),
                location: LOCATION_MARKETPLACE_FULFILLED.to_owned(),
                quantity: 8,
            }]
        );
    }

    #[test]
    fn variations_fall_back_to_item_sku_then_item_id() {
        let rows = item_stock_rows(&item(json!({
            "id": "MLB2",
            "title": "Secadora",
            "attributes": [{"id": "SELLER_SKU", "value_name": "SEC-BASE"}],
            "variations": [
                {"available_quantity": 3, "attributes": [{"id": "SELLER_SKU", "value_name": "SEC-110V"}]},
                {"available_quantity": 4, "attributes": []}
            ]
        })));
        let skus: Vec<&str> = rows.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["SEC-110V", "SEC-BASE"]);

        let rows = item_stock_rows(&item(json!({
            "id": "MLB3",
            "title": "Sem SKU",
            "available_quantity": 1
        })));
        assert_eq!(rows[0].sku, "MLB3");
    }

    #[test]
    fn catalog_listing_yields_no_rows() {
        let rows = item_stock_rows(&item(json!({
            "id": "MLB4",
            "title": "Catalogo",
            "catalog_listing": true,
            "available_quantity": 10
        })));
        assert!(rows.is_empty());
    }

    #[test]
    fn negative_and_missing_quantities_clamp_to_zero() {
        assert_eq!(clamp_quantity(Some(-4)), 0);
        assert_eq!(clamp_quantity(None), 0);
        assert_eq!(clamp_quantity(Some(12)), 12);
    }

    #[test]
    fn long_titles_are_truncated() {
        let rows = item_stock_rows(&item(json!({
            "id": "MLB5",
            "title": "x".repeat(120),
            "available_quantity": 1
        })));
        assert_eq!(rows[0].product.chars().count(), 70);
    }
}
