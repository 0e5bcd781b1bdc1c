//! Offset-paginated order search.

use crate::client::{MarketplaceClient, MAX_PAGES};
use crate::dates::DateWindow;
use crate::error::MarketplaceError;
use crate::types::SearchResponse;

/// Page size for `/orders/search`; a shorter page ends the listing.
pub const ORDERS_PAGE_SIZE: usize = 50;

impl MarketplaceClient {
    /// Fetches every order closed inside the padded upstream window.
    ///
    /// Records are returned raw and unfiltered; parsing and the local date
    /// check happen in [`MarketplaceClient::compute_sales_ledger`]. All pages
    /// are accumulated before returning.
    ///
    /// # Errors
    ///
    /// Propagates request failures, or returns
    /// [`MarketplaceError::PaginationLimit`] after `MAX_PAGES` full pages.
    pub async fn fetch_orders(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<serde_json::Value>, MarketplaceError> {
        let (from, to) = window.upstream_params();
        let mut orders: Vec<serde_json::Value> = Vec::new();
        let mut offset = 0usize;

        for page in 1..=MAX_PAGES {
            let mut url = self.endpoint("orders/search")?;
            url.query_pairs_mut()
                .append_pair("seller", &self.seller_id)
                .append_pair("order.date_closed.from", &from)
                .append_pair("order.date_closed.to", &to)
                .append_pair("limit", &ORDERS_PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            let response: SearchResponse<serde_json::Value> = self
                .get_json(&url, &format!("orders page {page}"), None)
                .await?;
            let count = response.results.len();
            orders.extend(response.results);
            tracing::debug!(page, count, total = orders.len(), "fetched orders page");

            if count < ORDERS_PAGE_SIZE {
                tracing::info!(total = orders.len(), pages = page, "orders retrieved");
                return Ok(orders);
            }
            offset += ORDERS_PAGE_SIZE;
        }

        Err(MarketplaceError::PaginationLimit {
            endpoint: "orders/search".to_owned(),
            max_pages: MAX_PAGES,
        })
    }
}
