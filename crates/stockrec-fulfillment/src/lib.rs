//! Fulfillment inventory API client.
//!
//! Fetches the fulfillment-by-retailer inventory summaries and converts them
//! into canonical [`stockrec_core::StockRow`]s located at
//! [`stockrec_core::LOCATION_MARKETPLACE_FBA`].

mod auth;
pub mod client;
pub mod error;
pub mod inventory;
pub(crate) mod retry;
pub mod types;

pub use client::FulfillmentClient;
pub use error::FulfillmentError;
pub use inventory::{coerce_quantity, normalize_inventory};
pub use types::{InventorySummary, InventorySummariesResponse};
