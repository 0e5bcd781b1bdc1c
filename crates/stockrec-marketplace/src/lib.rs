//! Marketplace API client: sales ledger, shipment costs and listing stock.

mod auth;
pub mod client;
pub mod dates;
pub mod error;
pub mod ledger;
pub mod orders;
mod rate_limit;
pub mod shipments;
pub mod stock;
pub mod types;

pub use client::MarketplaceClient;
pub use dates::{parse_civil_date, DateWindow};
pub use error::MarketplaceError;
pub use ledger::{build_ledger, line_amounts, qualifying_orders, LineAmounts};
pub use shipments::{ShipmentCost, UNKNOWN_LOGISTIC_TYPE};
pub use stock::item_stock_rows;
pub use types::{Order, ShipmentId};
