//! Marketplace API response types.
//!
//! Orders are deserialized one at a time from the raw `results` array so a
//! single malformed record can be skipped without failing the page.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Envelope shared by `/orders/search` and `/users/{id}/items/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: String,
    pub date_closed: DateTime<FixedOffset>,
    pub order_items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub paid_amount: Decimal,
    pub shipping: Shipping,
}

impl Order {
    /// Checks the fields the ledger needs beyond what deserialization
    /// already enforces.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason naming the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.payments.is_empty() {
            return Err("no payment records".to_owned());
        }
        if self.shipping.id.is_none() {
            return Err("no shipment reference".to_owned());
        }
        if self.order_items.is_empty() {
            return Err("no order items".to_owned());
        }
        if let Some(item) = self.order_items.iter().find(|i| i.item.seller_sku.is_none()) {
            return Err(format!("item {} has no seller_sku", item.item.id));
        }
        Ok(())
    }

    #[must_use]
    pub fn payment_status(&self) -> &str {
        self.payments.first().map_or("", |p| p.status.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub item: OrderItemDetail,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemDetail {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub seller_sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Shipping {
    #[serde(default)]
    pub id: Option<ShipmentId>,
}

/// Shipment identifier. The API sends it as a JSON number on orders but it
/// is only ever used as an opaque path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "RawShipmentId")]
pub struct ShipmentId(String);

impl ShipmentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawShipmentId {
    Number(u64),
    Text(String),
}

impl From<RawShipmentId> for ShipmentId {
    fn from(raw: RawShipmentId) -> Self {
        match raw {
            RawShipmentId::Number(n) => Self(n.to_string()),
            RawShipmentId::Text(s) => Self(s),
        }
    }
}

/// `/shipments/{id}` payload, reduced to the cost columns.
#[derive(Debug, Clone, Deserialize)]
pub struct Shipment {
    #[serde(default)]
    pub logistic_type: Option<String>,
    #[serde(default)]
    pub shipping_option: Option<ShippingOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOption {
    #[serde(default)]
    pub cost: Option<Decimal>,
}

/// `/items/{id}` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDetail {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub catalog_listing: Option<bool>,
    #[serde(default)]
    pub available_quantity: Option<i64>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
    #[serde(default)]
    pub variations: Vec<ItemVariation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemVariation {
    #[serde(default)]
    pub available_quantity: Option<i64>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemAttribute {
    pub id: String,
    #[serde(default)]
    pub value_name: Option<String>,
}

/// Returns the `SELLER_SKU` attribute value, if present and non-blank.
#[must_use]
pub fn seller_sku(attributes: &[ItemAttribute]) -> Option<&str> {
    attributes
        .iter()
        .find(|a| a.id == "SELLER_SKU")
        .and_then(|a| a.value_name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
