//! Sales ledger: one refund-aware record per order line item.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stockrec_core::{SalesRecord, STATUS_PARTIALLY_REFUNDED};

use crate::client::MarketplaceClient;
use crate::dates::{local_offset, DateWindow};
use crate::error::MarketplaceError;
use crate::shipments::ShipmentCost;
use crate::types::{Order, ShipmentId};

/// Computed totals for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// Including the buyer's shipping cost.
    pub with_shipping: Decimal,
    pub without_shipping: Decimal,
}

/// Applies the settlement rule for one line item.
///
/// A partial refund makes `unit_price × quantity` meaningless, so the
/// order-level `paid_amount` is used for those orders instead.
#[must_use]
pub fn line_amounts(
    order_status: &str,
    unit_price: Decimal,
    quantity: u32,
    paid_amount: Decimal,
    logistic_cost: Decimal,
) -> LineAmounts {
    if order_status == STATUS_PARTIALLY_REFUNDED {
        LineAmounts {
            with_shipping: paid_amount + logistic_cost,
            without_shipping: paid_amount,
        }
    } else {
        let gross = unit_price * Decimal::from(quantity);
        LineAmounts {
            with_shipping: gross + logistic_cost,
            without_shipping: gross,
        }
    }
}

/// Parses raw order records, dropping malformed ones and those whose
/// closing date falls outside `window` in local time.
#[must_use]
pub fn qualifying_orders(raw: Vec<serde_json::Value>, window: &DateWindow) -> Vec<Order> {
    raw.into_iter()
        .filter_map(|value| {
            let order_id = value.get("id").and_then(serde_json::Value::as_u64);
            let order = match serde_json::from_value::<Order>(value) {
                Ok(order) => order,
                Err(e) => {
                    let err = MarketplaceError::MalformedRecord {
                        context: "order".to_owned(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(order_id, error = %err, "skipping order");
                    return None;
                }
            };
            if let Err(reason) = order.validate() {
                let err = MarketplaceError::MalformedRecord {
                    context: format!("order {}", order.id),
                    reason,
                };
                tracing::warn!(order_id = order.id, error = %err, "skipping order");
                return None;
            }
            if !window.contains(&order.date_closed) {
                tracing::warn!(
                    order_id = order.id,
                    date_closed = %order.date_closed,
                    "order outside requested date range"
                );
                return None;
            }
            Some(order)
        })
        .collect()
}

/// Expands qualifying orders into ledger records, in source order.
///
/// Shipments missing from `costs` use [`ShipmentCost::unknown`].
#[must_use]
pub fn build_ledger(
    orders: &[Order],
    costs: &HashMap<ShipmentId, ShipmentCost>,
) -> Vec<SalesRecord> {
    let fallback = ShipmentCost::unknown();
    let local = local_offset();
    let mut records = Vec::new();

    for order in orders {
        let cost = order
            .shipping
            .id
            .as_ref()
            .and_then(|id| costs.get(id))
            .unwrap_or(&fallback);

        for line in &order.order_items {
            let amounts = line_amounts(
                &order.status,
                line.unit_price,
                line.quantity,
                order.paid_amount,
                cost.cost,
            );
            records.push(SalesRecord {
                order_id: order.id,
                order_status: order.status.clone(),
                payment_status: order.payment_status().to_owned(),
                product_name: line.item.title.clone().unwrap_or_default(),
                sku: line.item.seller_sku.clone().unwrap_or_default(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                paid_amount: order.paid_amount,
                paid_amount_calculated: amounts.with_shipping,
                paid_amount_calculated_no_ship_cost: amounts.without_shipping,
                logistic_cost: cost.cost,
                logistic_type: cost.logistic_type.clone(),
                date: order.date_closed.with_timezone(&local),
            });
        }
    }
    records
}

impl MarketplaceClient {
    /// Builds the sales ledger for the inclusive civil date range.
    ///
    /// Pages are fetched in full first, then orders are re-validated against
    /// the local date range, shipment costs are resolved once for the
    /// distinct shipment ids of the qualifying orders, and only then are
    /// line items expanded.
    ///
    /// # Errors
    ///
    /// - [`MarketplaceError::InvalidDateRange`] if `start > end`.
    /// - Any error from [`MarketplaceClient::fetch_orders`]. Shipment lookup
    ///   failures never surface here.
    pub async fn compute_sales_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SalesRecord>, MarketplaceError> {
        let window = DateWindow::new(start, end)?;
        let raw = self.fetch_orders(&window).await?;
        let raw_count = raw.len();
        let orders = qualifying_orders(raw, &window);

        let costs = self
            .resolve_shipment_costs(orders.iter().filter_map(|o| o.shipping.id.as_ref()))
            .await;
        let records = build_ledger(&orders, &costs);

        let units: u64 = records.iter().map(|r| u64::from(r.quantity)).sum();
        let revenue: Decimal = records
            .iter()
            .map(|r| r.paid_amount_calculated_no_ship_cost)
            .sum();
        tracing::info!(
            raw_orders = raw_count,
            qualifying_orders = orders.len(),
            records = records.len(),
            units,
            revenue = %revenue,
            "sales ledger built"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn window() -> DateWindow {
        let day = NaiveDate::from_ymd_opt(2025, 4, 17).unwrap();
        DateWindow::new(day, day).unwrap()
    }

    fn raw_order(id: u64, status: &str, date_closed: &str) -> serde_json::Value {
        json!({
            "id": id,
            "status": status,
            "date_closed": date_closed,
            "order_items": [{
                "item": {"id": "MLB1", "title": "Lavadora", "seller_sku": "DVLAVADORAPREMIUM"},
                "quantity": 2,
                "unit_price": 100
            }],
            "payments": [{"status": "approved"}],
            "paid_amount": 150,
            "shipping": {"id": id * 10}
        })
    }

    #[test]
    fn partially_refunded_uses_paid_amount() {
        let amounts = line_amounts(
            STATUS_PARTIALLY_REFUNDED,
            dec("100"),
            2,
            dec("150"),
            dec("5"),
        );
        assert_eq!(amounts.without_shipping, dec("150"));
        assert_eq!(amounts.with_shipping, dec("155"));
    }

    #[test]
    fn other_statuses_use_unit_price_times_quantity() {
        for status in ["paid", "cancelled", "confirmed"] {
            let amounts = line_amounts(status, dec("99.90"), 3, dec("1"), dec("10"));
            assert_eq!(amounts.without_shipping, dec("299.70"), "status {status}");
            assert_eq!(amounts.with_shipping, dec("309.70"), "status {status}");
        }
    }

    #[test]
    fn qualifying_orders_skips_malformed_and_out_of_range() {
        let mut missing_payments = raw_order(3, "paid", "2025-04-17T12:00:00.000-04:00");
        missing_payments["payments"] = json!([]);
        let raw = vec![
            raw_order(1, "paid", "2025-04-17T12:00:00.000-04:00"),
            json!({"id": 2, "status": "paid"}),
            missing_payments,
            raw_order(4, "paid", "2025-04-17T23:30:00.000-04:00"),
        ];
        let orders = qualifying_orders(raw, &window());
        let ids: Vec<u64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn build_ledger_falls_back_for_missing_cost() {
        let orders = qualifying_orders(
            vec![raw_order(1, "paid", "2025-04-17T12:00:00.000-04:00")],
            &window(),
        );
        let records = build_ledger(&orders, &HashMap::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].logistic_type, "unknown");
        assert_eq!(records[0].logistic_cost, Decimal::ZERO);
        assert_eq!(records[0].paid_amount_calculated, dec("200"));
        assert_eq!(records[0].date.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(records[0].payment_status, "approved");
    }

    #[test]
    fn build_ledger_emits_one_record_per_line_item() {
        let mut value = raw_order(1, "paid", "2025-04-17T12:00:00.000-04:00");
        value["order_items"] = json!([
            {"item": {"id": "MLB1", "seller_sku": "A"}, "quantity": 1, "unit_price": 10},
            {"item": {"id": "MLB2", "seller_sku": "B"}, "quantity": 4, "unit_price": 5}
        ]);
        let orders = qualifying_orders(vec![value], &window());
        let mut costs = HashMap::new();
        costs.insert(
            ShipmentId::new("10"),
            ShipmentCost {
                logistic_type: "self_service".to_owned(),
                cost: dec("7"),
            },
        );
        let records = build_ledger(&orders, &costs);
        let skus: Vec<&str> = records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["A", "B"]);
        assert_eq!(records[1].paid_amount_calculated_no_ship_cost, dec("20"));
        assert_eq!(records[1].paid_amount_calculated, dec("27"));
        assert_eq!(records[0].product_name, "");
    }
}
