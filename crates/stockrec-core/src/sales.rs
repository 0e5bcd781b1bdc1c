//! Sales ledger records and the report aggregations built on them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_PARTIALLY_REFUNDED: &str = "partially_refunded";

/// One order line item with its refund-aware financials.
///
/// `paid_amount_calculated_no_ship_cost` is `unit_price × quantity` except for
/// partially refunded orders, where it is the order-level `paid_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    pub order_id: u64,
    pub order_status: String,
    pub payment_status: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub paid_amount: Decimal,
    pub paid_amount_calculated: Decimal,
    pub paid_amount_calculated_no_ship_cost: Decimal,
    pub logistic_cost: Decimal,
    pub logistic_type: String,
    pub date: DateTime<FixedOffset>,
}

impl SalesRecord {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.order_status == STATUS_CANCELLED
    }
}

/// Units and revenue for one SKU in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesAggregate {
    /// `MM/YYYY`.
    pub month: String,
    pub sku: String,
    pub quantity: u64,
    pub revenue: Decimal,
    #[serde(skip)]
    year_month: (i32, u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesTotals {
    pub quantity: u64,
    pub revenue: Decimal,
}

/// Groups non-cancelled records by month and SKU.
///
/// Rows are sorted newest month first, then by quantity descending; ties keep
/// SKU order so the output is deterministic. Revenue is the no-ship amount,
/// with each line rounded to cents before summing the totals.
#[must_use]
pub fn aggregate_by_month_and_sku(records: &[SalesRecord]) -> (Vec<SalesAggregate>, SalesTotals) {
    let mut groups: HashMap<((i32, u32), &str), (u64, Decimal)> = HashMap::new();
    let mut totals = SalesTotals::default();

    for record in records.iter().filter(|r| !r.is_cancelled()) {
        let key = (
            (record.date.year(), record.date.month()),
            record.sku.as_str(),
        );
        let entry = groups.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += u64::from(record.quantity);
        entry.1 += record.paid_amount_calculated_no_ship_cost;

        totals.quantity += u64::from(record.quantity);
        totals.revenue += record.paid_amount_calculated_no_ship_cost.round_dp(2);
    }

    let mut rows: Vec<SalesAggregate> = groups
        .into_iter()
        .map(|(((year, month), sku), (quantity, revenue))| SalesAggregate {
            month: format!("{month:02}/{year}"),
            sku: sku.to_owned(),
            quantity,
            revenue,
            year_month: (year, month),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.year_month
            .cmp(&a.year_month)
            .then(b.quantity.cmp(&a.quantity))
            .then_with(|| a.sku.cmp(&b.sku))
    });

    (rows, totals)
}

/// Units and revenue for one SKU on one local calendar day, with running
/// totals for that SKU up to and including the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySkuSales {
    pub date: NaiveDate,
    pub sku: String,
    pub quantity: u64,
    pub revenue: Decimal,
    pub cumulative_quantity: u64,
    pub cumulative_revenue: Decimal,
}

/// Groups every ledger line by local day and SKU.
///
/// Rows come out by day ascending, then SKU. The cumulative columns restart
/// for each SKU. Cancelled lines are included, as in the raw ledger.
#[must_use]
pub fn aggregate_by_day_and_sku(records: &[SalesRecord]) -> Vec<DailySkuSales> {
    let mut groups: BTreeMap<(NaiveDate, &str), (u64, Decimal)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((record.date.date_naive(), record.sku.as_str()))
            .or_insert((0, Decimal::ZERO));
        entry.0 += u64::from(record.quantity);
        entry.1 += record.paid_amount_calculated_no_ship_cost;
    }

    let mut running: HashMap<&str, (u64, Decimal)> = HashMap::new();
    groups
        .into_iter()
        .map(|((date, sku), (quantity, revenue))| {
            let total = running.entry(sku).or_insert((0, Decimal::ZERO));
            total.0 += quantity;
            total.1 += revenue;
            DailySkuSales {
                date,
                sku: sku.to_owned(),
                quantity,
                revenue,
                cumulative_quantity: total.0,
                cumulative_revenue: total.1,
            }
        })
        .collect()
}

/// One SKU's position in a sales ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuRanking {
    /// 1-based.
    pub rank: usize,
    pub sku: String,
    pub quantity: u64,
    pub revenue: Decimal,
}

fn sku_totals(records: &[SalesRecord]) -> Vec<SkuRanking> {
    let mut totals: HashMap<&str, (u64, Decimal)> = HashMap::new();
    for record in records {
        let entry = totals.entry(record.sku.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += u64::from(record.quantity);
        entry.1 += record.paid_amount_calculated_no_ship_cost;
    }
    totals
        .into_iter()
        .map(|(sku, (quantity, revenue))| SkuRanking {
            rank: 0,
            sku: sku.to_owned(),
            quantity,
            revenue,
        })
        .collect()
}

fn ranked(mut rows: Vec<SkuRanking>, top: Option<usize>) -> Vec<SkuRanking> {
    if let Some(top) = top {
        rows.truncate(top);
    }
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    rows
}

/// Ranks SKUs by units sold, highest first, keeping the first `top` when
/// given. Ties break on revenue, then SKU.
#[must_use]
pub fn rank_skus_by_quantity(records: &[SalesRecord], top: Option<usize>) -> Vec<SkuRanking> {
    let mut rows = sku_totals(records);
    rows.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue.cmp(&a.revenue))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    ranked(rows, top)
}

/// Ranks SKUs by no-ship revenue, highest first, keeping the first `top`
/// when given. Ties break on units, then SKU.
#[must_use]
pub fn rank_skus_by_revenue(records: &[SalesRecord], top: Option<usize>) -> Vec<SkuRanking> {
    let mut rows = sku_totals(records);
    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.quantity.cmp(&a.quantity))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    ranked(rows, top)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn record(sku: &str, status: &str, qty: u32, no_ship: &str, date: &str) -> SalesRecord {
        let amount = Decimal::from_str(no_ship).unwrap();
        SalesRecord {
            order_id: 1,
            order_status: status.to_owned(),
            payment_status: "approved".to_owned(),
            product_name: format!("Product {sku}"),
            sku: sku.to_owned(),
            quantity: qty,
            unit_price: amount,
            paid_amount: amount,
            paid_amount_calculated: amount,
            paid_amount_calculated_no_ship_cost: amount,
            logistic_cost: Decimal::ZERO,
            logistic_type: "fulfillment".to_owned(),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
        }
    }

    #[test]
    fn cancelled_orders_are_excluded() {
        let records = vec![
            record("A", "paid", 2, "200", "2025-04-17T10:00:00-03:00"),
            record("A", STATUS_CANCELLED, 5, "500", "2025-04-17T11:00:00-03:00"),
        ];
        let (rows, totals) = aggregate_by_month_and_sku(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(totals.quantity, 2);
        assert_eq!(totals.revenue, Decimal::from(200));
    }

    #[test]
    fn groups_by_month_and_sku() {
        let records = vec![
            record("A", "paid", 1, "100", "2025-04-01T10:00:00-03:00"),
            record("A", STATUS_PARTIALLY_REFUNDED, 2, "150", "2025-04-20T10:00:00-03:00"),
            record("B", "paid", 1, "50", "2025-04-20T10:00:00-03:00"),
        ];
        let (rows, _) = aggregate_by_month_and_sku(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "04/2025");
        assert_eq!(rows[0].sku, "A");
        assert_eq!(rows[0].quantity, 3);
        assert_eq!(rows[0].revenue, Decimal::from(250));
    }

    #[test]
    fn newest_month_first_then_quantity_descending() {
        let records = vec![
            record("A", "paid", 1, "10", "2024-12-05T10:00:00-03:00"),
            record("B", "paid", 1, "10", "2025-01-05T10:00:00-03:00"),
            record("C", "paid", 4, "40", "2025-01-06T10:00:00-03:00"),
        ];
        let (rows, totals) = aggregate_by_month_and_sku(&records);
        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.month.as_str(), r.sku.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("01/2025", "C"), ("01/2025", "B"), ("12/2024", "A")]
        );
        assert_eq!(totals.quantity, 6);
    }

    #[test]
    fn totals_round_each_line_to_cents() {
        let records = vec![
            record("A", "paid", 1, "10.005", "2025-04-01T10:00:00-03:00"),
            record("A", "paid", 1, "10.005", "2025-04-01T10:00:00-03:00"),
        ];
        let (_, totals) = aggregate_by_month_and_sku(&records);
        assert_eq!(totals.revenue, Decimal::from_str("20.00").unwrap());
    }

    #[test]
    fn empty_input_yields_zero_totals() {
        let (rows, totals) = aggregate_by_month_and_sku(&[]);
        assert!(rows.is_empty());
        assert_eq!(totals, SalesTotals::default());
    }

    #[test]
    fn daily_rows_carry_per_sku_running_totals() {
        let records = vec![
            record("A", "paid", 2, "200", "2025-04-02T09:00:00-03:00"),
            record("B", "paid", 1, "50", "2025-04-01T09:00:00-03:00"),
            record("A", "paid", 1, "100", "2025-04-01T09:00:00-03:00"),
            record("A", "paid", 3, "300", "2025-04-01T18:00:00-03:00"),
            record("B", "paid", 2, "100", "2025-04-03T09:00:00-03:00"),
        ];
        let rows = aggregate_by_day_and_sku(&records);
        let table: Vec<(String, &str, u64, u64, Decimal)> = rows
            .iter()
            .map(|r| {
                (
                    r.date.format("%d/%m").to_string(),
                    r.sku.as_str(),
                    r.quantity,
                    r.cumulative_quantity,
                    r.cumulative_revenue,
                )
            })
            .collect();
        assert_eq!(
            table,
            vec![
                ("01/04".to_owned(), "A", 4, 4, Decimal::from(400)),
                ("01/04".to_owned(), "B", 1, 1, Decimal::from(50)),
                ("02/04".to_owned(), "A", 2, 6, Decimal::from(600)),
                ("03/04".to_owned(), "B", 2, 3, Decimal::from(150)),
            ]
        );
    }

    #[test]
    fn daily_grouping_uses_the_local_day() {
        let records = vec![
            record("A", "paid", 1, "10", "2025-04-01T23:30:00-03:00"),
            record("A", "paid", 1, "10", "2025-04-02T00:30:00-03:00"),
        ];
        let rows = aggregate_by_day_and_sku(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    }

    #[test]
    fn rankings_order_by_their_own_measure_and_cut_at_top() {
        let records = vec![
            record("CHEAP", "paid", 10, "100", "2025-04-01T10:00:00-03:00"),
            record("PRICEY", "paid", 1, "900", "2025-04-01T10:00:00-03:00"),
            record("MID", "paid", 5, "500", "2025-04-02T10:00:00-03:00"),
            record("MID", "paid", 1, "100", "2025-04-03T10:00:00-03:00"),
        ];

        let by_units = rank_skus_by_quantity(&records, None);
        let order: Vec<(usize, &str, u64)> = by_units
            .iter()
            .map(|r| (r.rank, r.sku.as_str(), r.quantity))
            .collect();
        assert_eq!(order, vec![(1, "CHEAP", 10), (2, "MID", 6), (3, "PRICEY", 1)]);

        let by_revenue = rank_skus_by_revenue(&records, Some(2));
        let order: Vec<(usize, &str)> = by_revenue.iter().map(|r| (r.rank, r.sku.as_str())).collect();
        assert_eq!(order, vec![(1, "PRICEY"), (2, "MID")]);
        assert_eq!(by_revenue[1].revenue, Decimal::from(600));
    }

    #[test]
    fn ranking_ties_are_deterministic() {
        let records = vec![
            record("B", "paid", 1, "10", "2025-04-01T10:00:00-03:00"),
            record("A", "paid", 1, "10", "2025-04-01T10:00:00-03:00"),
        ];
        let skus: Vec<String> = rank_skus_by_quantity(&records, Some(5))
            .into_iter()
            .map(|r| r.sku)
            .collect();
        assert_eq!(skus, vec!["A", "B"]);
        assert!(rank_skus_by_revenue(&[], Some(5)).is_empty());
    }
}
