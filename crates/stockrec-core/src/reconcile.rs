//! SKU reconciliation join across the three inventory sources.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::mapping::ConciliationMapping;
use crate::stock::StockRow;

/// Re-keys warehouse stock under marketplace SKUs using the mapping.
///
/// Unreconciled mappings are skipped. When the live snapshot carries the
/// warehouse SKU with a different quantity than the one cached on the
/// mapping, the live quantity wins. A warehouse SKU missing from a
/// non-empty snapshot keeps its cached quantity; an empty snapshot yields
/// no rows at all.
#[must_use]
pub fn reconciled_warehouse_rows(
    mappings: &[ConciliationMapping],
    warehouse: &[StockRow],
) -> Vec<StockRow> {
    if warehouse.is_empty() {
        return Vec::new();
    }

    let live: HashMap<&str, u32> = warehouse
        .iter()
        .map(|row| (row.sku.as_str(), row.quantity))
        .collect();

    mappings
        .iter()
        .filter(|m| m.is_reconciled())
        .map(|m| {
            let cached = u32::try_from(m.warehouse_quantity).unwrap_or(0);
            let quantity = match live.get(m.warehouse_sku.trim()) {
                Some(&fresh) if fresh != cached => {
                    tracing::debug!(
                        warehouse_sku = %m.warehouse_sku,
                        cached,
                        fresh,
                        "warehouse quantity changed since mapping"
                    );
                    fresh
                }
                _ => cached,
            };
            StockRow {
                sku: m.marketplace_sku.trim().to_owned(),
                product: m.product.clone(),
                location: m.warehouse_location.clone(),
                quantity,
            }
        })
        .collect()
}

/// Unions the marketplace fulfilled feed, the FBA feed and the reconciled
/// warehouse rows, in that order.
#[must_use]
pub fn unify_stock(
    fulfilled: &[StockRow],
    fba: &[StockRow],
    warehouse: &[StockRow],
    mappings: &[ConciliationMapping],
) -> Vec<StockRow> {
    let reconciled = reconciled_warehouse_rows(mappings, warehouse);
    let mut unified = Vec::with_capacity(fulfilled.len() + fba.len() + reconciled.len());
    unified.extend_from_slice(fulfilled);
    unified.extend_from_slice(fba);
    unified.extend(reconciled);
    unified
}

/// Reconciliation state of one warehouse SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConciliationStatus {
    pub warehouse_sku: String,
    pub product: String,
    pub location: String,
    pub quantity: u32,
    /// `None` until the SKU is mapped to a marketplace listing.
    pub marketplace_sku: Option<String>,
}

impl ConciliationStatus {
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.marketplace_sku.is_some()
    }
}

/// Lists every warehouse SKU with its mapping state.
///
/// Snapshot rows come first, in snapshot order. Mapped SKUs absent from the
/// snapshot follow with their cached columns.
#[must_use]
pub fn conciliation_status(
    warehouse: &[StockRow],
    mappings: &[ConciliationMapping],
) -> Vec<ConciliationStatus> {
    let by_sku: HashMap<&str, &ConciliationMapping> = mappings
        .iter()
        .map(|m| (m.warehouse_sku.trim(), m))
        .collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(warehouse.len());
    let mut rows: Vec<ConciliationStatus> = warehouse
        .iter()
        .map(|row| {
            seen.insert(row.sku.as_str());
            ConciliationStatus {
                warehouse_sku: row.sku.clone(),
                product: row.product.clone(),
                location: row.location.clone(),
                quantity: row.quantity,
                marketplace_sku: mapped_sku(by_sku.get(row.sku.as_str()).copied()),
            }
        })
        .collect();

    rows.extend(
        mappings
            .iter()
            .filter(|m| !seen.contains(m.warehouse_sku.trim()))
            .map(|m| ConciliationStatus {
                warehouse_sku: m.warehouse_sku.trim().to_owned(),
                product: m.product.clone(),
                location: m.warehouse_location.clone(),
                quantity: u32::try_from(m.warehouse_quantity).unwrap_or(0),
                marketplace_sku: mapped_sku(Some(m)),
            }),
    );
    rows
}

fn mapped_sku(mapping: Option<&ConciliationMapping>) -> Option<String> {
    mapping
        .filter(|m| m.is_reconciled())
        .map(|m| m.marketplace_sku.trim().to_owned())
}
