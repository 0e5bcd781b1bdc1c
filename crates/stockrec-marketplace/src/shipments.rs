//! Shipment cost resolution with a per-session TTL cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::client::MarketplaceClient;
use crate::error::MarketplaceError;
use crate::types::{Shipment, ShipmentId};

/// Logistic type reported when a shipment cannot be looked up or the
/// payload omits it.
pub const UNKNOWN_LOGISTIC_TYPE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentCost {
    pub logistic_type: String,
    pub cost: Decimal,
}

impl ShipmentCost {
    /// Fallback for lookups that failed.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            logistic_type: UNKNOWN_LOGISTIC_TYPE.to_owned(),
            cost: Decimal::ZERO,
        }
    }
}

impl From<Shipment> for ShipmentCost {
    fn from(shipment: Shipment) -> Self {
        Self {
            logistic_type: shipment
                .logistic_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_LOGISTIC_TYPE.to_owned()),
            cost: shipment
                .shipping_option
                .and_then(|o| o.cost)
                .unwrap_or(Decimal::ZERO),
        }
    }
}

/// Successful lookups keyed by shipment id, expiring after `ttl`.
pub(crate) struct ShipmentCostCache {
    ttl: Duration,
    entries: Mutex<HashMap<ShipmentId, (Instant, ShipmentCost)>>,
}

impl ShipmentCostCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Entries are written whole, so a poisoned map is still consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<ShipmentId, (Instant, ShipmentCost)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, id: &ShipmentId) -> Option<ShipmentCost> {
        let mut entries = self.entries();
        match entries.get(id) {
            Some((stored_at, cost)) if stored_at.elapsed() < self.ttl => Some(cost.clone()),
            Some(_) => {
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    /// Stores `cost` and drops every entry that has outlived the TTL.
    pub(crate) fn insert(&self, id: ShipmentId, cost: ShipmentCost) {
        let ttl = self.ttl;
        let mut entries = self.entries();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(id, (Instant::now(), cost));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }
}

impl MarketplaceClient {
    /// Fetches one shipment's logistic type and buyer shipping cost.
    ///
    /// # Errors
    ///
    /// Propagates any [`MarketplaceError`] from the request.
    pub async fn fetch_shipment(&self, id: &ShipmentId) -> Result<ShipmentCost, MarketplaceError> {
        let url = self.endpoint(&format!("shipments/{id}"))?;
        let shipment: Shipment = self
            .get_json(&url, &format!("shipment {id}"), Some(self.shipment_timeout))
            .await?;
        Ok(shipment.into())
    }

    /// Resolves costs for every distinct id in `ids`.
    ///
    /// Cached entries are reused; the rest are fetched concurrently, at most
    /// `shipment_concurrency` at a time. The result always has one entry per
    /// distinct id: a failed lookup is logged and mapped to
    /// [`ShipmentCost::unknown`], and is not cached.
    pub async fn resolve_shipment_costs<'a, I>(&self, ids: I) -> HashMap<ShipmentId, ShipmentCost>
    where
        I: IntoIterator<Item = &'a ShipmentId>,
    {
        let unique: HashSet<&ShipmentId> = ids.into_iter().collect();
        let mut resolved: HashMap<ShipmentId, ShipmentCost> = HashMap::with_capacity(unique.len());
        let mut pending: Vec<&ShipmentId> = Vec::new();

        for id in unique {
            match self.shipment_cache.get(id) {
                Some(cost) => {
                    resolved.insert(id.clone(), cost);
                }
                None => pending.push(id),
            }
        }

        let cached = resolved.len();
        let fetched: Vec<(&ShipmentId, Result<ShipmentCost, MarketplaceError>)> =
            stream::iter(pending)
                .map(|id| async move { (id, self.fetch_shipment(id).await) })
                .buffer_unordered(self.shipment_concurrency)
                .collect()
                .await;

        let mut failed = 0usize;
        for (id, result) in fetched {
            match result {
                Ok(cost) => {
                    self.shipment_cache.insert(id.clone(), cost.clone());
                    resolved.insert(id.clone(), cost);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(shipment_id = %id, error = %e, "shipment lookup failed; using fallback");
                    resolved.insert(id.clone(), ShipmentCost::unknown());
                }
            }
        }

        tracing::debug!(
            total = resolved.len(),
            cached,
            failed,
            "shipment costs resolved"
        );
        resolved
    }
}
