//! Database operations for the `conciliation_mapping` table.

use sqlx::PgPool;
use stockrec_core::{validate_mappings, ConciliationMapping};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConciliationRow {
    warehouse_sku: String,
    marketplace_sku: String,
    product: String,
    warehouse_location: String,
    warehouse_quantity: i32,
}

impl From<ConciliationRow> for ConciliationMapping {
    fn from(row: ConciliationRow) -> Self {
        Self {
            warehouse_sku: row.warehouse_sku,
            marketplace_sku: row.marketplace_sku,
            product: row.product,
            warehouse_location: row.warehouse_location,
            warehouse_quantity: row.warehouse_quantity,
        }
    }
}

/// Loads every mapping row, reconciled or not, in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_conciliation_mapping(pool: &PgPool) -> Result<Vec<ConciliationMapping>, DbError> {
    let rows = sqlx::query_as::<_, ConciliationRow>(
        "SELECT warehouse_sku, marketplace_sku, product, warehouse_location, warehouse_quantity \
         FROM conciliation_mapping \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ConciliationMapping::from).collect())
}

/// Replaces the whole mapping with `mappings`.
///
/// Rows are validated first; a duplicate or blank key aborts the save before
/// any statement runs. Marketplace SKUs are stored trimmed. The delete and
/// insert share one transaction. Returns the number of rows written.
///
/// # Errors
///
/// - [`DbError::Validation`] if [`validate_mappings`] rejects the rows.
/// - [`DbError::Sqlx`] if any statement fails, including a unique index
///   violation; the transaction is rolled back.
pub async fn save_conciliation_mapping(
    pool: &PgPool,
    mappings: &[ConciliationMapping],
) -> Result<u64, DbError> {
    validate_mappings(mappings)?;

    let mut warehouse_skus: Vec<String> = Vec::with_capacity(mappings.len());
    let mut marketplace_skus: Vec<String> = Vec::with_capacity(mappings.len());
    let mut products: Vec<String> = Vec::with_capacity(mappings.len());
    let mut locations: Vec<String> = Vec::with_capacity(mappings.len());
    let mut quantities: Vec<i32> = Vec::with_capacity(mappings.len());

    for m in mappings {
        warehouse_skus.push(m.warehouse_sku.trim().to_owned());
        marketplace_skus.push(m.marketplace_sku.trim().to_owned());
        products.push(m.product.clone());
        locations.push(m.warehouse_location.clone());
        quantities.push(m.warehouse_quantity);
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM conciliation_mapping")
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query(
        "INSERT INTO conciliation_mapping \
             (warehouse_sku, marketplace_sku, product, warehouse_location, warehouse_quantity) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::int4[])",
    )
    .bind(&warehouse_skus)
    .bind(&marketplace_skus)
    .bind(&products)
    .bind(&locations)
    .bind(&quantities)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    let reconciled = mappings.iter().filter(|m| m.is_reconciled()).count();
    tracing::info!(inserted, reconciled, "conciliation mapping replaced");
    Ok(inserted)
}
