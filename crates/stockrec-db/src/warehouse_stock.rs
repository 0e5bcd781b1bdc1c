//! Database operations for the `warehouse_stock` snapshot table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stockrec_core::StockRow;

use crate::DbError;

/// A row from the `warehouse_stock` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WarehouseStockRow {
    pub id: i64,
    pub sku: String,
    pub product: String,
    pub location: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<WarehouseStockRow> for StockRow {
    fn from(row: WarehouseStockRow) -> Self {
        Self {
            sku: row.sku,
            product: row.product,
            location: row.location,
            quantity: u32::try_from(row.quantity).unwrap_or(0),
        }
    }
}

/// Replaces the warehouse snapshot with `rows`.
///
/// The delete and the bulk insert run in one transaction, so readers see
/// either the previous snapshot or the new one. Saving an empty slice clears
/// the table. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::QuantityOutOfRange`] before touching the database if a
/// quantity exceeds the column range, or [`DbError::Sqlx`] if any statement
/// fails (the transaction is rolled back).
pub async fn save_warehouse_stock(pool: &PgPool, rows: &[StockRow]) -> Result<u64, DbError> {
    let mut skus: Vec<String> = Vec::with_capacity(rows.len());
    let mut products: Vec<String> = Vec::with_capacity(rows.len());
    let mut locations: Vec<String> = Vec::with_capacity(rows.len());
    let mut quantities: Vec<i32> = Vec::with_capacity(rows.len());

    for row in rows {
        let quantity = i32::try_from(row.quantity).map_err(|_| DbError::QuantityOutOfRange {
            sku: row.sku.clone(),
            quantity: row.quantity,
        })?;
        skus.push(row.sku.clone());
        products.push(row.product.clone());
        locations.push(row.location.clone());
        quantities.push(quantity);
    }

    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM warehouse_stock")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let inserted = sqlx::query(
        "INSERT INTO warehouse_stock (sku, product, location, quantity) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::int4[])",
    )
    .bind(&skus)
    .bind(&products)
    .bind(&locations)
    .bind(&quantities)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    tracing::info!(deleted, inserted, "warehouse snapshot replaced");
    Ok(inserted)
}

/// Loads the current warehouse snapshot in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_warehouse_stock(pool: &PgPool) -> Result<Vec<StockRow>, DbError> {
    let rows = sqlx::query_as::<_, WarehouseStockRow>(
        "SELECT id, sku, product, location, quantity, updated_at \
         FROM warehouse_stock \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StockRow::from).collect())
}

/// When the current snapshot was written, or `None` if there is none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn warehouse_snapshot_taken_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, DbError> {
    let taken_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(updated_at) FROM warehouse_stock",
    )
    .fetch_one(pool)
    .await?;
    Ok(taken_at)
}
