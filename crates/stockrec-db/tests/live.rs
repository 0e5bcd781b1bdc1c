//! Live integration tests for stockrec-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/stockrec-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `DATABASE_URL` set and `--ignored`.

use stockrec_core::{ConciliationMapping, StockRow};
use stockrec_db::{
    load_conciliation_mapping, load_warehouse_stock, save_conciliation_mapping,
    save_warehouse_stock, warehouse_snapshot_taken_at, DbError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stock(sku: &str, quantity: u32) -> StockRow {
    StockRow {
        sku: sku.to_string(),
        product: format!("Produto {sku}"),
        location: "Own Warehouse".to_string(),
        quantity,
    }
}

fn mapping(warehouse: &str, marketplace: &str) -> ConciliationMapping {
    ConciliationMapping {
        warehouse_sku: warehouse.to_string(),
        marketplace_sku: marketplace.to_string(),
        product: format!("Produto {warehouse}"),
        warehouse_location: "Own Warehouse".to_string(),
        warehouse_quantity: 5,
    }
}

// ---------------------------------------------------------------------------
// warehouse_stock
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn warehouse_save_replaces_previous_snapshot(pool: sqlx::PgPool) {
    assert!(warehouse_snapshot_taken_at(&pool).await.unwrap().is_none());

    save_warehouse_stock(&pool, &[stock("DV-0001", 3), stock("DV-0002", 4)])
        .await
        .expect("first save");
    let written = save_warehouse_stock(&pool, &[stock("DV-0003", 9)])
        .await
        .expect("second save");
    assert_eq!(written, 1);

    let loaded = load_warehouse_stock(&pool).await.expect("load");
    assert_eq!(loaded, vec![stock("DV-0003", 9)]);
    assert!(warehouse_snapshot_taken_at(&pool).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn warehouse_save_of_empty_slice_clears_table(pool: sqlx::PgPool) {
    save_warehouse_stock(&pool, &[stock("DV-0001", 3)]).await.unwrap();
    save_warehouse_stock(&pool, &[]).await.unwrap();
    assert!(load_warehouse_stock(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn warehouse_out_of_range_quantity_leaves_snapshot_untouched(pool: sqlx::PgPool) {
    save_warehouse_stock(&pool, &[stock("DV-0001", 3)]).await.unwrap();
    let result = save_warehouse_stock(&pool, &[stock("DV-0002", u32::MAX)]).await;
    assert!(
        matches!(result, Err(DbError::QuantityOutOfRange { .. })),
        "expected QuantityOutOfRange, got: {result:?}"
    );
    assert_eq!(load_warehouse_stock(&pool).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// conciliation_mapping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn mapping_round_trip_keeps_unreconciled_rows(pool: sqlx::PgPool) {
    let rows = vec![
        mapping("DV-0001", "DVLAVADORAPREMIUM"),
        mapping("DV-0002", ""),
        mapping("DV-0003", ""),
    ];
    save_conciliation_mapping(&pool, &rows).await.expect("save");

    let loaded = load_conciliation_mapping(&pool).await.expect("load");
    assert_eq!(loaded, rows);
    assert_eq!(loaded.iter().filter(|m| m.is_reconciled()).count(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn mapping_rejects_duplicate_marketplace_sku_without_writing(pool: sqlx::PgPool) {
    save_conciliation_mapping(&pool, &[mapping("DV-0001", "M1")])
        .await
        .unwrap();

    let result = save_conciliation_mapping(
        &pool,
        &[mapping("DV-0002", "M2"), mapping("DV-0003", "M2")],
    )
    .await;
    assert!(
        matches!(result, Err(DbError::Validation(_))),
        "expected Validation, got: {result:?}"
    );

    let loaded = load_conciliation_mapping(&pool).await.unwrap();
    assert_eq!(loaded, vec![mapping("DV-0001", "M1")]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres DATABASE_URL"]
async fn partial_unique_index_guards_marketplace_sku(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO conciliation_mapping (warehouse_sku, marketplace_sku) \
         VALUES ('A', 'M1'), ('B', ''), ('C', '')",
    )
    .execute(&pool)
    .await
    .expect("empty marketplace SKUs may repeat");

    let dup = sqlx::query(
        "INSERT INTO conciliation_mapping (warehouse_sku, marketplace_sku) VALUES ('D', 'M1')",
    )
    .execute(&pool)
    .await;
    assert!(dup.is_err(), "non-empty marketplace SKU must be unique");
}
