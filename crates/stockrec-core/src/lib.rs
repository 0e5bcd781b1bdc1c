pub mod app_config;
pub mod config;
pub mod mapping;
pub mod reconcile;
pub mod sales;
pub mod stock;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, FulfillmentCredentials, MarketplaceCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use mapping::{
    load_mapping_file, validate_against_catalog, validate_mappings, ConciliationMapping,
    MappingFile, MappingFileEntry,
};
pub use reconcile::{
    conciliation_status, reconciled_warehouse_rows, unify_stock, ConciliationStatus,
};
pub use sales::{
    aggregate_by_day_and_sku, aggregate_by_month_and_sku, rank_skus_by_quantity,
    rank_skus_by_revenue, DailySkuSales, SalesAggregate, SalesRecord, SalesTotals, SkuRanking,
    STATUS_CANCELLED, STATUS_PARTIALLY_REFUNDED,
};
pub use stock::{
    dedup_by_sku_keep_last, normalize_warehouse_rows, truncate_product_name, StockRow,
    StockSummary, WarehouseScrapeRow, LOCATION_MARKETPLACE_FBA, LOCATION_MARKETPLACE_FULFILLED,
    MAX_PRODUCT_NAME_CHARS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("could not read mapping file {path}: {source}")]
    MappingFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse mapping file: {0}")]
    MappingFileParse(#[from] serde_yaml::Error),

    #[error("invalid mapping file: {0}")]
    Validation(#[from] CoreError),
}

/// Domain rule violations detected before anything is persisted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("mapping row {index} has an empty warehouse SKU")]
    EmptyWarehouseSku { index: usize },

    #[error("warehouse SKU '{0}' appears in more than one mapping row")]
    DuplicateWarehouseSku(String),

    #[error(
        "marketplace SKU '{sku}' is mapped to both warehouse SKU '{first}' and '{second}'"
    )]
    DuplicateMarketplaceSku {
        sku: String,
        first: String,
        second: String,
    },

    #[error(
        "marketplace SKU '{sku}' (warehouse SKU '{warehouse_sku}') is not listed in the marketplace catalog"
    )]
    UnknownMarketplaceSku { sku: String, warehouse_sku: String },
}
