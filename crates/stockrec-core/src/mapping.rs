//! Warehouse SKU to marketplace SKU cross-reference.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stock::StockRow;
use crate::{ConfigError, CoreError};

/// One persisted conciliation row.
///
/// `product`, `warehouse_location` and `warehouse_quantity` are cached from
/// the warehouse snapshot at mapping time. An empty `marketplace_sku` marks
/// the warehouse item as not yet reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConciliationMapping {
    pub warehouse_sku: String,
    pub marketplace_sku: String,
    pub product: String,
    pub warehouse_location: String,
    pub warehouse_quantity: i32,
}

impl ConciliationMapping {
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        !self.marketplace_sku.trim().is_empty()
    }
}

/// Top-level shape of a mapping YAML file.
///
/// ```yaml
/// mappings:
///   - warehouse_sku: DV-0001
///     marketplace_sku: DVLAVADORAPREMIUM
///   - warehouse_sku: DV-0002
///     marketplace_sku: ""
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MappingFile {
    pub mappings: Vec<MappingFileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingFileEntry {
    pub warehouse_sku: String,
    #[serde(default)]
    pub marketplace_sku: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub warehouse_location: Option<String>,
    #[serde(default)]
    pub warehouse_quantity: Option<i32>,
}

impl MappingFile {
    /// Builds full mapping rows, taking any omitted cached column from the
    /// current warehouse snapshot. Entries for SKUs absent from the snapshot
    /// fall back to an empty product, `default_location`, and quantity 0.
    #[must_use]
    pub fn resolve(self, snapshot: &[StockRow], default_location: &str) -> Vec<ConciliationMapping> {
        let by_sku: HashMap<&str, &StockRow> =
            snapshot.iter().map(|row| (row.sku.as_str(), row)).collect();

        self.mappings
            .into_iter()
            .map(|entry| {
                let warehouse_sku = entry.warehouse_sku.trim().to_owned();
                let live = by_sku.get(warehouse_sku.as_str()).copied();
                ConciliationMapping {
                    marketplace_sku: entry.marketplace_sku.trim().to_owned(),
                    product: entry
                        .product
                        .or_else(|| live.map(|r| r.product.clone()))
                        .unwrap_or_default(),
                    warehouse_location: entry
                        .warehouse_location
                        .or_else(|| live.map(|r| r.location.clone()))
                        .unwrap_or_else(|| default_location.to_owned()),
                    warehouse_quantity: entry
                        .warehouse_quantity
                        .or_else(|| live.and_then(|r| i32::try_from(r.quantity).ok()))
                        .unwrap_or(0),
                    warehouse_sku,
                }
            })
            .collect()
    }
}

/// Reads and parses a mapping YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::MappingFileIo`] if the file cannot be read or
/// [`ConfigError::MappingFileParse`] if it is not valid mapping YAML.
pub fn load_mapping_file(path: &Path) -> Result<MappingFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::MappingFileIo {
        path: path.display().to_string(),
        source,
    })?;
    let file: MappingFile = serde_yaml::from_str(&contents)?;
    Ok(file)
}

/// Checks the write-time invariants of a full mapping set.
///
/// # Errors
///
/// Returns [`CoreError`] for a blank warehouse SKU, a warehouse SKU listed
/// twice, or a non-empty marketplace SKU mapped to two warehouse SKUs.
pub fn validate_mappings(mappings: &[ConciliationMapping]) -> Result<(), CoreError> {
    let mut warehouse_seen: HashSet<&str> = HashSet::new();
    let mut marketplace_seen: HashMap<&str, &str> = HashMap::new();

    for (index, mapping) in mappings.iter().enumerate() {
        let warehouse_sku = mapping.warehouse_sku.trim();
        if warehouse_sku.is_empty() {
            return Err(CoreError::EmptyWarehouseSku { index });
        }
        if !warehouse_seen.insert(warehouse_sku) {
            return Err(CoreError::DuplicateWarehouseSku(warehouse_sku.to_owned()));
        }

        if !mapping.is_reconciled() {
            continue;
        }
        let marketplace_sku = mapping.marketplace_sku.trim();
        if let Some(first) = marketplace_seen.insert(marketplace_sku, warehouse_sku) {
            return Err(CoreError::DuplicateMarketplaceSku {
                sku: marketplace_sku.to_owned(),
                first: first.to_owned(),
                second: warehouse_sku.to_owned(),
            });
        }
    }
    Ok(())
}

/// Checks that every reconciled row points at a SKU the marketplace
/// actually lists. Unreconciled rows are not checked.
///
/// # Errors
///
/// Returns [`CoreError::UnknownMarketplaceSku`] for the first marketplace
/// SKU missing from `known_skus`.
pub fn validate_against_catalog(
    mappings: &[ConciliationMapping],
    known_skus: &HashSet<&str>,
) -> Result<(), CoreError> {
    for mapping in mappings.iter().filter(|m| m.is_reconciled()) {
        let sku = mapping.marketplace_sku.trim();
        if !known_skus.contains(sku) {
            return Err(CoreError::UnknownMarketplaceSku {
                sku: sku.to_owned(),
                warehouse_sku: mapping.warehouse_sku.trim().to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(warehouse: &str, marketplace: &str) -> ConciliationMapping {
        ConciliationMapping {
            warehouse_sku: warehouse.to_owned(),
            marketplace_sku: marketplace.to_owned(),
            product: "Lavadora".to_owned(),
            warehouse_location: "Own Warehouse".to_owned(),
            warehouse_quantity: 10,
        }
    }

    #[test]
    fn whitespace_marketplace_sku_is_unreconciled() {
        assert!(!mapping("W1", "   ").is_reconciled());
        assert!(mapping("W1", "M1").is_reconciled());
    }

    #[test]
    fn validate_accepts_many_unreconciled_rows() {
        let rows = vec![mapping("W1", ""), mapping("W2", ""), mapping("W3", "M3")];
        assert_eq!(validate_mappings(&rows), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicate_marketplace_sku() {
        let rows = vec![mapping("W1", "M1"), mapping("W2", "M1")];
        assert_eq!(
            validate_mappings(&rows),
            Err(CoreError::DuplicateMarketplaceSku {
                sku: "M1".to_owned(),
                first: "W1".to_owned(),
                second: "W2".to_owned(),
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_warehouse_sku() {
        let rows = vec![mapping("W1", "M1"), mapping("W1", "M2")];
        assert_eq!(
            validate_mappings(&rows),
            Err(CoreError::DuplicateWarehouseSku("W1".to_owned()))
        );
    }

    #[test]
    fn validate_rejects_blank_warehouse_sku() {
        let rows = vec![mapping("W1", "M1"), mapping(" ", "M2")];
        assert_eq!(
            validate_mappings(&rows),
            Err(CoreError::EmptyWarehouseSku { index: 1 })
        );
    }

    #[test]
    fn catalog_check_rejects_misspelled_marketplace_sku() {
        let known: HashSet<&str> = ["DVLAVADORAPREMIUM", "DV-220V"].into_iter().collect();
        let rows = vec![mapping("W1", "DVLAVADORAPREMUIM"), mapping("W2", "DV-220V")];
        assert_eq!(
            validate_against_catalog(&rows, &known),
            Err(CoreError::UnknownMarketplaceSku {
                sku: "DVLAVADORAPREMUIM".to_owned(),
                warehouse_sku: "W1".to_owned(),
            })
        );
    }

    #[test]
    fn catalog_check_ignores_unreconciled_rows_and_trims() {
        let known: HashSet<&str> = ["DV-220V"].into_iter().collect();
        let rows = vec![mapping("W1", " DV-220V "), mapping("W2", ""), mapping("W3", "  ")];
        assert_eq!(validate_against_catalog(&rows, &known), Ok(()));
    }

    #[test]
    fn catalog_check_with_empty_catalog_rejects_any_reconciled_row() {
        let known = HashSet::new();
        assert_eq!(validate_against_catalog(&[mapping("W1", "")], &known), Ok(()));
        assert!(validate_against_catalog(&[mapping("W1", "M1")], &known).is_err());
    }

    #[test]
    fn resolve_fills_cached_columns_from_snapshot() {
        let yaml = r#"
mappings:
  - warehouse_sku: W1
    marketplace_sku: M1
  - warehouse_sku: W2
    marketplace_sku: M2
    warehouse_quantity: 3
  - warehouse_sku: W9
"#;
        let file: MappingFile = serde_yaml::from_str(yaml).unwrap();
        let snapshot = vec![
            StockRow {
                sku: "W1".to_owned(),
                product: "Lavadora Premium".to_owned(),
                location: "Grupo Vision".to_owned(),
                quantity: 12,
            },
            StockRow {
                sku: "W2".to_owned(),
                product: "Secadora".to_owned(),
                location: "Own Warehouse".to_owned(),
                quantity: 40,
            },
        ];

        let rows = file.resolve(&snapshot, "Own Warehouse");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].product, "Lavadora Premium");
        assert_eq!(rows[0].warehouse_location, "Grupo Vision");
        assert_eq!(rows[0].warehouse_quantity, 12);
        assert_eq!(rows[1].warehouse_quantity, 3);
        assert_eq!(rows[2].marketplace_sku, "");
        assert_eq!(rows[2].warehouse_quantity, 0);
        assert_eq!(rows[2].warehouse_location, "Own Warehouse");
    }

    #[test]
    fn load_mapping_file_reports_missing_path() {
        let err = load_mapping_file(Path::new("/nonexistent/stockrec/mapping.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MappingFileIo { .. }));
    }
}
