// ==========================================
// MRP 订单系统 - BOM 导入
// ==========================================
// 列: part（名称或 IPN）、quantity、reference、optional、consumable
// 红线: 全部行校验通过才写入（单事务）
// ==========================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::catalog_api::validate_bom_item;
use crate::api::error::ApiError;
use crate::db::Database;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::part::BomItem;
use crate::engine::quantity::round_qty;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::perf::PerfGuard;
use crate::repository::{ActionLogRepository, PartRepository};

const REQUIRED_COLUMNS: [&str; 2] = ["part", "quantity"];

/// 导入结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomImportSummary {
    pub assembly_id: i64,
    pub imported: usize,
    pub bom_item_ids: Vec<i64>,
}

fn parse_bool(record: &RawRecord, column: &str) -> ImportResult<bool> {
    match record.get(column).map(|v| v.to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "y" | "x" => Ok(true),
            "0" | "false" | "no" | "n" => Ok(false),
            _ => Err(ImportError::row(record.row, column, format!("无法识别的布尔值: {}", v))),
        },
    }
}

/// 校验错误转换为行错误
fn row_error(row: usize, err: ApiError) -> ImportError {
    match err {
        ApiError::FieldValueError { field, message } => ImportError::RowError {
            row,
            field,
            message,
        },
        other => ImportError::row(row, "", other.message()),
    }
}

// ==========================================
// BomImporter
// ==========================================
pub struct BomImporter {
    db: Database,
}

impl BomImporter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 导入 BOM 文件到装配件
    pub fn import<P: AsRef<Path>>(
        &self,
        assembly_id: i64,
        path: P,
        user: &str,
    ) -> ImportResult<BomImportSummary> {
        let _perf = PerfGuard::new("import_bom");
        let path = path.as_ref();
        let records = UniversalFileParser.parse(path)?;
        if records.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        for column in REQUIRED_COLUMNS {
            if !records[0].has_column(column) {
                return Err(ImportError::MissingColumn(column.to_string()));
            }
        }

        let summary = self.db.with_transaction(|tx| {
            let parts = PartRepository::new(tx);
            parts.get(assembly_id)?;

            let mut ids = Vec::new();
            for record in &records {
                let name = record
                    .get("part")
                    .ok_or_else(|| ImportError::row(record.row, "part", "零件不能为空"))?;
                let mut matches = parts.find_by_name_or_ipn(name)?;
                if matches.len() > 1 {
                    return Err(ImportError::row(
                        record.row,
                        "part",
                        format!("零件名称不唯一: {}", name),
                    ));
                }
                let sub_part = matches.pop().ok_or_else(|| {
                    ImportError::row(record.row, "part", format!("零件不存在: {}", name))
                })?;

                let raw_qty = record
                    .get("quantity")
                    .ok_or_else(|| ImportError::row(record.row, "quantity", "数量不能为空"))?;
                let quantity = raw_qty.parse::<f64>().map_err(|_| {
                    ImportError::row(record.row, "quantity", format!("无效数量: {}", raw_qty))
                })?;

                let mut bom = BomItem {
                    id: 0,
                    part_id: assembly_id,
                    sub_part_id: sub_part.id,
                    quantity: round_qty(quantity),
                    reference: record.get("reference").unwrap_or("").to_string(),
                    optional: parse_bool(record, "optional")?,
                    consumable: parse_bool(record, "consumable")?,
                    substitute_part_ids: Vec::new(),
                };
                validate_bom_item(tx, &bom).map_err(|e| row_error(record.row, e))?;
                bom.id = parts.insert_bom_item(&bom)?;
                ids.push(bom.id);
            }

            ActionLogRepository::new(tx).insert(
                &ActionLog::new(ActionType::ImportBom, user, "part", Some(assembly_id))
                    .with_payload(&serde_json::json!({
                        "file": path.display().to_string(),
                        "rows": ids.len(),
                    })),
            )?;

            Ok::<_, ImportError>(BomImportSummary {
                assembly_id,
                imported: ids.len(),
                bom_item_ids: ids,
            })
        })?;

        tracing::info!(
            assembly_id,
            imported = summary.imported,
            file = %path.display(),
            "BOM 导入完成"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            row: 7,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_parse_bool_values() {
        let r = record(&[("optional", "Yes"), ("consumable", ""), ("flag", "maybe")]);
        assert!(parse_bool(&r, "optional").unwrap());
        assert!(!parse_bool(&r, "consumable").unwrap());
        assert!(!parse_bool(&r, "missing").unwrap());

        let err = parse_bool(&r, "flag").unwrap_err();
        assert!(matches!(err, ImportError::RowError { row: 7, ref field, .. } if field == "flag"));
    }

    #[test]
    fn test_field_errors_keep_field_name() {
        let err = row_error(3, ApiError::field("quantity", "Quantity must be greater than zero"));
        assert_eq!(err.to_string(), "行 3 字段 quantity: Quantity must be greater than zero");
    }
}
