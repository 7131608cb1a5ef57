// ==========================================
// MRP 订单系统 - 导入层
// ==========================================
// 职责: 外部文件（Excel / CSV）导入主数据
// ==========================================

pub mod bom_importer;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use bom_importer::{BomImportSummary, BomImporter};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
