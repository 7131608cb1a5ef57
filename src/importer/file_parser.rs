// ==========================================
// MRP 订单系统 - 文件解析器
// ==========================================
// 支持: Excel (.xlsx) / CSV (.csv)
// 输出: 行记录（列名统一小写），附带文件行号
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始行记录
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub row: usize, // 文件行号（表头为 1）
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    /// 取字段值（空串视为缺失）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

/// 文件解析 Trait
pub trait FileParser: Send + Sync {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase()
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

/// 组装行记录，跳过完全空白的行
fn collect_row(headers: &[String], row: usize, values: Vec<String>) -> Option<RawRecord> {
    let mut fields = HashMap::new();
    for (idx, value) in values.into_iter().enumerate() {
        if let Some(header) = headers.get(idx) {
            fields.insert(header.clone(), value.trim().to_string());
        }
    }
    if fields.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(RawRecord { row, fields })
}

// ==========================================
// CSV Parser
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, path: &Path) -> ImportResult<Vec<RawRecord>> {
        check_exists(path)?;

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let values = record.iter().map(str::to_string).collect();
            if let Some(r) = collect_row(&headers, idx + 2, values) {
                records.push(r);
            }
        }
        Ok(records)
    }
}

// ==========================================
// Excel Parser（仅读取第一个工作表）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, path: &Path) -> ImportResult<Vec<RawRecord>> {
        check_exists(path)?;

        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or(ImportError::EmptyFile)?
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let values = data_row.iter().map(|c| c.to_string()).collect();
            if let Some(r) = collect_row(&headers, idx + 2, values) {
                records.push(r);
            }
        }
        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" => ExcelParser.parse_to_raw_records(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f
    }

    #[test]
    fn test_csv_headers_lowercased_and_rows_numbered() {
        let f = csv_file(&["Part, Quantity ,Reference", "R-10K,4,R1 R2", ",,", "C-100n,2,"]);
        let records = CsvParser.parse_to_raw_records(f.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, 2);
        assert_eq!(records[0].get("part"), Some("R-10K"));
        assert_eq!(records[0].get("quantity"), Some("4"));
        // 空行被跳过，行号保持文件行号
        assert_eq!(records[1].row, 4);
        assert_eq!(records[1].get("reference"), None);
        assert!(records[1].has_column("reference"));
    }

    #[test]
    fn test_missing_file_and_bad_extension() {
        let err = CsvParser
            .parse_to_raw_records(Path::new("does_not_exist.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));

        let err = UniversalFileParser.parse("bom.txt").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ref e) if e == "txt"));
    }
}
