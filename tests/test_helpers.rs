// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、临时导入文件
// ==========================================

use mrp_orders::db::Database;
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Database: 共享数据库句柄
pub fn create_test_db() -> Result<(NamedTempFile, Database), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let db = Database::open(&db_path)?;
    Ok((temp_file, db))
}

/// 写入临时 CSV 文件（后缀 .csv，供解析器识别格式）
pub fn write_temp_csv(content: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
