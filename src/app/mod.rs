// ==========================================
// MRP 订单系统 - 应用层
// ==========================================
// 职责: 组装数据库、配置与各 API，供入口程序使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
