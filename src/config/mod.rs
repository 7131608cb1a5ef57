// ==========================================
// MRP 订单系统 - 配置层
// ==========================================
// 职责: 系统设置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod order_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use order_settings::{OrderSettings, OrderSettingsReader};
