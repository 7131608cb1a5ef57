// ==========================================
// MRP 订单系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::order_settings::{OrderSettings, OrderSettingsReader};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_bool_or_default(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "布尔配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式，键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的同名 global 配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// OrderSettingsReader Trait 实现
// ==========================================
impl OrderSettingsReader for ConfigManager {
    fn order_settings(&self) -> Result<OrderSettings, Box<dyn Error>> {
        let defaults = OrderSettings::default();
        Ok(OrderSettings {
            purchase_order_reference_pattern: self.get_config_or_default(
                config_keys::PURCHASEORDER_REFERENCE_PATTERN,
                &defaults.purchase_order_reference_pattern,
            )?,
            sales_order_reference_pattern: self.get_config_or_default(
                config_keys::SALESORDER_REFERENCE_PATTERN,
                &defaults.sales_order_reference_pattern,
            )?,
            build_order_reference_pattern: self.get_config_or_default(
                config_keys::BUILDORDER_REFERENCE_PATTERN,
                &defaults.build_order_reference_pattern,
            )?,
            sales_order_default_shipment: self.get_bool_or_default(
                config_keys::SALESORDER_DEFAULT_SHIPMENT,
                defaults.sales_order_default_shipment,
            )?,
            purchase_order_edit_completed: self.get_bool_or_default(
                config_keys::PURCHASEORDER_EDIT_COMPLETED_ORDERS,
                defaults.purchase_order_edit_completed,
            )?,
            sales_order_edit_completed: self.get_bool_or_default(
                config_keys::SALESORDER_EDIT_COMPLETED_ORDERS,
                defaults.sales_order_edit_completed,
            )?,
            stock_enable_expiry: self.get_bool_or_default(
                config_keys::STOCK_ENABLE_EXPIRY,
                defaults.stock_enable_expiry,
            )?,
            stock_allow_expired_sale: self.get_bool_or_default(
                config_keys::STOCK_ALLOW_EXPIRED_SALE,
                defaults.stock_allow_expired_sale,
            )?,
            stock_allow_expired_build: self.get_bool_or_default(
                config_keys::STOCK_ALLOW_EXPIRED_BUILD,
                defaults.stock_allow_expired_build,
            )?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 订单编号
    pub const PURCHASEORDER_REFERENCE_PATTERN: &str = "PURCHASEORDER_REFERENCE_PATTERN";
    pub const SALESORDER_REFERENCE_PATTERN: &str = "SALESORDER_REFERENCE_PATTERN";
    pub const BUILDORDER_REFERENCE_PATTERN: &str = "BUILDORDER_REFERENCE_PATTERN";

    // 订单行编辑
    pub const PURCHASEORDER_EDIT_COMPLETED_ORDERS: &str = "PURCHASEORDER_EDIT_COMPLETED_ORDERS";
    pub const SALESORDER_EDIT_COMPLETED_ORDERS: &str = "SALESORDER_EDIT_COMPLETED_ORDERS";

    // 发货
    pub const SALESORDER_DEFAULT_SHIPMENT: &str = "SALESORDER_DEFAULT_SHIPMENT";

    // 库存有效期
    pub const STOCK_ENABLE_EXPIRY: &str = "STOCK_ENABLE_EXPIRY";
    pub const STOCK_ALLOW_EXPIRED_SALE: &str = "STOCK_ALLOW_EXPIRED_SALE";
    pub const STOCK_ALLOW_EXPIRED_BUILD: &str = "STOCK_ALLOW_EXPIRED_BUILD";
}
