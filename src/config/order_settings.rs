// ==========================================
// MRP 订单系统 - 订单设置读取 Trait
// ==========================================
// 职责: 定义工作流 API 所需的设置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 订单工作流设置快照
///
/// API 在开启事务前读取一次，事务内只用快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettings {
    pub purchase_order_reference_pattern: String,
    pub sales_order_reference_pattern: String,
    pub build_order_reference_pattern: String,
    /// 新建销售订单时同时创建发货单 "1"
    pub sales_order_default_shipment: bool,
    pub purchase_order_edit_completed: bool,
    pub sales_order_edit_completed: bool,
    pub stock_enable_expiry: bool,
    pub stock_allow_expired_sale: bool,
    pub stock_allow_expired_build: bool,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            purchase_order_reference_pattern: "PO-{ref:04d}".to_string(),
            sales_order_reference_pattern: "SO-{ref:04d}".to_string(),
            build_order_reference_pattern: "BO-{ref:04d}".to_string(),
            sales_order_default_shipment: false,
            purchase_order_edit_completed: false,
            sales_order_edit_completed: false,
            stock_enable_expiry: false,
            stock_allow_expired_sale: false,
            stock_allow_expired_build: false,
        }
    }
}

impl OrderSettings {
    /// 过期库存是否可用于销售分配
    pub fn expired_blocks_sale(&self, expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
        self.stock_enable_expiry
            && !self.stock_allow_expired_sale
            && matches!(expiry, Some(d) if d < today)
    }

    /// 过期库存是否可用于生产分配
    pub fn expired_blocks_build(&self, expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
        self.stock_enable_expiry
            && !self.stock_allow_expired_build
            && matches!(expiry, Some(d) if d < today)
    }
}

// ==========================================
// OrderSettingsReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）；测试可直接使用 OrderSettings 固定值
pub trait OrderSettingsReader: Send + Sync {
    fn order_settings(&self) -> Result<OrderSettings, Box<dyn Error>>;
}

impl OrderSettingsReader for OrderSettings {
    fn order_settings(&self) -> Result<OrderSettings, Box<dyn Error>> {
        Ok(self.clone())
    }
}
