// ==========================================
// MRP 订单系统 - 库存领域模型
// ==========================================
// 职责: 库位树、库存项、库存履历
// 说明: 生产产出（build output）也是库存项: is_building = true
// ==========================================

use crate::domain::types::{StockHistoryCode, StockStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// StockLocation - 库位（树结构）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLocation {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub parent_id: Option<i64>,
}

// ==========================================
// StockItem - 库存项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub part_id: i64,
    pub supplier_part_id: Option<i64>,
    pub location_id: Option<i64>,
    pub quantity: f64,

    // ===== 追溯 =====
    pub serial: Option<String>,
    pub serial_int: Option<i64>,
    pub batch: String,
    pub status: StockStatus,

    // ===== 关联 =====
    pub is_building: bool,          // 生产中产出
    pub build_id: Option<i64>,      // 产出所属生产订单
    pub consumed_by_id: Option<i64>, // 被哪个生产订单消耗
    pub belongs_to_id: Option<i64>, // 已安装进的库存项
    pub customer_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub purchase_order_id: Option<i64>,
    pub purchase_price: Option<f64>,
    pub expiry_date: Option<NaiveDate>,
    pub parent_id: Option<i64>, // 拆分来源

    pub notes: String,
    pub updated_at: NaiveDateTime,
}

impl StockItem {
    /// 以最小字段构造新库存项（id 由数据库分配）
    pub fn new(part_id: i64, quantity: f64) -> Self {
        Self {
            id: 0,
            part_id,
            supplier_part_id: None,
            location_id: None,
            quantity,
            serial: None,
            serial_int: None,
            batch: String::new(),
            status: StockStatus::Ok,
            is_building: false,
            build_id: None,
            consumed_by_id: None,
            belongs_to_id: None,
            customer_id: None,
            sales_order_id: None,
            purchase_order_id: None,
            purchase_price: None,
            expiry_date: None,
            parent_id: None,
            notes: String::new(),
            updated_at: chrono::Local::now().naive_local(),
        }
    }

    /// 是否在库（可被分配）
    pub fn in_stock(&self) -> bool {
        self.quantity > 0.0
            && !self.is_building
            && self.belongs_to_id.is_none()
            && self.consumed_by_id.is_none()
            && self.customer_id.is_none()
            && self.sales_order_id.is_none()
            && self.status.is_available()
    }

    /// 序列化库存: 有序列号且数量为 1
    pub fn is_serialized(&self) -> bool {
        self.serial.as_deref().map(|s| !s.is_empty()).unwrap_or(false) && self.quantity == 1.0
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(d) if d < today)
    }
}

// ==========================================
// StockItemTracking - 库存履历
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItemTracking {
    pub id: i64,
    pub item_id: i64,
    pub code: StockHistoryCode,
    pub date: NaiveDateTime,
    pub user: Option<String>,
    pub notes: String,
    pub deltas: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64) -> StockItem {
        StockItem::new(1, quantity)
    }

    #[test]
    fn test_in_stock_rules() {
        assert!(item(5.0).in_stock());
        assert!(!item(0.0).in_stock());

        let mut building = item(5.0);
        building.is_building = true;
        assert!(!building.in_stock());

        let mut shipped = item(5.0);
        shipped.customer_id = Some(3);
        assert!(!shipped.in_stock());

        let mut installed = item(1.0);
        installed.belongs_to_id = Some(9);
        assert!(!installed.in_stock());

        let mut quarantined = item(5.0);
        quarantined.status = StockStatus::Quarantined;
        assert!(!quarantined.in_stock());

        let mut damaged = item(5.0);
        damaged.status = StockStatus::Damaged;
        assert!(damaged.in_stock());
    }

    #[test]
    fn test_serialized_and_expiry() {
        let mut s = item(1.0);
        assert!(!s.is_serialized());
        s.serial = Some("1001".to_string());
        assert!(s.is_serialized());

        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        s.expiry_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert!(!s.is_expired(today));
        s.expiry_date = NaiveDate::from_ymd_opt(2026, 2, 28);
        assert!(s.is_expired(today));
    }
}
