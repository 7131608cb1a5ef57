// ==========================================
// MRP 订单系统 - 销售订单领域模型
// ==========================================
// 职责: 销售订单、订单行、发货单、库存分配
// ==========================================

use crate::domain::types::SalesOrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// SalesOrder - 销售订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: i64,
    pub reference: String,
    pub reference_int: i64,
    pub description: String,
    pub customer_id: i64,
    pub customer_reference: String,
    pub currency: String,
    pub status: SalesOrderStatus,

    pub creation_date: NaiveDate,
    pub issue_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub shipment_date: Option<NaiveDate>,

    pub created_by: Option<String>,
    pub shipped_by: Option<String>,
    pub responsible: Option<String>,

    pub notes: String,
}

impl SalesOrder {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_pending(&self) -> bool {
        self.status == SalesOrderStatus::Pending
    }

    pub fn can_cancel(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && matches!(self.target_date, Some(d) if d <= today)
    }
}

// ==========================================
// SalesOrderLineItem - 销售订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub part_id: Option<i64>,
    pub quantity: f64,
    pub shipped: f64,
    pub sale_price: Option<f64>,
    pub reference: String,
    pub notes: String,
    pub target_date: Option<NaiveDate>,
}

impl SalesOrderLineItem {
    pub fn is_completed(&self) -> bool {
        self.shipped >= self.quantity
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.shipped < self.quantity && matches!(self.target_date, Some(d) if d < today)
    }
}

// ==========================================
// SalesOrderShipment - 发货单
// ==========================================
// shipment_date 非空即视为已发出；reference 在同一订单内唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderShipment {
    pub id: i64,
    pub order_id: i64,
    pub reference: String,
    pub shipment_date: Option<NaiveDate>,
    pub checked_by: Option<String>,
    pub tracking_number: String,
    pub invoice_number: String,
    pub link: String,
    pub notes: String,
}

impl SalesOrderShipment {
    pub fn new(order_id: i64, reference: &str) -> Self {
        Self {
            id: 0,
            order_id,
            reference: reference.to_string(),
            shipment_date: None,
            checked_by: None,
            tracking_number: String::new(),
            invoice_number: String::new(),
            link: String::new(),
            notes: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.shipment_date.is_some()
    }
}

// ==========================================
// SalesOrderAllocation - 销售分配
// ==========================================
// 将库存项的一部分数量分配到订单行 + 发货单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderAllocation {
    pub id: i64,
    pub line_id: i64,
    pub shipment_id: i64,
    pub item_id: i64,
    pub quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_complete_when_dated() {
        let mut shipment = SalesOrderShipment::new(1, "1");
        assert!(!shipment.is_complete());
        shipment.shipment_date = NaiveDate::from_ymd_opt(2026, 4, 2);
        assert!(shipment.is_complete());
    }

    #[test]
    fn test_line_completed_and_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        let mut line = SalesOrderLineItem {
            id: 1,
            order_id: 1,
            part_id: Some(1),
            quantity: 5.0,
            shipped: 2.0,
            sale_price: None,
            reference: String::new(),
            notes: String::new(),
            target_date: NaiveDate::from_ymd_opt(2026, 4, 1),
        };
        assert!(!line.is_completed());
        assert!(line.is_overdue(today));

        line.shipped = 5.0;
        assert!(line.is_completed());
        assert!(!line.is_overdue(today));
    }
}
