// ==========================================
// MRP 订单系统 - 采购订单领域模型
// ==========================================

use crate::domain::types::PurchaseOrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PurchaseOrder - 采购订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: i64,
    pub reference: String,
    pub reference_int: i64, // 从 reference 提取的整数，用于排序与生成下一个编号
    pub description: String,
    pub supplier_id: i64,
    pub supplier_reference: String,
    pub currency: String,
    pub status: PurchaseOrderStatus,

    // ===== 日期 =====
    pub creation_date: NaiveDate,
    pub issue_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub complete_date: Option<NaiveDate>,

    // ===== 责任人 =====
    pub created_by: Option<String>,
    pub received_by: Option<String>,
    pub responsible: Option<String>,

    pub notes: String,
}

impl PurchaseOrder {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_pending(&self) -> bool {
        self.status == PurchaseOrderStatus::Pending
    }

    /// 仅 Pending / Placed 可取消
    pub fn can_cancel(&self) -> bool {
        self.status.is_open()
    }

    /// 逾期: 未关闭、设置了目标日期且目标日期 <= today
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && matches!(self.target_date, Some(d) if d <= today)
    }
}

// ==========================================
// PurchaseOrderLineItem - 采购订单行
// ==========================================
// quantity / received 以"采购单位"计（库存数量 = × pack_size）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub supplier_part_id: Option<i64>,
    pub quantity: f64,
    pub received: f64,
    pub purchase_price: Option<f64>,
    pub reference: String,
    pub notes: String,
    pub target_date: Option<NaiveDate>,
    pub destination_id: Option<i64>,
}

impl PurchaseOrderLineItem {
    pub fn remaining(&self) -> f64 {
        (self.quantity - self.received).max(0.0)
    }

    pub fn is_completed(&self) -> bool {
        self.received >= self.quantity
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.received < self.quantity && matches!(self.target_date, Some(d) if d < today)
    }
}

// ==========================================
// OrderExtraLine - 订单附加行（运费、服务费等）
// ==========================================
// 采购/销售订单共用结构，分表存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExtraLine {
    pub id: i64,
    pub order_id: i64,
    pub reference: String,
    pub quantity: f64,
    pub price: Option<f64>,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: PurchaseOrderStatus, target: Option<NaiveDate>) -> PurchaseOrder {
        PurchaseOrder {
            id: 1,
            reference: "PO-0001".to_string(),
            reference_int: 1,
            description: String::new(),
            supplier_id: 1,
            supplier_reference: String::new(),
            currency: "USD".to_string(),
            status,
            creation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            issue_date: None,
            target_date: target,
            complete_date: None,
            created_by: None,
            received_by: None,
            responsible: None,
            notes: String::new(),
        }
    }

    #[test]
    fn test_order_overdue_includes_target_day() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert!(order(PurchaseOrderStatus::Placed, Some(today)).is_overdue(today));
        assert!(!order(PurchaseOrderStatus::Placed, None).is_overdue(today));
        assert!(!order(PurchaseOrderStatus::Complete, Some(today)).is_overdue(today));
    }

    #[test]
    fn test_line_remaining_never_negative() {
        let line = PurchaseOrderLineItem {
            id: 1,
            order_id: 1,
            supplier_part_id: Some(1),
            quantity: 10.0,
            received: 12.0,
            purchase_price: None,
            reference: String::new(),
            notes: String::new(),
            target_date: None,
            destination_id: None,
        };
        assert_eq!(line.remaining(), 0.0);
        assert!(line.is_completed());
    }
}
