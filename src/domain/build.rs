// ==========================================
// MRP 订单系统 - 生产订单领域模型
// ==========================================
// 职责: 生产订单（树结构: parent → children）与生产分配
// 说明: 产出是 is_building = true 且 build_id 指向本订单的库存项
// ==========================================

use crate::domain::types::BuildStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Build - 生产订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: i64,
    pub reference: String,
    pub reference_int: i64,
    pub title: String,
    pub part_id: i64,
    pub quantity: f64,
    pub completed: f64, // 已完工数量，仅随产出完工增长

    pub parent_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub take_from_id: Option<i64>,   // 领料库位
    pub destination_id: Option<i64>, // 产出库位
    pub batch: String,
    pub status: BuildStatus,
    pub priority: i64,

    pub creation_date: NaiveDate,
    pub target_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,

    pub issued_by: Option<String>,
    pub completed_by: Option<String>,
    pub responsible: Option<String>,

    pub notes: String,
}

impl Build {
    pub fn remaining(&self) -> f64 {
        (self.quantity - self.completed).max(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_complete(&self) -> bool {
        self.status == BuildStatus::Complete
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && matches!(self.target_date, Some(d) if d < today)
    }
}

// ==========================================
// BuildItem - 生产分配
// ==========================================
// install_into_id: 追踪件分配到的具体产出；非追踪件为 None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildItem {
    pub id: i64,
    pub build_id: i64,
    pub bom_item_id: i64,
    pub stock_item_id: i64,
    pub quantity: f64,
    pub install_into_id: Option<i64>,
}
