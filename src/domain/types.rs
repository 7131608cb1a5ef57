// ==========================================
// MRP 订单系统 - 领域类型定义
// ==========================================
// 职责: 各类订单/库存的状态码枚举
// 约定:
// - 数据库以 INTEGER 存储 (code())
// - 序列化格式: SCREAMING_SNAKE_CASE
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 采购订单状态 (Purchase Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Pending,   // 待下单
    Placed,    // 已下单
    Complete,  // 已完成
    Cancelled, // 已取消
    Lost,      // 丢失
    Returned,  // 已退回
}

impl PurchaseOrderStatus {
    /// 未关闭状态
    pub const OPEN: [Self; 2] = [Self::Pending, Self::Placed];
    /// 失败状态
    pub const FAILED: [Self; 3] = [Self::Cancelled, Self::Lost, Self::Returned];

    pub fn code(&self) -> i64 {
        match self {
            Self::Pending => 10,
            Self::Placed => 20,
            Self::Complete => 30,
            Self::Cancelled => 40,
            Self::Lost => 50,
            Self::Returned => 60,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Self::Pending),
            20 => Some(Self::Placed),
            30 => Some(Self::Complete),
            40 => Some(Self::Cancelled),
            50 => Some(Self::Lost),
            60 => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    pub fn is_failed(&self) -> bool {
        Self::FAILED.contains(self)
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Placed => write!(f, "Placed"),
            Self::Complete => write!(f, "Complete"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Lost => write!(f, "Lost"),
            Self::Returned => write!(f, "Returned"),
        }
    }
}

// ==========================================
// 销售订单状态 (Sales Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    Pending,    // 待处理
    InProgress, // 进行中
    Shipped,    // 已发货
    Cancelled,  // 已取消
    Lost,       // 丢失
    Returned,   // 已退回
}

impl SalesOrderStatus {
    pub const OPEN: [Self; 2] = [Self::Pending, Self::InProgress];
    pub const COMPLETE: [Self; 1] = [Self::Shipped];

    pub fn code(&self) -> i64 {
        match self {
            Self::Pending => 10,
            Self::InProgress => 15,
            Self::Shipped => 20,
            Self::Cancelled => 40,
            Self::Lost => 50,
            Self::Returned => 60,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Self::Pending),
            15 => Some(Self::InProgress),
            20 => Some(Self::Shipped),
            40 => Some(Self::Cancelled),
            50 => Some(Self::Lost),
            60 => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    pub fn is_complete(&self) -> bool {
        Self::COMPLETE.contains(self)
    }
}

impl fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Lost => write!(f, "Lost"),
            Self::Returned => write!(f, "Returned"),
        }
    }
}

// ==========================================
// 生产订单状态 (Build Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,    // 待生产
    Production, // 生产中
    Cancelled,  // 已取消
    Complete,   // 已完工
}

impl BuildStatus {
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Production];

    pub fn code(&self) -> i64 {
        match self {
            Self::Pending => 10,
            Self::Production => 20,
            Self::Cancelled => 30,
            Self::Complete => 40,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Self::Pending),
            20 => Some(Self::Production),
            30 => Some(Self::Cancelled),
            40 => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Production => write!(f, "Production"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

// ==========================================
// 库存状态 (Stock Status)
// ==========================================
// AVAILABLE 内的状态视为"可用库存"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Ok,          // 正常
    Attention,   // 需关注
    Damaged,     // 损坏
    Destroyed,   // 报废
    Rejected,    // 拒收
    Lost,        // 丢失
    Quarantined, // 隔离
    Returned,    // 退回
}

impl StockStatus {
    pub const AVAILABLE: [Self; 3] = [Self::Ok, Self::Attention, Self::Damaged];

    pub fn code(&self) -> i64 {
        match self {
            Self::Ok => 10,
            Self::Attention => 50,
            Self::Damaged => 55,
            Self::Destroyed => 60,
            Self::Rejected => 65,
            Self::Lost => 70,
            Self::Quarantined => 75,
            Self::Returned => 85,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Self::Ok),
            50 => Some(Self::Attention),
            55 => Some(Self::Damaged),
            60 => Some(Self::Destroyed),
            65 => Some(Self::Rejected),
            70 => Some(Self::Lost),
            75 => Some(Self::Quarantined),
            85 => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        Self::AVAILABLE.contains(self)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Attention => write!(f, "Attention needed"),
            Self::Damaged => write!(f, "Damaged"),
            Self::Destroyed => write!(f, "Destroyed"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Lost => write!(f, "Lost"),
            Self::Quarantined => write!(f, "Quarantined"),
            Self::Returned => write!(f, "Returned"),
        }
    }
}

// ==========================================
// 库存履历代码 (Stock History Code)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockHistoryCode {
    Created,
    StockAdd,
    StockRemove,
    InstalledInto,
    InstalledChildItem,
    SplitFromParent,
    SplitChildItem,
    BuildOutputCreated,
    BuildOutputCompleted,
    BuildConsumed,
    ShippedAgainstSalesOrder,
    ReceivedAgainstPurchaseOrder,
}

impl StockHistoryCode {
    pub fn code(&self) -> i64 {
        match self {
            Self::Created => 1,
            Self::StockAdd => 11,
            Self::StockRemove => 12,
            Self::InstalledInto => 30,
            Self::InstalledChildItem => 35,
            Self::SplitFromParent => 40,
            Self::SplitChildItem => 42,
            Self::BuildOutputCreated => 50,
            Self::BuildOutputCompleted => 55,
            Self::BuildConsumed => 57,
            Self::ShippedAgainstSalesOrder => 60,
            Self::ReceivedAgainstPurchaseOrder => 70,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Created),
            11 => Some(Self::StockAdd),
            12 => Some(Self::StockRemove),
            30 => Some(Self::InstalledInto),
            35 => Some(Self::InstalledChildItem),
            40 => Some(Self::SplitFromParent),
            42 => Some(Self::SplitChildItem),
            50 => Some(Self::BuildOutputCreated),
            55 => Some(Self::BuildOutputCompleted),
            57 => Some(Self::BuildConsumed),
            60 => Some(Self::ShippedAgainstSalesOrder),
            70 => Some(Self::ReceivedAgainstPurchaseOrder),
            _ => None,
        }
    }
}

impl fmt::Display for StockHistoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Created => "Stock item created",
            Self::StockAdd => "Added stock",
            Self::StockRemove => "Removed stock",
            Self::InstalledInto => "Installed into assembly",
            Self::InstalledChildItem => "Installed stock item",
            Self::SplitFromParent => "Split from parent item",
            Self::SplitChildItem => "Split child item",
            Self::BuildOutputCreated => "Build order output created",
            Self::BuildOutputCompleted => "Build order output completed",
            Self::BuildConsumed => "Consumed by build order",
            Self::ShippedAgainstSalesOrder => "Shipped against Sales Order",
            Self::ReceivedAgainstPurchaseOrder => "Received against Purchase Order",
        };
        write!(f, "{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_roundtrip() {
        for s in [
            PurchaseOrderStatus::Pending,
            PurchaseOrderStatus::Placed,
            PurchaseOrderStatus::Complete,
            PurchaseOrderStatus::Cancelled,
            PurchaseOrderStatus::Lost,
            PurchaseOrderStatus::Returned,
        ] {
            assert_eq!(PurchaseOrderStatus::from_code(s.code()), Some(s));
        }
        assert_eq!(SalesOrderStatus::from_code(15), Some(SalesOrderStatus::InProgress));
        assert_eq!(BuildStatus::from_code(30), Some(BuildStatus::Cancelled));
        assert_eq!(StockStatus::from_code(11), None);
    }

    #[test]
    fn test_status_groups() {
        assert!(PurchaseOrderStatus::Placed.is_open());
        assert!(!PurchaseOrderStatus::Complete.is_open());
        assert!(PurchaseOrderStatus::Lost.is_failed());

        assert!(SalesOrderStatus::InProgress.is_open());
        assert!(SalesOrderStatus::Shipped.is_complete());

        assert!(BuildStatus::Production.is_active());
        assert!(!BuildStatus::Complete.is_active());

        assert!(StockStatus::Damaged.is_available());
        assert!(!StockStatus::Quarantined.is_available());
    }

    #[test]
    fn test_serde_screaming_snake_case() {
        let json = serde_json::to_string(&SalesOrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let code: StockHistoryCode = serde_json::from_str("\"BUILD_CONSUMED\"").unwrap();
        assert_eq!(code, StockHistoryCode::BuildConsumed);
    }
}
