// ==========================================
// MRP 订单系统 - 操作日志领域模型
// ==========================================
// 红线: 所有工作流写操作必须记录
// 对齐: v0.1_schema.sql action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,        // 日志ID (UUID)
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 操作对象 =====
    pub entity_kind: String,    // purchase_order / sales_order / build / stock_item ...
    pub entity_id: Option<i64>,

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    // ===== 采购 =====
    CreatePurchaseOrder,
    PlacePurchaseOrder,
    ReceivePurchaseOrder,
    CompletePurchaseOrder,
    CancelPurchaseOrder,
    // ===== 销售 =====
    CreateSalesOrder,
    IssueSalesOrder,
    AllocateSalesStock,
    CompleteShipment,
    CompleteSalesOrder,
    CancelSalesOrder,
    // ===== 生产 =====
    CreateBuild,
    IssueBuild,
    AllocateBuildStock,
    AutoAllocateBuild,
    CreateBuildOutput,
    CompleteBuildOutput,
    CompleteBuild,
    CancelBuild,
    // ===== 库存 / 导入 =====
    AdjustStock,
    ImportBom,
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreatePurchaseOrder => "CreatePurchaseOrder",
            ActionType::PlacePurchaseOrder => "PlacePurchaseOrder",
            ActionType::ReceivePurchaseOrder => "ReceivePurchaseOrder",
            ActionType::CompletePurchaseOrder => "CompletePurchaseOrder",
            ActionType::CancelPurchaseOrder => "CancelPurchaseOrder",
            ActionType::CreateSalesOrder => "CreateSalesOrder",
            ActionType::IssueSalesOrder => "IssueSalesOrder",
            ActionType::AllocateSalesStock => "AllocateSalesStock",
            ActionType::CompleteShipment => "CompleteShipment",
            ActionType::CompleteSalesOrder => "CompleteSalesOrder",
            ActionType::CancelSalesOrder => "CancelSalesOrder",
            ActionType::CreateBuild => "CreateBuild",
            ActionType::IssueBuild => "IssueBuild",
            ActionType::AllocateBuildStock => "AllocateBuildStock",
            ActionType::AutoAllocateBuild => "AutoAllocateBuild",
            ActionType::CreateBuildOutput => "CreateBuildOutput",
            ActionType::CompleteBuildOutput => "CompleteBuildOutput",
            ActionType::CompleteBuild => "CompleteBuild",
            ActionType::CancelBuild => "CancelBuild",
            ActionType::AdjustStock => "AdjustStock",
            ActionType::ImportBom => "ImportBom",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        let all = [
            ActionType::CreatePurchaseOrder,
            ActionType::PlacePurchaseOrder,
            ActionType::ReceivePurchaseOrder,
            ActionType::CompletePurchaseOrder,
            ActionType::CancelPurchaseOrder,
            ActionType::CreateSalesOrder,
            ActionType::IssueSalesOrder,
            ActionType::AllocateSalesStock,
            ActionType::CompleteShipment,
            ActionType::CompleteSalesOrder,
            ActionType::CancelSalesOrder,
            ActionType::CreateBuild,
            ActionType::IssueBuild,
            ActionType::AllocateBuildStock,
            ActionType::AutoAllocateBuild,
            ActionType::CreateBuildOutput,
            ActionType::CompleteBuildOutput,
            ActionType::CompleteBuild,
            ActionType::CancelBuild,
            ActionType::AdjustStock,
            ActionType::ImportBom,
        ];
        all.into_iter().find(|t| t.as_str() == s)
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志（action_id 自动生成）
    pub fn new(action_type: ActionType, actor: &str, entity_kind: &str, entity_id: Option<i64>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            entity_kind: entity_kind.to_string(),
            entity_id,
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_str_roundtrip() {
        for t in [ActionType::ReceivePurchaseOrder, ActionType::CompleteBuild, ActionType::ImportBom] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_str("Unknown"), None);
    }

    #[test]
    fn test_builder_sets_payload() {
        let log = ActionLog::new(ActionType::PlacePurchaseOrder, "alice", "purchase_order", Some(3))
            .with_payload(&serde_json::json!({"reference": "PO-0003"}))
            .with_detail("placed");
        assert_eq!(log.action_type, "PlacePurchaseOrder");
        assert_eq!(log.payload_json.unwrap()["reference"], "PO-0003");
        assert_eq!(log.action_id.len(), 36);
    }
}
