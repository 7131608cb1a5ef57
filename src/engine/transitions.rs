// ==========================================
// MRP 订单系统 - 状态转换规则
// ==========================================
// 红线: 订单状态只能经由本模块变更
// 非法动作返回 InvalidTransition，调用方不得写库
// ==========================================

use crate::domain::types::{BuildStatus, PurchaseOrderStatus, SalesOrderStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Place,    // 采购下单
    Issue,    // 销售/生产下达
    Complete, // 完成
    Cancel,   // 取消
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Place => write!(f, "PLACE"),
            OrderAction::Issue => write!(f, "ISSUE"),
            OrderAction::Complete => write!(f, "COMPLETE"),
            OrderAction::Cancel => write!(f, "CANCEL"),
        }
    }
}

fn invalid<S: fmt::Display>(from: S, action: OrderAction) -> WorkflowError {
    WorkflowError::InvalidTransition {
        from: from.to_string(),
        action: action.to_string(),
    }
}

/// 采购订单状态转换
///
/// - Place: Pending → Placed
/// - Complete: Placed → Complete
/// - Cancel: Pending | Placed → Cancelled
pub fn purchase_order_transition(
    from: PurchaseOrderStatus,
    action: OrderAction,
) -> WorkflowResult<PurchaseOrderStatus> {
    use PurchaseOrderStatus::*;
    match (from, action) {
        (Pending, OrderAction::Place) => Ok(Placed),
        (Placed, OrderAction::Complete) => Ok(Complete),
        (Pending | Placed, OrderAction::Cancel) => Ok(Cancelled),
        _ => Err(invalid(from, action)),
    }
}

/// 销售订单状态转换
///
/// - Issue: Pending → InProgress
/// - Complete: Pending | InProgress → Shipped
/// - Cancel: Pending | InProgress → Cancelled
pub fn sales_order_transition(
    from: SalesOrderStatus,
    action: OrderAction,
) -> WorkflowResult<SalesOrderStatus> {
    use SalesOrderStatus::*;
    match (from, action) {
        (Pending, OrderAction::Issue) => Ok(InProgress),
        (Pending | InProgress, OrderAction::Complete) => Ok(Shipped),
        (Pending | InProgress, OrderAction::Cancel) => Ok(Cancelled),
        _ => Err(invalid(from, action)),
    }
}

/// 生产订单状态转换
///
/// - Issue: Pending → Production
/// - Complete: Pending | Production → Complete
/// - Cancel: Pending | Production → Cancelled
pub fn build_transition(from: BuildStatus, action: OrderAction) -> WorkflowResult<BuildStatus> {
    use BuildStatus::*;
    match (from, action) {
        (Pending, OrderAction::Issue) => Ok(Production),
        (Pending | Production, OrderAction::Complete) => Ok(Complete),
        (Pending | Production, OrderAction::Cancel) => Ok(Cancelled),
        _ => Err(invalid(from, action)),
    }
}

/// 已关闭订单的行项目默认不可编辑（可由设置放开）
pub fn ensure_line_editable(order_open: bool, allow_edit_completed: bool) -> WorkflowResult<()> {
    if order_open || allow_edit_completed {
        Ok(())
    } else {
        Err(WorkflowError::validation(
            "Line items cannot be modified for a closed order",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_order_transitions() {
        use PurchaseOrderStatus::*;
        assert_eq!(purchase_order_transition(Pending, OrderAction::Place), Ok(Placed));
        assert_eq!(purchase_order_transition(Placed, OrderAction::Complete), Ok(Complete));
        assert_eq!(purchase_order_transition(Placed, OrderAction::Cancel), Ok(Cancelled));

        // 非法转换
        assert!(purchase_order_transition(Pending, OrderAction::Complete).is_err());
        assert!(purchase_order_transition(Placed, OrderAction::Place).is_err());
        assert!(purchase_order_transition(Complete, OrderAction::Cancel).is_err());
        assert!(purchase_order_transition(Pending, OrderAction::Issue).is_err());
    }

    #[test]
    fn test_sales_order_transitions() {
        use SalesOrderStatus::*;
        assert_eq!(sales_order_transition(Pending, OrderAction::Issue), Ok(InProgress));
        assert_eq!(sales_order_transition(Pending, OrderAction::Complete), Ok(Shipped));
        assert_eq!(sales_order_transition(InProgress, OrderAction::Cancel), Ok(Cancelled));
        assert!(sales_order_transition(InProgress, OrderAction::Issue).is_err());
        assert!(sales_order_transition(Shipped, OrderAction::Cancel).is_err());
    }

    #[test]
    fn test_build_transitions() {
        use BuildStatus::*;
        assert_eq!(build_transition(Pending, OrderAction::Issue), Ok(Production));
        assert_eq!(build_transition(Production, OrderAction::Complete), Ok(Complete));
        assert_eq!(build_transition(Pending, OrderAction::Cancel), Ok(Cancelled));
        assert!(build_transition(Cancelled, OrderAction::Complete).is_err());
        assert!(build_transition(Complete, OrderAction::Cancel).is_err());
    }

    #[test]
    fn test_invalid_transition_reports_state_and_action() {
        let err = purchase_order_transition(PurchaseOrderStatus::Complete, OrderAction::Place)
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: "Complete".to_string(),
                action: "PLACE".to_string(),
            }
        );
    }

    #[test]
    fn test_ensure_line_editable() {
        assert!(ensure_line_editable(true, false).is_ok());
        assert!(ensure_line_editable(false, true).is_ok());
        assert!(ensure_line_editable(false, false).is_err());
    }
}
