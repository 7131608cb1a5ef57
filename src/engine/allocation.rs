// ==========================================
// MRP 订单系统 - 分配数量运算
// ==========================================
// 职责: 需求量 / 已分配量 / 已履约量 之间的对账运算
// 红线: Engine 不拼 SQL，只做纯计算
// ==========================================

use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::quantity::{is_positive, qty_ge, qty_gt, round_qty, QTY_EPSILON};
use serde::{Deserialize, Serialize};

/// 库存项未分配数量 = max(库存数量 - 已分配总量, 0)
pub fn unallocated_stock(item_quantity: f64, allocated_total: f64) -> f64 {
    round_qty((item_quantity - allocated_total).max(0.0))
}

// ==========================================
// LineAllocation - 销售订单行分配状况
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub required: f64,  // 订单行数量
    pub allocated: f64, // 已分配数量（含已发货分配）
    pub fulfilled: f64, // 已发货数量
}

impl LineAllocation {
    /// 已发货订单以履约量判断，其余以分配量判断
    pub fn is_fully_allocated(&self, order_shipped: bool) -> bool {
        if order_shipped {
            qty_ge(self.fulfilled, self.required)
        } else {
            qty_ge(self.allocated, self.required)
        }
    }

    pub fn is_over_allocated(&self) -> bool {
        qty_gt(self.allocated, self.required)
    }

    pub fn shortfall(&self) -> f64 {
        round_qty((self.required - self.allocated).max(0.0))
    }
}

// ==========================================
// BomLineRequirement - 生产订单 BOM 行需求
// ==========================================
// quantity: 整单数量（非追踪行）或单个产出数量（追踪行）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BomLineRequirement {
    pub bom_quantity: f64,
    pub quantity: f64,
    pub consumable: bool,
}

impl BomLineRequirement {
    pub fn new(bom_quantity: f64, quantity: f64, consumable: bool) -> Self {
        Self {
            bom_quantity,
            quantity,
            consumable,
        }
    }

    pub fn required(&self) -> f64 {
        round_qty(self.bom_quantity * self.quantity)
    }

    /// 耗材行不跟踪分配，视为已满足
    pub fn unallocated(&self, allocated: f64) -> f64 {
        if self.consumable {
            return 0.0;
        }
        round_qty((self.required() - allocated).max(0.0))
    }

    pub fn is_fully_allocated(&self, allocated: f64) -> bool {
        self.consumable || qty_ge(allocated, self.required())
    }

    pub fn is_over_allocated(&self, allocated: f64) -> bool {
        !self.consumable && qty_gt(allocated, self.required())
    }
}

/// 单次库存分配校验
///
/// - requested > 0
/// - requested <= available
/// - 序列化库存只能分配 1
pub fn validate_stock_allocation(
    requested: f64,
    available: f64,
    serialized: bool,
) -> WorkflowResult<()> {
    if !is_positive(requested) {
        return Err(WorkflowError::field(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    if qty_gt(requested, available) {
        return Err(WorkflowError::field(
            "quantity",
            format!("Available quantity ({}) exceeded", round_qty(available)),
        ));
    }

    if serialized && (requested - 1.0).abs() > QTY_EPSILON {
        return Err(WorkflowError::field(
            "quantity",
            "Quantity must be 1 for serialized stock item",
        ));
    }

    Ok(())
}

// ==========================================
// 超量分配裁剪
// ==========================================

/// 裁剪步骤
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrimStep {
    /// 将分配数量减少到 new_quantity
    Reduce { allocation_id: i64, new_quantity: f64 },
    /// 删除分配
    Delete { allocation_id: i64 },
}

/// 计算裁剪方案，使分配总量等于 required
///
/// 按分配顺序依次处理: 大于剩余超量的分配直接减量并结束，
/// 否则整条删除并继续。
pub fn plan_trim(required: f64, allocations: &[(i64, f64)]) -> Vec<TrimStep> {
    let total: f64 = allocations.iter().map(|(_, q)| q).sum();
    let mut excess = round_qty(total - required);
    let mut steps = Vec::new();

    for &(allocation_id, quantity) in allocations {
        if !is_positive(excess) {
            break;
        }

        if qty_gt(quantity, excess) {
            steps.push(TrimStep::Reduce {
                allocation_id,
                new_quantity: round_qty(quantity - excess),
            });
            excess = 0.0;
        } else {
            steps.push(TrimStep::Delete { allocation_id });
            excess = round_qty(excess - quantity);
        }
    }

    steps
}

// ==========================================
// 自动分配
// ==========================================

/// 自动分配候选库存
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationCandidate {
    pub stock_item_id: i64,
    pub available: f64, // 未分配数量
}

/// 计算自动分配方案
///
/// - 多个候选且不可互换: 不分配（交由人工选择）
/// - 否则按候选顺序贪心取 min(剩余需求, 可用量)
///
/// 返回 (stock_item_id, quantity) 列表
pub fn plan_auto_allocation(
    unallocated: f64,
    candidates: &[AllocationCandidate],
    interchangeable: bool,
) -> Vec<(i64, f64)> {
    let usable: Vec<&AllocationCandidate> = candidates
        .iter()
        .filter(|c| is_positive(c.available))
        .collect();

    if usable.is_empty() || !is_positive(unallocated) {
        return Vec::new();
    }

    if usable.len() > 1 && !interchangeable {
        tracing::debug!(
            candidates = usable.len(),
            "多个候选库存且不可互换，跳过自动分配"
        );
        return Vec::new();
    }

    let mut remaining = round_qty(unallocated);
    let mut plan = Vec::new();

    for candidate in usable {
        if !is_positive(remaining) {
            break;
        }
        let take = round_qty(remaining.min(candidate.available));
        plan.push((candidate.stock_item_id, take));
        remaining = round_qty(remaining - take);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unallocated_stock_floor_zero() {
        assert_eq!(unallocated_stock(10.0, 4.0), 6.0);
        assert_eq!(unallocated_stock(10.0, 12.0), 0.0);
    }

    #[test]
    fn test_line_allocation_states() {
        let line = LineAllocation {
            required: 10.0,
            allocated: 12.0,
            fulfilled: 4.0,
        };
        assert!(line.is_fully_allocated(false));
        assert!(!line.is_fully_allocated(true));
        assert!(line.is_over_allocated());
        assert_eq!(line.shortfall(), 0.0);

        let short = LineAllocation {
            required: 10.0,
            allocated: 3.5,
            fulfilled: 0.0,
        };
        assert_eq!(short.shortfall(), 6.5);
    }

    #[test]
    fn test_bom_line_requirement() {
        let req = BomLineRequirement::new(2.5, 4.0, false);
        assert_eq!(req.required(), 10.0);
        assert_eq!(req.unallocated(3.0), 7.0);
        assert!(!req.is_fully_allocated(9.99));
        assert!(req.is_fully_allocated(10.0));
        assert!(req.is_over_allocated(11.0));

        let consumable = BomLineRequirement::new(1.0, 5.0, true);
        assert_eq!(consumable.unallocated(0.0), 0.0);
        assert!(consumable.is_fully_allocated(0.0));
        assert!(!consumable.is_over_allocated(100.0));
    }

    #[test]
    fn test_validate_stock_allocation() {
        assert!(validate_stock_allocation(5.0, 5.0, false).is_ok());

        match validate_stock_allocation(0.0, 5.0, false) {
            Err(WorkflowError::Field { field, message }) => {
                assert_eq!(field, "quantity");
                assert_eq!(message, "Quantity must be greater than zero");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match validate_stock_allocation(6.0, 5.0, false) {
            Err(WorkflowError::Field { message, .. }) => {
                assert_eq!(message, "Available quantity (5) exceeded");
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(validate_stock_allocation(1.0, 1.0, true).is_ok());
        assert!(validate_stock_allocation(0.5, 1.0, true).is_err());
    }

    #[test]
    fn test_plan_trim_reduces_then_deletes() {
        // 需求 10，分配 6 + 3 + 4 = 13，超量 3
        let steps = plan_trim(10.0, &[(1, 6.0), (2, 3.0), (3, 4.0)]);
        assert_eq!(
            steps,
            vec![TrimStep::Reduce {
                allocation_id: 1,
                new_quantity: 3.0
            }]
        );

        // 需求 2，分配 1 + 1 + 4 = 6，超量 4
        let steps = plan_trim(2.0, &[(1, 1.0), (2, 1.0), (3, 4.0)]);
        assert_eq!(
            steps,
            vec![
                TrimStep::Delete { allocation_id: 1 },
                TrimStep::Delete { allocation_id: 2 },
                TrimStep::Reduce {
                    allocation_id: 3,
                    new_quantity: 2.0
                },
            ]
        );

        // 不超量时不裁剪
        assert!(plan_trim(10.0, &[(1, 10.0)]).is_empty());
    }

    #[test]
    fn test_plan_trim_preserves_required_total() {
        let allocations = [(1, 2.5), (2, 2.5), (3, 2.5)];
        let steps = plan_trim(4.0, &allocations);
        let mut total = 0.0;
        for (id, qty) in allocations {
            match steps.iter().find(|s| match s {
                TrimStep::Reduce { allocation_id, .. } | TrimStep::Delete { allocation_id } => {
                    *allocation_id == id
                }
            }) {
                Some(TrimStep::Reduce { new_quantity, .. }) => total += new_quantity,
                Some(TrimStep::Delete { .. }) => {}
                None => total += qty,
            }
        }
        assert_eq!(round_qty(total), 4.0);
    }

    #[test]
    fn test_plan_auto_allocation_single_candidate() {
        let candidates = [AllocationCandidate {
            stock_item_id: 7,
            available: 3.0,
        }];
        assert_eq!(plan_auto_allocation(5.0, &candidates, false), vec![(7, 3.0)]);
        assert_eq!(plan_auto_allocation(2.0, &candidates, false), vec![(7, 2.0)]);
    }

    #[test]
    fn test_plan_auto_allocation_requires_interchangeable_for_many() {
        let candidates = [
            AllocationCandidate {
                stock_item_id: 1,
                available: 2.0,
            },
            AllocationCandidate {
                stock_item_id: 2,
                available: 0.0,
            },
            AllocationCandidate {
                stock_item_id: 3,
                available: 5.0,
            },
        ];
        assert!(plan_auto_allocation(4.0, &candidates, false).is_empty());
        assert_eq!(
            plan_auto_allocation(4.0, &candidates, true),
            vec![(1, 2.0), (3, 2.0)]
        );
        assert!(plan_auto_allocation(0.0, &candidates, true).is_empty());
    }
}
