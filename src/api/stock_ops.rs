// ==========================================
// MRP 订单系统 - 库存事务内操作
// ==========================================
// 职责: 拆分、增减、履历、分配占用汇总
// 约定: 所有函数接收事务连接，由调用方决定提交/回滚
// 红线: 拆分/发货/消耗不产生也不消灭数量（父 + 子 = 原数量）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::stock::{StockItem, StockItemTracking};
use crate::domain::types::StockHistoryCode;
use crate::engine::allocation::unallocated_stock;
use crate::engine::quantity::{is_positive, qty_ge, qty_gt, round_qty};
use crate::repository::StockRepository;
use rusqlite::Connection;
use serde_json::Value as JsonValue;

/// 写入一条库存履历
pub(crate) fn track(
    conn: &Connection,
    item_id: i64,
    code: StockHistoryCode,
    user: &str,
    notes: &str,
    deltas: Option<JsonValue>,
) -> ApiResult<()> {
    let entry = StockItemTracking {
        id: 0,
        item_id,
        code,
        date: chrono::Local::now().naive_local(),
        user: Some(user.to_string()),
        notes: notes.to_string(),
        deltas,
    };
    StockRepository::new(conn).insert_tracking(&entry)?;
    Ok(())
}

/// 已分配数量 = 未发货销售分配 + 进行中生产分配
pub(crate) fn allocated_quantity(conn: &Connection, item_id: i64) -> ApiResult<f64> {
    let repo = StockRepository::new(conn);
    let total = repo.sales_allocated_total(item_id)? + repo.build_allocated_total(item_id)?;
    Ok(round_qty(total))
}

pub(crate) fn unallocated_quantity(conn: &Connection, item: &StockItem) -> ApiResult<f64> {
    Ok(unallocated_stock(item.quantity, allocated_quantity(conn, item.id)?))
}

/// 从库存项拆出 quantity，返回新库存项
///
/// 新项继承原项的零件、库位、批次、状态等属性，parent_id 指向原项
pub(crate) fn split_item(
    conn: &Connection,
    item: &mut StockItem,
    quantity: f64,
    user: &str,
    notes: &str,
) -> ApiResult<StockItem> {
    let quantity = round_qty(quantity);
    if item.is_serialized() {
        return Err(ApiError::field("quantity", "Serialized stock cannot be split"));
    }
    if !is_positive(quantity) {
        return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
    }
    if qty_ge(quantity, item.quantity) {
        return Err(ApiError::field(
            "quantity",
            format!("Split quantity must be less than stock quantity ({})", item.quantity),
        ));
    }

    let repo = StockRepository::new(conn);

    let mut child = item.clone();
    child.id = 0;
    child.quantity = quantity;
    child.parent_id = Some(item.id);
    child.serial = None;
    child.serial_int = None;
    child.id = repo.insert_item(&child)?;

    item.quantity = round_qty(item.quantity - quantity);
    repo.update_item(item)?;

    let deltas = serde_json::json!({ "quantity": quantity });
    track(
        conn,
        child.id,
        StockHistoryCode::SplitFromParent,
        user,
        notes,
        Some(serde_json::json!({ "stockitem": item.id, "quantity": quantity })),
    )?;
    track(conn, item.id, StockHistoryCode::SplitChildItem, user, notes, Some(deltas))?;

    tracing::debug!(
        parent_id = item.id,
        child_id = child.id,
        quantity,
        remaining = item.quantity,
        "库存拆分"
    );
    Ok(child)
}

/// 从库存项扣减数量（不低于 0）
pub(crate) fn take_stock(
    conn: &Connection,
    item: &mut StockItem,
    quantity: f64,
    user: &str,
    notes: &str,
) -> ApiResult<()> {
    let quantity = round_qty(quantity);
    if !is_positive(quantity) {
        return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
    }
    if qty_gt(quantity, item.quantity) {
        return Err(ApiError::field(
            "quantity",
            format!("Quantity must not exceed available stock quantity ({})", item.quantity),
        ));
    }

    item.quantity = round_qty(item.quantity - quantity);
    StockRepository::new(conn).update_item(item)?;
    track(
        conn,
        item.id,
        StockHistoryCode::StockRemove,
        user,
        notes,
        Some(serde_json::json!({ "removed": quantity, "quantity": item.quantity })),
    )
}

/// 为库存项增加数量
pub(crate) fn add_stock(
    conn: &Connection,
    item: &mut StockItem,
    quantity: f64,
    user: &str,
    notes: &str,
) -> ApiResult<()> {
    let quantity = round_qty(quantity);
    if !is_positive(quantity) {
        return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
    }
    if item.is_serialized() {
        return Err(ApiError::field("quantity", "Serialized stock quantity cannot be changed"));
    }

    item.quantity = round_qty(item.quantity + quantity);
    StockRepository::new(conn).update_item(item)?;
    track(
        conn,
        item.id,
        StockHistoryCode::StockAdd,
        user,
        notes,
        Some(serde_json::json!({ "added": quantity, "quantity": item.quantity })),
    )
}

/// 取出 quantity 供后续处理：数量不足整项时先拆分
///
/// 返回承载 quantity 的库存项（整项或拆出的新项）
pub(crate) fn detach_quantity(
    conn: &Connection,
    item: &mut StockItem,
    quantity: f64,
    user: &str,
    notes: &str,
) -> ApiResult<StockItem> {
    if qty_gt(item.quantity, quantity) {
        split_item(conn, item, quantity, user, notes)
    } else {
        Ok(item.clone())
    }
}

/// 候选在库库存及其未分配数量
///
/// - location: 仅限该库位子树
/// - exclude_location: 排除该库位子树
pub(crate) fn candidate_stock(
    conn: &Connection,
    part_ids: &[i64],
    location: Option<i64>,
    exclude_location: Option<i64>,
) -> ApiResult<Vec<(StockItem, f64)>> {
    let repo = StockRepository::new(conn);

    let include = match location {
        Some(id) => Some(repo.location_subtree_ids(id)?),
        None => None,
    };
    let exclude = match exclude_location {
        Some(id) => repo.location_subtree_ids(id)?,
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for item in repo.list_candidate_items(part_ids)? {
        if !item.in_stock() {
            continue;
        }
        if let Some(ids) = &include {
            if !matches!(item.location_id, Some(loc) if ids.contains(&loc)) {
                continue;
            }
        }
        if matches!(item.location_id, Some(loc) if exclude.contains(&loc)) {
            continue;
        }

        let available = unallocated_quantity(conn, &item)?;
        if is_positive(available) {
            out.push((item, available));
        }
    }
    Ok(out)
}
