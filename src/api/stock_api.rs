// ==========================================
// MRP 订单系统 - 库存 API
// ==========================================
// 职责: 库位、库存项创建、拆分/增减、分配占用查询、履历
// ==========================================

use crate::api::common::log_action;
use crate::api::error::{ApiError, ApiResult};
use crate::api::stock_ops;
use crate::db::Database;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::stock::{StockItem, StockItemTracking, StockLocation};
use crate::domain::types::StockHistoryCode;
use crate::engine::quantity::{is_positive, qty_eq, round_qty};
use crate::perf::PerfGuard;
use crate::repository::{PartRepository, StockRepository};
use serde::{Deserialize, Serialize};

/// 可用库存（在库且有未分配数量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableStock {
    pub item: StockItem,
    pub unallocated: f64,
}

// ==========================================
// StockApi - 库存 API
// ==========================================
pub struct StockApi {
    db: Database,
}

impl StockApi {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ==========================================
    // 库位
    // ==========================================

    pub fn create_location(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<i64>,
    ) -> ApiResult<StockLocation> {
        if name.trim().is_empty() {
            return Err(ApiError::field("name", "Location name must not be empty"));
        }

        self.db.with_transaction(|tx| {
            let repo = StockRepository::new(tx);
            if let Some(parent) = parent_id {
                repo.get_location(parent)?;
            }
            let mut location = StockLocation {
                id: 0,
                name: name.trim().to_string(),
                description: description.to_string(),
                parent_id,
            };
            location.id = repo.insert_location(&location)?;
            Ok(location)
        })
    }

    /// 库位子树 ID（含自身）
    pub fn location_tree_ids(&self, root_id: i64) -> ApiResult<Vec<i64>> {
        self.db.with_conn(|conn| {
            let repo = StockRepository::new(conn);
            repo.get_location(root_id)?;
            Ok(repo.location_subtree_ids(root_id)?)
        })
    }

    // ==========================================
    // 库存项
    // ==========================================

    pub fn get_item(&self, item_id: i64) -> ApiResult<StockItem> {
        self.db
            .with_conn(|conn| Ok(StockRepository::new(conn).get_item(item_id)?))
    }

    /// 创建库存项
    ///
    /// - 数量 > 0
    /// - 有序列号时数量必须为 1，且同零件内序列号唯一
    pub fn create_stock_item(&self, item: StockItem, user: &str) -> ApiResult<StockItem> {
        let _perf = PerfGuard::new("create_stock_item");
        let mut item = item;
        item.quantity = round_qty(item.quantity);
        item.serial = item
            .serial
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if !is_positive(item.quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }
        if item.serial.is_some() && !qty_eq(item.quantity, 1.0) {
            return Err(ApiError::field(
                "quantity",
                "Quantity must be 1 for item with a serial number",
            ));
        }

        self.db.with_transaction(|tx| {
            let part = PartRepository::new(tx).get(item.part_id)?;
            if part.is_virtual {
                return Err(ApiError::field("part", "Virtual parts cannot hold stock"));
            }

            let repo = StockRepository::new(tx);
            if let Some(serial) = item.serial.as_deref() {
                if repo.find_by_serial(part.id, serial)?.is_some() {
                    return Err(ApiError::field(
                        "serial",
                        format!("Serial number already exists: {}", serial),
                    ));
                }
                item.serial_int = serial.parse::<i64>().ok();
            }
            if let Some(loc) = item.location_id {
                repo.get_location(loc)?;
            }

            item.id = repo.insert_item(&item)?;
            stock_ops::track(
                tx,
                item.id,
                StockHistoryCode::Created,
                user,
                "",
                Some(serde_json::json!({ "quantity": item.quantity })),
            )?;
            log_action(
                tx,
                ActionLog::new(ActionType::AdjustStock, user, "stock_item", Some(item.id))
                    .with_detail("create"),
            )?;

            tracing::info!(item_id = item.id, part_id = part.id, quantity = item.quantity, "库存项已创建");
            Ok(item)
        })
    }

    /// 拆分库存项，返回拆出的新项
    pub fn split_stock(&self, item_id: i64, quantity: f64, user: &str) -> ApiResult<StockItem> {
        let _perf = PerfGuard::new("split_stock");
        self.db.with_transaction(|tx| {
            let mut item = StockRepository::new(tx).get_item(item_id)?;
            let child = stock_ops::split_item(tx, &mut item, quantity, user, "")?;
            log_action(
                tx,
                ActionLog::new(ActionType::AdjustStock, user, "stock_item", Some(item_id))
                    .with_payload(&serde_json::json!({ "split": quantity, "child": child.id })),
            )?;
            Ok(child)
        })
    }

    pub fn take_stock(
        &self,
        item_id: i64,
        quantity: f64,
        user: &str,
        notes: &str,
    ) -> ApiResult<StockItem> {
        self.db.with_transaction(|tx| {
            let mut item = StockRepository::new(tx).get_item(item_id)?;
            stock_ops::take_stock(tx, &mut item, quantity, user, notes)?;
            log_action(
                tx,
                ActionLog::new(ActionType::AdjustStock, user, "stock_item", Some(item_id))
                    .with_payload(&serde_json::json!({ "take": quantity })),
            )?;
            Ok(item)
        })
    }

    pub fn add_stock(
        &self,
        item_id: i64,
        quantity: f64,
        user: &str,
        notes: &str,
    ) -> ApiResult<StockItem> {
        self.db.with_transaction(|tx| {
            let mut item = StockRepository::new(tx).get_item(item_id)?;
            stock_ops::add_stock(tx, &mut item, quantity, user, notes)?;
            log_action(
                tx,
                ActionLog::new(ActionType::AdjustStock, user, "stock_item", Some(item_id))
                    .with_payload(&serde_json::json!({ "add": quantity })),
            )?;
            Ok(item)
        })
    }

    // ==========================================
    // 分配占用
    // ==========================================

    pub fn allocated_quantity(&self, item_id: i64) -> ApiResult<f64> {
        self.db.with_conn(|conn| {
            StockRepository::new(conn).get_item(item_id)?;
            stock_ops::allocated_quantity(conn, item_id)
        })
    }

    pub fn unallocated_quantity(&self, item_id: i64) -> ApiResult<f64> {
        self.db.with_conn(|conn| {
            let item = StockRepository::new(conn).get_item(item_id)?;
            stock_ops::unallocated_quantity(conn, &item)
        })
    }

    /// 零件可用库存
    ///
    /// - location: 仅限该库位子树
    /// - exclude_location: 排除该库位子树
    pub fn available_stock_for_part(
        &self,
        part_id: i64,
        location: Option<i64>,
        exclude_location: Option<i64>,
    ) -> ApiResult<Vec<AvailableStock>> {
        self.db.with_conn(|conn| {
            PartRepository::new(conn).get(part_id)?;
            let candidates =
                stock_ops::candidate_stock(conn, &[part_id], location, exclude_location)?;
            Ok(candidates
                .into_iter()
                .map(|(item, unallocated)| AvailableStock { item, unallocated })
                .collect())
        })
    }

    pub fn get_tracking(&self, item_id: i64) -> ApiResult<Vec<StockItemTracking>> {
        self.db
            .with_conn(|conn| Ok(StockRepository::new(conn).list_tracking(item_id)?))
    }

    /// 已安装进指定库存项的子项
    pub fn installed_items(&self, item_id: i64) -> ApiResult<Vec<StockItem>> {
        self.db
            .with_conn(|conn| Ok(StockRepository::new(conn).list_installed_in(item_id)?))
    }
}
