// ==========================================
// MRP 订单系统 - 生产订单 API
// ==========================================
// 职责: 生产订单创建/下达、订单树、产出、分配、完工、取消
// 子模块:
// - outputs: 产出创建/删除/完工
// - allocation: 手工分配、自动分配、分配报告、裁剪
// - completion: 整单完工、取消
// 说明:
// - 追踪件（子件 trackable）按产出分配，install_into = 产出
// - 非追踪件按整单分配，整单完工时消耗
// ==========================================

mod allocation;
mod completion;
mod outputs;

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::common::{
    duplicate_reference, load_settings, log_action, publish_all, resolve_reference, today,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::stock_ops;
use crate::config::OrderSettingsReader;
use crate::db::Database;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::build::{Build, BuildItem};
use crate::domain::part::BomItem;
use crate::domain::stock::StockItem;
use crate::domain::types::{BuildStatus, StockHistoryCode, StockStatus};
use crate::engine::allocation::BomLineRequirement;
use crate::engine::events::{event_names, OrderEvent, OrderEventPublisher};
use crate::engine::quantity::{is_integer_qty, is_positive, qty_gt, round_qty};
use crate::engine::transitions::{build_transition, OrderAction};
use crate::perf::PerfGuard;
use crate::repository::{
    BuildRepository, PartRepository, SalesOrderRepository, StockRepository,
};

pub use allocation::{AutoAllocateOptions, BuildAllocationRequest};
pub use completion::{CompleteBuildOptions, OverallocationPolicy};
pub use outputs::CompleteOutputsRequest;

// ==========================================
// 请求 / 响应结构
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBuild {
    pub reference: Option<String>,
    pub part_id: i64,
    pub quantity: f64,
    pub title: String,
    pub parent_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub take_from_id: Option<i64>,
    pub destination_id: Option<i64>,
    pub batch: String,
    pub priority: i64,
    pub target_date: Option<NaiveDate>,
    pub responsible: Option<String>,
    pub notes: String,
}

/// BOM 行分配状况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLineReport {
    pub bom_item_id: i64,
    pub sub_part_id: i64,
    pub trackable: bool,
    pub optional: bool,
    pub consumable: bool,
    pub required: f64,
    pub allocated: f64,
    pub unallocated: f64,
    pub fully_allocated: bool,
    pub over_allocated: bool,
}

/// 分配报告
///
/// output = None: 非追踪行（整单）；Some: 追踪行（该产出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildAllocationReport {
    pub build_id: i64,
    pub output_id: Option<i64>,
    pub lines: Vec<BomLineReport>,
    pub is_fully_allocated: bool,
    pub has_overallocated_parts: bool,
}

// ==========================================
// BuildOrderApi - 生产订单 API
// ==========================================
pub struct BuildOrderApi {
    db: Database,
    settings: Arc<dyn OrderSettingsReader>,
    events: Arc<dyn OrderEventPublisher>,
}

impl BuildOrderApi {
    pub fn new(
        db: Database,
        settings: Arc<dyn OrderSettingsReader>,
        events: Arc<dyn OrderEventPublisher>,
    ) -> Self {
        Self {
            db,
            settings,
            events,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_build(&self, build_id: i64) -> ApiResult<Build> {
        self.db
            .with_conn(|conn| Ok(BuildRepository::new(conn).get(build_id)?))
    }

    pub fn list_builds(&self, statuses: Option<&[BuildStatus]>) -> ApiResult<Vec<Build>> {
        self.db
            .with_conn(|conn| Ok(BuildRepository::new(conn).list(statuses)?))
    }

    pub fn list_overdue(&self, today: NaiveDate) -> ApiResult<Vec<Build>> {
        let builds = self.list_builds(Some(&BuildStatus::ACTIVE))?;
        Ok(builds.into_iter().filter(|b| b.is_overdue(today)).collect())
    }

    /// 生产分配列表
    pub fn list_allocations(&self, build_id: i64) -> ApiResult<Vec<BuildItem>> {
        self.db
            .with_conn(|conn| Ok(BuildRepository::new(conn).list_items(build_id)?))
    }

    /// 产出列表（complete = true 为已完工产出）
    pub fn list_outputs(&self, build_id: i64, complete: bool) -> ApiResult<Vec<StockItem>> {
        self.db.with_conn(|conn| {
            let stock = StockRepository::new(conn);
            Ok(if complete {
                stock.list_completed_outputs(build_id)?
            } else {
                stock.list_incomplete_outputs(build_id)?
            })
        })
    }

    // ==========================================
    // 订单树
    // ==========================================

    /// 子订单: cascade = false 仅直接子订单，true 为全部后代
    pub fn sub_builds(&self, build_id: i64, cascade: bool) -> ApiResult<Vec<Build>> {
        self.db.with_conn(|conn| {
            let repo = BuildRepository::new(conn);
            repo.get(build_id)?;
            Ok(if cascade {
                repo.list_descendants(build_id)?
            } else {
                repo.list_children(build_id)?
            })
        })
    }

    /// 设置父订单（拒绝成环）
    pub fn set_parent(&self, build_id: i64, parent_id: Option<i64>, user: &str) -> ApiResult<Build> {
        self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let mut build = repo.get(build_id)?;
            if let Some(parent) = parent_id {
                repo.get(parent)?;
                if parent == build_id || repo.ancestor_ids(parent)?.contains(&build_id) {
                    return Err(ApiError::field("parent", "Invalid choice for parent build"));
                }
            }
            build.parent_id = parent_id;
            repo.update(&build)?;
            tracing::debug!(build_id, ?parent_id, user, "生产订单父级已变更");
            Ok(build)
        })
    }

    // ==========================================
    // 创建 / 下达
    // ==========================================

    pub fn create_build(&self, new: NewBuild, user: &str) -> ApiResult<Build> {
        let _perf = PerfGuard::new("create_build");
        let settings = load_settings(self.settings.as_ref())?;
        let quantity = round_qty(new.quantity);
        if !is_positive(quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }

        self.db.with_transaction(|tx| {
            let part = PartRepository::new(tx).get(new.part_id)?;
            if !part.assembly {
                return Err(ApiError::field("part", "Build order part must be an assembly"));
            }
            if part.trackable && !is_integer_qty(quantity) {
                return Err(ApiError::field(
                    "quantity",
                    "Build quantity must be integer value for trackable parts",
                ));
            }

            let repo = BuildRepository::new(tx);
            if let Some(parent) = new.parent_id {
                repo.get(parent)?;
            }
            if let Some(so) = new.sales_order_id {
                SalesOrderRepository::new(tx).get(so)?;
            }
            let stock = StockRepository::new(tx);
            for loc in [new.take_from_id, new.destination_id].into_iter().flatten() {
                stock.get_location(loc)?;
            }

            let (reference, reference_int) = resolve_reference(
                new.reference.as_deref(),
                &settings.build_order_reference_pattern,
                repo.max_reference_int()?,
            )?;
            if repo.find_by_reference(&reference)?.is_some() {
                return Err(duplicate_reference(&reference));
            }

            let mut build = Build {
                id: 0,
                reference,
                reference_int,
                title: new.title.clone(),
                part_id: part.id,
                quantity,
                completed: 0.0,
                parent_id: new.parent_id,
                sales_order_id: new.sales_order_id,
                take_from_id: new.take_from_id,
                destination_id: new.destination_id.or(part.default_location_id),
                batch: new.batch.clone(),
                status: BuildStatus::Pending,
                priority: new.priority,
                creation_date: today(),
                target_date: new.target_date,
                completion_date: None,
                issued_by: Some(user.to_string()),
                completed_by: None,
                responsible: new.responsible.clone(),
                notes: new.notes.clone(),
            };
            build.id = repo.insert(&build)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CreateBuild, user, "build", Some(build.id))
                    .with_payload(&serde_json::json!({
                        "reference": build.reference,
                        "part_id": build.part_id,
                        "quantity": build.quantity,
                    })),
            )?;
            tracing::info!(build_id = build.id, reference = %build.reference, "生产订单已创建");
            Ok(build)
        })
    }

    /// 下达: Pending → Production
    pub fn issue_build(&self, build_id: i64, user: &str) -> ApiResult<Build> {
        let build = self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let mut build = repo.get(build_id)?;
            build.status = build_transition(build.status, OrderAction::Issue)?;
            repo.update(&build)?;
            log_action(tx, ActionLog::new(ActionType::IssueBuild, user, "build", Some(build_id)))?;
            Ok::<_, ApiError>(build)
        })?;

        tracing::info!(build_id, "生产订单已下达");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::BUILD_ISSUED, build_id)],
        );
        Ok(build)
    }
}

// ==========================================
// 事务内辅助
// ==========================================

/// BOM 行 + 子件是否追踪
struct BomLine {
    bom: BomItem,
    trackable: bool,
}

impl BomLine {
    /// 可选行不阻塞"已完全分配"判定
    fn blocks_completion(&self) -> bool {
        !self.bom.optional && !self.bom.consumable
    }
}

fn load_bom_lines(conn: &Connection, part_id: i64) -> ApiResult<Vec<BomLine>> {
    let parts = PartRepository::new(conn);
    let mut lines = Vec::new();
    for bom in parts.list_bom_items(part_id)? {
        let trackable = parts.get(bom.sub_part_id)?.trackable;
        lines.push(BomLine { bom, trackable });
    }
    Ok(lines)
}

fn ensure_active(build: &Build, message: &str) -> ApiResult<()> {
    if build.is_active() {
        Ok(())
    } else {
        Err(ApiError::validation(message))
    }
}

/// 产出必须属于该订单且仍在生产中
fn ensure_incomplete_output(build: &Build, output: &StockItem) -> ApiResult<()> {
    if output.build_id != Some(build.id) {
        return Err(ApiError::field("output", "Build output does not match the parent build"));
    }
    if !output.is_building {
        return Err(ApiError::field("output", "This build output has already been completed"));
    }
    Ok(())
}

/// 分配报告（事务内）
fn build_report(
    conn: &Connection,
    build: &Build,
    output: Option<&StockItem>,
) -> ApiResult<BuildAllocationReport> {
    let items = match output {
        Some(o) => BuildRepository::new(conn).list_items_for_output(o.id)?,
        None => BuildRepository::new(conn)
            .list_items(build.id)?
            .into_iter()
            .filter(|i| i.install_into_id.is_none())
            .collect(),
    };
    let quantity = output.map(|o| o.quantity).unwrap_or(build.quantity);

    let mut lines = Vec::new();
    let mut fully = true;
    let mut over = false;
    for line in load_bom_lines(conn, build.part_id)? {
        // output = None 只看非追踪行，Some 只看追踪行
        if line.trackable != output.is_some() {
            continue;
        }
        let req = BomLineRequirement::new(line.bom.quantity, quantity, line.bom.consumable);
        let allocated = round_qty(
            items
                .iter()
                .filter(|i| i.bom_item_id == line.bom.id)
                .map(|i| i.quantity)
                .sum(),
        );
        let fully_allocated = req.is_fully_allocated(allocated);
        let over_allocated = req.is_over_allocated(allocated);
        if line.blocks_completion() && !fully_allocated {
            fully = false;
        }
        over |= over_allocated;

        lines.push(BomLineReport {
            bom_item_id: line.bom.id,
            sub_part_id: line.bom.sub_part_id,
            trackable: line.trackable,
            optional: line.bom.optional,
            consumable: line.bom.consumable,
            required: req.required(),
            allocated,
            unallocated: req.unallocated(allocated),
            fully_allocated,
            over_allocated,
        });
    }

    Ok(BuildAllocationReport {
        build_id: build.id,
        output_id: output.map(|o| o.id),
        lines,
        is_fully_allocated: fully,
        has_overallocated_parts: over,
    })
}

/// 取出分配数量对应的库存项（部分数量先拆分）
fn take_allocated_stock(
    conn: &Connection,
    build: &Build,
    allocation: &BuildItem,
    user: &str,
) -> ApiResult<StockItem> {
    let mut item = StockRepository::new(conn).get_item(allocation.stock_item_id)?;
    if qty_gt(allocation.quantity, item.quantity) {
        return Err(ApiError::BusinessRuleViolation(format!(
            "Allocated quantity ({}) exceeds stock quantity ({}) for item {}",
            allocation.quantity, item.quantity, item.id
        )));
    }
    stock_ops::detach_quantity(conn, &mut item, allocation.quantity, user, &build.reference)
}

/// 消耗一条分配: 库存项标记 consumed_by = build，删除分配
fn consume_allocation(
    conn: &Connection,
    build: &Build,
    allocation: &BuildItem,
    user: &str,
) -> ApiResult<()> {
    let mut consumed = take_allocated_stock(conn, build, allocation, user)?;
    consumed.consumed_by_id = Some(build.id);
    StockRepository::new(conn).update_item(&consumed)?;
    stock_ops::track(
        conn,
        consumed.id,
        StockHistoryCode::BuildConsumed,
        user,
        &build.reference,
        Some(serde_json::json!({ "buildorder": build.id, "quantity": consumed.quantity })),
    )?;
    BuildRepository::new(conn).delete_item(allocation.id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_and_consumable_lines_do_not_block() {
        let bom = |optional: bool, consumable: bool| BomLine {
            bom: BomItem {
                id: 1,
                part_id: 1,
                sub_part_id: 2,
                quantity: 1.0,
                reference: String::new(),
                optional,
                consumable,
                substitute_part_ids: Vec::new(),
            },
            trackable: false,
        };
        assert!(bom(false, false).blocks_completion());
        assert!(!bom(true, false).blocks_completion());
        assert!(!bom(false, true).blocks_completion());
    }
}
