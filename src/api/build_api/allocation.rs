use super::*;

use crate::engine::allocation::{
    plan_auto_allocation, plan_trim, validate_stock_allocation, AllocationCandidate, TrimStep,
};

/// 生产分配请求
///
/// output: 追踪件必填（分配到具体产出），非追踪件必须为空
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildAllocationRequest {
    pub bom_item_id: i64,
    pub stock_item_id: i64,
    pub quantity: f64,
    pub output_id: Option<i64>,
}

/// 自动分配选项
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoAllocateOptions {
    pub location: Option<i64>,         // 为空时取订单领料库位
    pub exclude_location: Option<i64>,
    pub interchangeable: bool,         // 多个候选是否可互换
    pub substitutes: bool,             // 是否使用替代件
    pub optional_items: bool,          // 是否分配可选行
}

impl Default for AutoAllocateOptions {
    fn default() -> Self {
        Self {
            location: None,
            exclude_location: None,
            interchangeable: false,
            substitutes: true,
            optional_items: false,
        }
    }
}

impl BuildOrderApi {
    // ==========================================
    // 手工分配
    // ==========================================

    pub fn allocate_stock(
        &self,
        build_id: i64,
        requests: Vec<BuildAllocationRequest>,
        user: &str,
    ) -> ApiResult<Vec<BuildItem>> {
        let _perf = PerfGuard::new("allocate_build_stock");
        if requests.is_empty() {
            return Err(ApiError::validation("Allocation items must be provided"));
        }
        let settings = load_settings(self.settings.as_ref())?;
        let today = today();

        self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let parts = PartRepository::new(tx);
            let stock = StockRepository::new(tx);

            let build = repo.get(build_id)?;
            ensure_active(&build, "Stock can only be allocated to an active build order")?;

            let mut created = Vec::new();
            for request in &requests {
                let bom = parts.get_bom_item(request.bom_item_id)?;
                if bom.part_id != build.part_id {
                    return Err(ApiError::field(
                        "bom_item",
                        "bom_item.part must point to the same part as the build order",
                    ));
                }
                if bom.consumable {
                    tracing::debug!(bom_item_id = bom.id, "耗材行不分配，跳过");
                    continue;
                }

                let item = stock.get_item(request.stock_item_id)?;
                if !bom.is_valid_part(item.part_id) {
                    return Err(ApiError::field(
                        "stock_item",
                        "Selected stock item does not match BOM line",
                    ));
                }
                if !item.in_stock() {
                    return Err(ApiError::field("stock_item", "Item must be in stock"));
                }
                if settings.expired_blocks_build(item.expiry_date, today) {
                    return Err(ApiError::field(
                        "stock_item",
                        "Expired stock items cannot be allocated",
                    ));
                }

                let quantity = round_qty(request.quantity);
                let available = stock_ops::unallocated_quantity(tx, &item)?;
                validate_stock_allocation(quantity, available, item.is_serialized())?;

                let tracked = parts.get(bom.sub_part_id)?.trackable;
                match (tracked, request.output_id) {
                    (true, None) => {
                        return Err(ApiError::field(
                            "output",
                            "Build output must be specified for allocation of tracked parts",
                        ))
                    }
                    (false, Some(_)) => {
                        return Err(ApiError::field(
                            "output",
                            "Build output cannot be specified for allocation of untracked parts",
                        ))
                    }
                    (true, Some(output_id)) => {
                        ensure_incomplete_output(&build, &stock.get_item(output_id)?)?;
                    }
                    (false, None) => {}
                }

                if repo
                    .find_item_by_key(build.id, item.id, request.output_id)?
                    .is_some()
                {
                    return Err(ApiError::field(
                        "stock_item",
                        "This stock item has already been allocated to this build output",
                    ));
                }

                let mut allocation = BuildItem {
                    id: 0,
                    build_id: build.id,
                    bom_item_id: bom.id,
                    stock_item_id: item.id,
                    quantity,
                    install_into_id: request.output_id,
                };
                allocation.id = repo.insert_item(&allocation)?;
                tracing::debug!(
                    build_id,
                    bom_item_id = bom.id,
                    item_id = item.id,
                    quantity,
                    available,
                    "生产分配"
                );
                created.push(allocation);
            }

            log_action(
                tx,
                ActionLog::new(ActionType::AllocateBuildStock, user, "build", Some(build_id))
                    .with_payload(&requests),
            )?;
            Ok(created)
        })
    }

    /// 删除分配
    ///
    /// bom_item 为空表示全部行；output 为空表示非追踪分配
    pub fn unallocate(
        &self,
        build_id: i64,
        bom_item_id: Option<i64>,
        output_id: Option<i64>,
        user: &str,
    ) -> ApiResult<usize> {
        self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            repo.get(build_id)?;

            let mut removed = 0;
            for allocation in repo.list_items(build_id)? {
                if allocation.install_into_id != output_id {
                    continue;
                }
                if bom_item_id.is_some_and(|b| b != allocation.bom_item_id) {
                    continue;
                }
                repo.delete_item(allocation.id)?;
                removed += 1;
            }
            tracing::debug!(build_id, ?bom_item_id, ?output_id, removed, user, "生产分配已删除");
            Ok(removed)
        })
    }

    // ==========================================
    // 自动分配
    // ==========================================

    /// 自动分配非追踪、非耗材 BOM 行
    ///
    /// 返回新建/增加的分配数
    pub fn auto_allocate(
        &self,
        build_id: i64,
        options: AutoAllocateOptions,
        user: &str,
    ) -> ApiResult<usize> {
        let _perf = PerfGuard::new("auto_allocate_build");
        let settings = load_settings(self.settings.as_ref())?;
        let today = today();

        self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let build = repo.get(build_id)?;
            ensure_active(&build, "Stock can only be allocated to an active build order")?;
            let location = options.location.or(build.take_from_id);

            let mut applied = 0;
            for line in load_bom_lines(tx, build.part_id)? {
                if line.trackable || line.bom.consumable {
                    continue;
                }
                if line.bom.optional && !options.optional_items {
                    continue;
                }

                let untracked: Vec<BuildItem> = repo
                    .list_items(build.id)?
                    .into_iter()
                    .filter(|i| i.install_into_id.is_none())
                    .collect();
                let allocated: f64 = untracked
                    .iter()
                    .filter(|i| i.bom_item_id == line.bom.id)
                    .map(|i| i.quantity)
                    .sum();
                // (build, stock item, output) 唯一: 已分配给其他 BOM 行的库存项不参与本行
                let held_by_other_lines: Vec<i64> = untracked
                    .iter()
                    .filter(|i| i.bom_item_id != line.bom.id)
                    .map(|i| i.stock_item_id)
                    .collect();
                let req = BomLineRequirement::new(line.bom.quantity, build.quantity, false);
                let unallocated = req.unallocated(allocated);
                if !is_positive(unallocated) {
                    continue;
                }

                let part_ids = if options.substitutes {
                    line.bom.valid_part_ids()
                } else {
                    vec![line.bom.sub_part_id]
                };
                let mut candidates: Vec<(StockItem, f64)> =
                    stock_ops::candidate_stock(tx, &part_ids, location, options.exclude_location)?
                        .into_iter()
                        .filter(|(item, _)| !settings.expired_blocks_build(item.expiry_date, today))
                        .filter(|(item, _)| !held_by_other_lines.contains(&item.id))
                        .collect();
                candidates.sort_by(|a, b| {
                    a.0.quantity
                        .total_cmp(&b.0.quantity)
                        .then(a.0.id.cmp(&b.0.id))
                });

                let plan = plan_auto_allocation(
                    unallocated,
                    &candidates
                        .iter()
                        .map(|(item, available)| AllocationCandidate {
                            stock_item_id: item.id,
                            available: *available,
                        })
                        .collect::<Vec<_>>(),
                    options.interchangeable,
                );

                for (stock_item_id, quantity) in plan {
                    match repo.find_item_by_key(build.id, stock_item_id, None)? {
                        Some(existing) if existing.bom_item_id != line.bom.id => {
                            tracing::debug!(
                                stock_item_id,
                                bom_item_id = existing.bom_item_id,
                                "库存项已分配给其他 BOM 行, 跳过"
                            );
                            continue;
                        }
                        Some(mut existing) => {
                            existing.quantity = round_qty(existing.quantity + quantity);
                            repo.update_item(&existing)?;
                        }
                        None => {
                            repo.insert_item(&BuildItem {
                                id: 0,
                                build_id: build.id,
                                bom_item_id: line.bom.id,
                                stock_item_id,
                                quantity,
                                install_into_id: None,
                            })?;
                        }
                    }
                    applied += 1;
                }
            }

            log_action(
                tx,
                ActionLog::new(ActionType::AutoAllocateBuild, user, "build", Some(build_id))
                    .with_payload(&options),
            )?;
            tracing::info!(build_id, applied, "自动分配完成");
            Ok(applied)
        })
    }

    // ==========================================
    // 分配报告 / 裁剪
    // ==========================================

    pub fn allocation_report(
        &self,
        build_id: i64,
        output_id: Option<i64>,
    ) -> ApiResult<BuildAllocationReport> {
        self.db.with_conn(|conn| {
            let build = BuildRepository::new(conn).get(build_id)?;
            let output = match output_id {
                Some(id) => {
                    let output = StockRepository::new(conn).get_item(id)?;
                    if output.build_id != Some(build.id) {
                        return Err(ApiError::field(
                            "output",
                            "Build output does not match the parent build",
                        ));
                    }
                    Some(output)
                }
                None => None,
            };
            build_report(conn, &build, output.as_ref())
        })
    }

    /// 裁剪超量分配（仅非追踪行）
    pub fn trim_allocated_stock(&self, build_id: i64, user: &str) -> ApiResult<usize> {
        self.db.with_transaction(|tx| {
            let build = BuildRepository::new(tx).get(build_id)?;
            let steps = trim_in_tx(tx, &build)?;
            tracing::info!(build_id, steps, user, "超量分配已裁剪");
            Ok(steps)
        })
    }
}

/// 按 plan_trim 裁剪非追踪超量行，返回执行的步骤数
pub(super) fn trim_in_tx(conn: &Connection, build: &Build) -> ApiResult<usize> {
    let repo = BuildRepository::new(conn);
    let items = repo.list_items(build.id)?;

    let mut applied = 0;
    for line in load_bom_lines(conn, build.part_id)? {
        if line.trackable || line.bom.consumable {
            continue;
        }
        let req = BomLineRequirement::new(line.bom.quantity, build.quantity, false);
        let allocations: Vec<(i64, f64)> = items
            .iter()
            .filter(|i| i.bom_item_id == line.bom.id && i.install_into_id.is_none())
            .map(|i| (i.id, i.quantity))
            .collect();

        for step in plan_trim(req.required(), &allocations) {
            match step {
                TrimStep::Reduce {
                    allocation_id,
                    new_quantity,
                } => {
                    if let Some(mut item) = repo.find_item(allocation_id)? {
                        item.quantity = new_quantity;
                        repo.update_item(&item)?;
                    }
                }
                TrimStep::Delete { allocation_id } => repo.delete_item(allocation_id)?,
            }
            applied += 1;
        }
    }
    Ok(applied)
}
