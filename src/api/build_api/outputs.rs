use std::collections::HashSet;

use super::*;

use crate::engine::serial::extract_serial_numbers;

/// 产出完工请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOutputsRequest {
    pub outputs: Vec<i64>,
    pub location_id: Option<i64>, // 为空时取订单目标库位
    pub status: StockStatus,
    pub accept_incomplete_allocation: bool,
    pub notes: String,
}

impl CompleteOutputsRequest {
    pub fn new(outputs: Vec<i64>) -> Self {
        Self {
            outputs,
            location_id: None,
            status: StockStatus::Ok,
            accept_incomplete_allocation: false,
            notes: String::new(),
        }
    }
}

impl BuildOrderApi {
    // ==========================================
    // 产出
    // ==========================================

    /// 创建产出
    ///
    /// - 零件追踪或 BOM 含追踪件: 数量必须为整数
    /// - 给出序列号: 每个序列号一个数量为 1 的产出
    /// - 否则: 单个产出，数量 = quantity
    pub fn create_outputs(
        &self,
        build_id: i64,
        quantity: f64,
        serials: Option<&str>,
        batch: Option<&str>,
        user: &str,
    ) -> ApiResult<Vec<StockItem>> {
        let _perf = PerfGuard::new("create_build_outputs");
        let quantity = round_qty(quantity);
        if !is_positive(quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }

        self.db.with_transaction(|tx| {
            let build = BuildRepository::new(tx).get(build_id)?;
            ensure_active(&build, "Build outputs can only be created for an active build")?;

            let parts = PartRepository::new(tx);
            let part = parts.get(build.part_id)?;
            if part.trackable && !is_integer_qty(quantity) {
                return Err(ApiError::field(
                    "quantity",
                    "Integer quantity required for trackable parts",
                ));
            }
            if !is_integer_qty(quantity) && parts.has_trackable_components(part.id)? {
                return Err(ApiError::field(
                    "quantity",
                    "Integer quantity required, as the bill of materials contains trackable parts",
                ));
            }

            let stock = StockRepository::new(tx);
            let serial_numbers = match serials.map(str::trim).filter(|s| !s.is_empty()) {
                Some(text) => {
                    if !part.trackable {
                        return Err(ApiError::field(
                            "serial_numbers",
                            "Serial numbers can only be assigned to trackable parts",
                        ));
                    }
                    let next = stock.max_serial_int(part.id)?.unwrap_or(0) + 1;
                    let numbers = extract_serial_numbers(text, quantity, next)?;
                    let mut existing = Vec::new();
                    for n in &numbers {
                        if stock.find_by_serial(part.id, &n.to_string())?.is_some() {
                            existing.push(n.to_string());
                        }
                    }
                    if !existing.is_empty() {
                        return Err(ApiError::field(
                            "serial_numbers",
                            format!("The following serial numbers already exist: {}", existing.join(", ")),
                        ));
                    }
                    numbers
                }
                None => Vec::new(),
            };

            let mut template = StockItem::new(part.id, quantity);
            template.is_building = true;
            template.build_id = Some(build.id);
            template.location_id = build.destination_id;
            template.batch = batch.map(str::to_string).unwrap_or_else(|| build.batch.clone());

            let mut outputs = Vec::new();
            if serial_numbers.is_empty() {
                outputs.push(template);
            } else {
                for n in &serial_numbers {
                    let mut output = template.clone();
                    output.quantity = 1.0;
                    output.serial = Some(n.to_string());
                    output.serial_int = Some(*n);
                    outputs.push(output);
                }
            }

            for output in outputs.iter_mut() {
                output.id = stock.insert_item(output)?;
                stock_ops::track(
                    tx,
                    output.id,
                    StockHistoryCode::BuildOutputCreated,
                    user,
                    &build.reference,
                    Some(serde_json::json!({ "buildorder": build.id, "quantity": output.quantity })),
                )?;
            }

            log_action(
                tx,
                ActionLog::new(ActionType::CreateBuildOutput, user, "build", Some(build_id))
                    .with_payload(&serde_json::json!({
                        "quantity": quantity,
                        "outputs": outputs.iter().map(|o| o.id).collect::<Vec<_>>(),
                    })),
            )?;
            tracing::info!(build_id, outputs = outputs.len(), quantity, "生产产出已创建");
            Ok(outputs)
        })
    }

    /// 删除未完工产出及其分配
    pub fn delete_outputs(&self, build_id: i64, output_ids: &[i64], user: &str) -> ApiResult<()> {
        self.db.with_transaction(|tx| {
            let build = BuildRepository::new(tx).get(build_id)?;
            let stock = StockRepository::new(tx);
            let builds = BuildRepository::new(tx);

            for id in output_ids {
                let output = stock.get_item(*id)?;
                ensure_incomplete_output(&build, &output)?;
                for allocation in builds.list_items_for_output(output.id)? {
                    builds.delete_item(allocation.id)?;
                }
                stock.delete_item(output.id)?;
            }
            tracing::info!(build_id, deleted = output_ids.len(), user, "生产产出已删除");
            Ok(())
        })
    }

    /// 产出完工
    ///
    /// 追踪件分配安装进产出；产出离开生产状态入库；build.completed 增加
    pub fn complete_outputs(
        &self,
        build_id: i64,
        request: CompleteOutputsRequest,
        user: &str,
    ) -> ApiResult<Vec<StockItem>> {
        let _perf = PerfGuard::new("complete_build_outputs");
        if request.outputs.is_empty() {
            return Err(ApiError::validation("A list of build outputs must be provided"));
        }
        // 同一产出只能完工一次, 重复 id 会让 build.completed 重复累加
        let mut seen = HashSet::new();
        if let Some(dup) = request.outputs.iter().find(|id| !seen.insert(**id)) {
            return Err(ApiError::field(
                "outputs",
                format!("Build output {} is listed more than once", dup),
            ));
        }

        let completed = self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let stock = StockRepository::new(tx);
            let mut build = repo.get(build_id)?;
            ensure_active(&build, "Build outputs can only be completed for an active build")?;

            let location_id = request.location_id.or(build.destination_id);
            if let Some(loc) = location_id {
                stock.get_location(loc)?;
            }

            // 先整体校验，再逐个完工
            let mut outputs = Vec::new();
            for id in &request.outputs {
                let output = stock.get_item(*id)?;
                ensure_incomplete_output(&build, &output)?;
                if output.part_id != build.part_id {
                    return Err(ApiError::field("output", "Build output part does not match build part"));
                }
                if !request.accept_incomplete_allocation
                    && !build_report(tx, &build, Some(&output))?.is_fully_allocated
                {
                    return Err(ApiError::field("output", "This build output is not fully allocated"));
                }
                outputs.push(output);
            }

            for output in outputs.iter_mut() {
                for allocation in repo.list_items_for_output(output.id)? {
                    let mut installed = take_allocated_stock(tx, &build, &allocation, user)?;
                    installed.belongs_to_id = Some(output.id);
                    stock.update_item(&installed)?;
                    stock_ops::track(
                        tx,
                        installed.id,
                        StockHistoryCode::InstalledInto,
                        user,
                        &build.reference,
                        Some(serde_json::json!({ "stockitem": output.id })),
                    )?;
                    stock_ops::track(
                        tx,
                        output.id,
                        StockHistoryCode::InstalledChildItem,
                        user,
                        &build.reference,
                        Some(serde_json::json!({ "stockitem": installed.id })),
                    )?;

                    // 分配改指向已安装的库存项
                    let mut allocation = allocation;
                    allocation.stock_item_id = installed.id;
                    repo.update_item(&allocation)?;
                }

                output.is_building = false;
                output.location_id = location_id;
                output.status = request.status;
                stock.update_item(output)?;
                stock_ops::track(
                    tx,
                    output.id,
                    StockHistoryCode::BuildOutputCompleted,
                    user,
                    &request.notes,
                    Some(serde_json::json!({
                        "status": request.status.code(),
                        "location": location_id,
                        "buildorder": build.id,
                    })),
                )?;

                build.completed = round_qty(build.completed + output.quantity);
            }
            repo.update(&build)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CompleteBuildOutput, user, "build", Some(build_id))
                    .with_payload(&serde_json::json!({
                        "outputs": request.outputs,
                        "accept_incomplete_allocation": request.accept_incomplete_allocation,
                    })),
            )?;
            tracing::info!(build_id, outputs = outputs.len(), completed = build.completed, "生产产出已完工");
            Ok(outputs)
        })?;

        publish_all(
            self.events.as_ref(),
            completed
                .iter()
                .map(|o| {
                    OrderEvent::new(event_names::BUILD_OUTPUT_COMPLETED, build_id)
                        .with_payload(serde_json::json!({ "output": o.id }))
                })
                .collect(),
        );
        Ok(completed)
    }
}
