use super::*;

use super::allocation::trim_in_tx;

/// 超量分配处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallocationPolicy {
    /// 存在超量分配时拒绝完工
    #[default]
    Reject,
    /// 按分配数量全部消耗
    Accept,
    /// 先裁剪到需求量再消耗
    Trim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompleteBuildOptions {
    pub accept_overallocated: OverallocationPolicy,
    pub accept_unallocated: bool,
    pub accept_incomplete: bool,
}

impl BuildOrderApi {
    // ==========================================
    // 整单完工 / 取消
    // ==========================================

    /// 整单完工
    ///
    /// 校验顺序: 状态 → 未完工产出 → 超量分配 → 未分配 → 未完成数量
    pub fn complete_build(
        &self,
        build_id: i64,
        options: CompleteBuildOptions,
        user: &str,
    ) -> ApiResult<Build> {
        let _perf = PerfGuard::new("complete_build");

        let build = self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let mut build = repo.get(build_id)?;
            let status = build_transition(build.status, OrderAction::Complete)?;

            if !StockRepository::new(tx).list_incomplete_outputs(build_id)?.is_empty() {
                return Err(ApiError::validation("Build order has incomplete outputs"));
            }

            let report = build_report(tx, &build, None)?;
            if report.has_overallocated_parts
                && options.accept_overallocated == OverallocationPolicy::Reject
            {
                return Err(ApiError::validation("Some stock items have been overallocated"));
            }
            if !report.is_fully_allocated && !options.accept_unallocated {
                return Err(ApiError::validation("Required stock has not been fully allocated"));
            }
            if is_positive(build.remaining()) && !options.accept_incomplete {
                return Err(ApiError::validation(
                    "Required build quantity has not been completed",
                ));
            }

            if options.accept_overallocated == OverallocationPolicy::Trim {
                let steps = trim_in_tx(tx, &build)?;
                tracing::debug!(build_id, steps, "完工前裁剪超量分配");
            }

            // 剩余非追踪分配全部消耗
            let mut consumed = 0;
            for allocation in repo.list_items(build_id)? {
                if allocation.install_into_id.is_none() {
                    consume_allocation(tx, &build, &allocation, user)?;
                    consumed += 1;
                }
            }

            build.status = status;
            build.completion_date = Some(today());
            build.completed_by = Some(user.to_string());
            repo.update(&build)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CompleteBuild, user, "build", Some(build_id))
                    .with_payload(&serde_json::json!({
                        "options": options,
                        "consumed_allocations": consumed,
                    })),
            )?;
            tracing::info!(build_id, consumed, completed = build.completed, "生产订单已完工");
            Ok(build)
        })?;

        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::BUILD_COMPLETED, build_id)],
        );
        Ok(build)
    }

    /// 取消生产订单
    ///
    /// - remove_allocated_stock: 分配的库存按消耗处理，否则仅释放
    /// - remove_incomplete_outputs: 删除未完工产出
    pub fn cancel_build(
        &self,
        build_id: i64,
        remove_allocated_stock: bool,
        remove_incomplete_outputs: bool,
        user: &str,
    ) -> ApiResult<Build> {
        let build = self.db.with_transaction(|tx| {
            let repo = BuildRepository::new(tx);
            let stock = StockRepository::new(tx);
            let mut build = repo.get(build_id)?;
            build.status = build_transition(build.status, OrderAction::Cancel)?;

            let mut consumed = 0;
            let mut released = 0;
            for allocation in repo.list_items(build_id)? {
                // 已安装进完工产出的分配只保留记录
                let installed = stock.get_item(allocation.stock_item_id)?.belongs_to_id.is_some();
                if installed {
                    continue;
                }
                if remove_allocated_stock {
                    consume_allocation(tx, &build, &allocation, user)?;
                    consumed += 1;
                } else {
                    repo.delete_item(allocation.id)?;
                    released += 1;
                }
            }

            let mut removed_outputs = 0;
            if remove_incomplete_outputs {
                for output in stock.list_incomplete_outputs(build_id)? {
                    stock.delete_item(output.id)?;
                    removed_outputs += 1;
                }
            }

            build.completion_date = Some(today());
            build.completed_by = Some(user.to_string());
            repo.update(&build)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CancelBuild, user, "build", Some(build_id))
                    .with_payload(&serde_json::json!({
                        "consumed": consumed,
                        "released": released,
                        "removed_outputs": removed_outputs,
                    })),
            )?;
            tracing::info!(build_id, consumed, released, removed_outputs, "生产订单已取消");
            Ok::<_, ApiError>(build)
        })?;

        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::BUILD_CANCELLED, build_id)],
        );
        Ok(build)
    }
}
