// ==========================================
// MRP 订单系统 - API 公共辅助
// ==========================================
// 职责: 设置快照、订单编号解析、操作日志写入、事件发布
// 约定: 事务内只使用已读取的设置快照（共享连接不可重入）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{OrderSettings, OrderSettingsReader};
use crate::domain::action_log::ActionLog;
use crate::engine::events::{publish_or_warn, OrderEvent, OrderEventPublisher};
use crate::engine::reference::{extract_reference_int, next_reference, ReferencePattern};
use crate::repository::ActionLogRepository;
use chrono::NaiveDate;
use rusqlite::Connection;

/// 读取订单设置快照
pub(crate) fn load_settings(reader: &dyn OrderSettingsReader) -> ApiResult<OrderSettings> {
    reader
        .order_settings()
        .map_err(|e| ApiError::InternalError(format!("读取订单设置失败: {}", e)))
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// 解析订单编号
///
/// - 未给出: 按模式生成 max(reference_int) + 1
/// - 已给出: 必须匹配模式
///
/// 返回 (reference, reference_int)，唯一性由调用方检查
pub(crate) fn resolve_reference(
    given: Option<&str>,
    pattern: &str,
    max_reference_int: i64,
) -> ApiResult<(String, i64)> {
    let parsed = ReferencePattern::parse(pattern)?;

    match given.map(str::trim).filter(|r| !r.is_empty()) {
        None => {
            let reference = next_reference(pattern, max_reference_int)?;
            let reference_int = parsed
                .extract_int(&reference)
                .unwrap_or_else(|| extract_reference_int(&reference));
            Ok((reference, reference_int))
        }
        Some(reference) => {
            let reference_int = parsed.extract_int(reference).ok_or_else(|| {
                ApiError::field(
                    "reference",
                    format!("Reference must match required pattern: {}", pattern),
                )
            })?;
            Ok((reference.to_string(), reference_int))
        }
    }
}

pub(crate) fn duplicate_reference(reference: &str) -> ApiError {
    ApiError::field("reference", format!("Reference must be unique: {}", reference))
}

/// 写入操作日志（与业务写入同一事务）
pub(crate) fn log_action(conn: &Connection, log: ActionLog) -> ApiResult<()> {
    ActionLogRepository::new(conn).insert(&log)?;
    Ok(())
}

/// 事务提交后发布事件
pub(crate) fn publish_all(publisher: &dyn OrderEventPublisher, events: Vec<OrderEvent>) {
    for event in events {
        publish_or_warn(publisher, event);
    }
}
