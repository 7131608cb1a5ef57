use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::row::fmt_datetime;
use rusqlite::{params, Connection};

const INSERT_SQL: &str = "INSERT INTO action_log (
        action_id, action_type, action_ts, actor,
        entity_kind, entity_id, payload_json, detail
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// 订单操作审计日志
///
/// 与工作流写操作共用同一事务, 回滚时日志一并撤销
pub struct ActionLogRepository<'a> {
    pub(super) conn: &'a Connection,
}

impl<'a> ActionLogRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 写入一条日志, 返回其 action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let mut stmt = self.conn.prepare_cached(INSERT_SQL)?;
        stmt.execute(params![
            log.action_id,
            log.action_type,
            fmt_datetime(log.action_ts),
            log.actor,
            log.entity_kind,
            log.entity_id,
            log.payload_json.as_ref().map(|v| v.to_string()),
            log.detail,
        ])?;
        Ok(log.action_id.clone())
    }

    pub fn batch_insert(&self, logs: &[ActionLog]) -> RepositoryResult<usize> {
        logs.iter().try_for_each(|log| self.insert(log).map(|_| ()))?;
        Ok(logs.len())
    }
}
