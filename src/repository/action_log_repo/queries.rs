use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::row::{fmt_datetime, get_datetime};
use chrono::NaiveDateTime;
use rusqlite::{params, Result as SqliteResult, Row};

const COLUMNS: &str =
    "action_id, action_type, action_ts, actor, entity_kind, entity_id, payload_json, detail";

impl<'a> ActionLogRepository<'a> {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let sql = format!("SELECT {} FROM action_log WHERE action_id = ?1", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;

        match stmt.query_row(params![action_id], Self::map_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询指定对象的操作日志（按时间先后）
    pub fn find_by_entity(&self, entity_kind: &str, entity_id: i64) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "SELECT {} FROM action_log
             WHERE entity_kind = ?1 AND entity_id = ?2
             ORDER BY action_ts ASC, rowid ASC",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![entity_kind, entity_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询指定时间范围的操作日志
    pub fn find_by_time_range(
        &self,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "SELECT {} FROM action_log
             WHERE action_ts BETWEEN ?1 AND ?2
             ORDER BY action_ts DESC, rowid DESC",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(
                params![fmt_datetime(start_time), fmt_datetime(end_time)],
                Self::map_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 最近的操作日志
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 统计指定操作人的操作总数
    pub fn count_by_actor(&self, actor: &str) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE actor = ?1",
            params![actor],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 将数据库行映射为 ActionLog 实体
    fn map_row(row: &Row) -> SqliteResult<ActionLog> {
        let payload_json_str: Option<String> = row.get(6)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts: get_datetime(row, 2)?,
            actor: row.get(3)?,
            entity_kind: row.get(4)?,
            entity_id: row.get(5)?,
            payload_json: payload_json_str.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
