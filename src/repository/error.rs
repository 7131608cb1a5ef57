// ==========================================
// MRP 订单系统 - 仓储层错误类型
// ==========================================
// 仓储只报告存取失败; 业务规则由 engine/api 判定
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 按主键或引用号查找失败
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    /// 共享连接的互斥锁中毒
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    /// 引用号、序列号等唯一索引冲突
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    /// 例如删除仍被分配引用的库存项
    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::not_found("row", "?"),
            rusqlite::Error::SqliteFailure(code, msg) => {
                let text = msg.unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(text)
                    }
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        RepositoryError::ForeignKeyViolation(text)
                    }
                    _ => RepositoryError::DatabaseQueryError(text),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_codes_are_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE part (id INTEGER PRIMARY KEY, ipn TEXT UNIQUE);
             CREATE TABLE stock (id INTEGER PRIMARY KEY, part_id INTEGER NOT NULL REFERENCES part(id));
             INSERT INTO part (id, ipn) VALUES (1, 'R-100');",
        )
        .unwrap();

        let dup: RepositoryError = conn
            .execute("INSERT INTO part (id, ipn) VALUES (2, 'R-100')", [])
            .unwrap_err()
            .into();
        assert!(matches!(dup, RepositoryError::UniqueConstraintViolation(_)));

        let orphan: RepositoryError = conn
            .execute("INSERT INTO stock (part_id) VALUES (99)", [])
            .unwrap_err()
            .into();
        assert!(matches!(orphan, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_not_found_helper() {
        let err = RepositoryError::not_found("Build", 7);
        assert_eq!(err.to_string(), "记录未找到: Build with id=7");
    }
}
