// ==========================================
// MRP 订单系统 - 生产订单仓储
// ==========================================
// 职责: 生产订单（含父子树查询）与生产分配 BuildItem
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::build::{Build, BuildItem};
use crate::domain::types::BuildStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::{fmt_date, fmt_opt_date, get_code, get_date, get_opt_date};
use rusqlite::{params, Connection, OptionalExtension, Row};

const BUILD_COLUMNS: &str = "id, reference, reference_int, title, part_id, quantity, completed, \
     parent_id, sales_order_id, take_from_id, destination_id, batch, status, priority, \
     creation_date, target_date, completion_date, issued_by, completed_by, responsible, notes";
const ITEM_COLUMNS: &str = "id, build_id, bom_item_id, stock_item_id, quantity, install_into_id";

pub struct BuildRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BuildRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_build(row: &Row) -> rusqlite::Result<Build> {
        Ok(Build {
            id: row.get(0)?,
            reference: row.get(1)?,
            reference_int: row.get(2)?,
            title: row.get(3)?,
            part_id: row.get(4)?,
            quantity: row.get(5)?,
            completed: row.get(6)?,
            parent_id: row.get(7)?,
            sales_order_id: row.get(8)?,
            take_from_id: row.get(9)?,
            destination_id: row.get(10)?,
            batch: row.get(11)?,
            status: get_code(row, 12, BuildStatus::from_code)?,
            priority: row.get(13)?,
            creation_date: get_date(row, 14)?,
            target_date: get_opt_date(row, 15)?,
            completion_date: get_opt_date(row, 16)?,
            issued_by: row.get(17)?,
            completed_by: row.get(18)?,
            responsible: row.get(19)?,
            notes: row.get(20)?,
        })
    }

    fn map_item(row: &Row) -> rusqlite::Result<BuildItem> {
        Ok(BuildItem {
            id: row.get(0)?,
            build_id: row.get(1)?,
            bom_item_id: row.get(2)?,
            stock_item_id: row.get(3)?,
            quantity: row.get(4)?,
            install_into_id: row.get(5)?,
        })
    }

    fn query_builds(&self, sql: &str, key: Option<i64>) -> RepositoryResult<Vec<Build>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match key {
            Some(k) => stmt.query_map(params![k], Self::map_build)?,
            None => stmt.query_map([], Self::map_build)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 生产订单
    // ==========================================

    pub fn insert(&self, build: &Build) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO build (
                reference, reference_int, title, part_id, quantity, completed, parent_id,
                sales_order_id, take_from_id, destination_id, batch, status, priority,
                creation_date, target_date, completion_date, issued_by, completed_by,
                responsible, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20)
            "#,
            params![
                build.reference,
                build.reference_int,
                build.title,
                build.part_id,
                build.quantity,
                build.completed,
                build.parent_id,
                build.sales_order_id,
                build.take_from_id,
                build.destination_id,
                build.batch,
                build.status.code(),
                build.priority,
                fmt_date(build.creation_date),
                fmt_opt_date(build.target_date),
                fmt_opt_date(build.completion_date),
                build.issued_by,
                build.completed_by,
                build.responsible,
                build.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, build: &Build) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE build SET
                title = ?2, quantity = ?3, completed = ?4, parent_id = ?5, sales_order_id = ?6,
                take_from_id = ?7, destination_id = ?8, batch = ?9, status = ?10,
                priority = ?11, target_date = ?12, completion_date = ?13, issued_by = ?14,
                completed_by = ?15, responsible = ?16, notes = ?17
            WHERE id = ?1
            "#,
            params![
                build.id,
                build.title,
                build.quantity,
                build.completed,
                build.parent_id,
                build.sales_order_id,
                build.take_from_id,
                build.destination_id,
                build.batch,
                build.status.code(),
                build.priority,
                fmt_opt_date(build.target_date),
                fmt_opt_date(build.completion_date),
                build.issued_by,
                build.completed_by,
                build.responsible,
                build.notes,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Build", build.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Build>> {
        let sql = format!("SELECT {} FROM build WHERE id = ?1", BUILD_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_build)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<Build> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Build", id))
    }

    pub fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Build>> {
        let sql = format!("SELECT {} FROM build WHERE reference = ?1", BUILD_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![reference], Self::map_build)
            .optional()?)
    }

    pub fn max_reference_int(&self) -> RepositoryResult<i64> {
        let v: Option<i64> = self
            .conn
            .query_row("SELECT MAX(reference_int) FROM build", [], |row| row.get(0))?;
        Ok(v.unwrap_or(0))
    }

    pub fn list(&self, statuses: Option<&[BuildStatus]>) -> RepositoryResult<Vec<Build>> {
        let sql = format!("SELECT {} FROM build ORDER BY reference_int, id", BUILD_COLUMNS);
        let builds = self.query_builds(&sql, None)?;
        Ok(match statuses {
            Some(filter) => builds
                .into_iter()
                .filter(|b| filter.contains(&b.status))
                .collect(),
            None => builds,
        })
    }

    // ==========================================
    // 父子树
    // ==========================================

    /// 直接子订单
    pub fn list_children(&self, build_id: i64) -> RepositoryResult<Vec<Build>> {
        let sql = format!(
            "SELECT {} FROM build WHERE parent_id = ?1 ORDER BY id",
            BUILD_COLUMNS
        );
        self.query_builds(&sql, Some(build_id))
    }

    /// 全部后代（按 ID 排序）
    pub fn list_descendants(&self, build_id: i64) -> RepositoryResult<Vec<Build>> {
        let sql = format!(
            r#"
            WITH RECURSIVE tree(id) AS (
                SELECT id FROM build WHERE parent_id = ?1
                UNION
                SELECT b.id FROM build b JOIN tree t ON b.parent_id = t.id
            )
            SELECT {} FROM build WHERE id IN (SELECT id FROM tree) ORDER BY id
            "#,
            BUILD_COLUMNS
        );
        self.query_builds(&sql, Some(build_id))
    }

    /// 祖先 ID（由近及远）
    pub fn ancestor_ids(&self, build_id: i64) -> RepositoryResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            WITH RECURSIVE up(id, parent_id, depth) AS (
                SELECT id, parent_id, 0 FROM build WHERE id = ?1
                UNION
                SELECT b.id, b.parent_id, u.depth + 1 FROM build b JOIN up u ON b.id = u.parent_id
                WHERE u.depth < 1024
            )
            SELECT id FROM up WHERE depth > 0 ORDER BY depth
            "#,
        )?;
        let ids = stmt
            .query_map(params![build_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // ==========================================
    // 生产分配
    // ==========================================

    pub fn insert_item(&self, item: &BuildItem) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO build_item (build_id, bom_item_id, stock_item_id, quantity, install_into_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.build_id,
                item.bom_item_id,
                item.stock_item_id,
                item.quantity,
                item.install_into_id
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_item(&self, item: &BuildItem) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            "UPDATE build_item SET stock_item_id = ?2, quantity = ?3, install_into_id = ?4
             WHERE id = ?1",
            params![item.id, item.stock_item_id, item.quantity, item.install_into_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("BuildItem", item.id));
        }
        Ok(())
    }

    pub fn delete_item(&self, id: i64) -> RepositoryResult<()> {
        self.conn
            .execute("DELETE FROM build_item WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn find_item(&self, id: i64) -> RepositoryResult<Option<BuildItem>> {
        let sql = format!("SELECT {} FROM build_item WHERE id = ?1", ITEM_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_item)
            .optional()?)
    }

    pub fn list_items(&self, build_id: i64) -> RepositoryResult<Vec<BuildItem>> {
        let sql = format!(
            "SELECT {} FROM build_item WHERE build_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![build_id], Self::map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 指定产出的分配
    pub fn list_items_for_output(&self, output_id: i64) -> RepositoryResult<Vec<BuildItem>> {
        let sql = format!(
            "SELECT {} FROM build_item WHERE install_into_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![output_id], Self::map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// (build, stock item, output) 唯一键查询
    pub fn find_item_by_key(
        &self,
        build_id: i64,
        stock_item_id: i64,
        install_into_id: Option<i64>,
    ) -> RepositoryResult<Option<BuildItem>> {
        let sql = format!(
            "SELECT {} FROM build_item
             WHERE build_id = ?1 AND stock_item_id = ?2 AND install_into_id IS ?3",
            ITEM_COLUMNS
        );
        Ok(self
            .conn
            .query_row(
                &sql,
                params![build_id, stock_item_id, install_into_id],
                Self::map_item,
            )
            .optional()?)
    }
}
