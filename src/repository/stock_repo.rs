// ==========================================
// MRP 订单系统 - 库存仓储
// ==========================================
// 职责: 库位树、库存项、分配占用汇总、库存履历
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::stock::{StockItem, StockItemTracking, StockLocation};
use crate::domain::types::{BuildStatus, StockHistoryCode, StockStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::{fmt_datetime, fmt_opt_date, get_bool, get_code, get_datetime, get_opt_date};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const ITEM_COLUMNS: &str = "id, part_id, supplier_part_id, location_id, quantity, serial, \
     serial_int, batch, status, is_building, build_id, consumed_by_id, belongs_to_id, \
     customer_id, sales_order_id, purchase_order_id, purchase_price, expiry_date, parent_id, \
     notes, updated_at";

pub struct StockRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StockRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_item(row: &Row) -> rusqlite::Result<StockItem> {
        Ok(StockItem {
            id: row.get(0)?,
            part_id: row.get(1)?,
            supplier_part_id: row.get(2)?,
            location_id: row.get(3)?,
            quantity: row.get(4)?,
            serial: row.get(5)?,
            serial_int: row.get(6)?,
            batch: row.get(7)?,
            status: get_code(row, 8, StockStatus::from_code)?,
            is_building: get_bool(row, 9)?,
            build_id: row.get(10)?,
            consumed_by_id: row.get(11)?,
            belongs_to_id: row.get(12)?,
            customer_id: row.get(13)?,
            sales_order_id: row.get(14)?,
            purchase_order_id: row.get(15)?,
            purchase_price: row.get(16)?,
            expiry_date: get_opt_date(row, 17)?,
            parent_id: row.get(18)?,
            notes: row.get(19)?,
            updated_at: get_datetime(row, 20)?,
        })
    }

    fn query_items(&self, sql: &str, values: Vec<rusqlite::types::Value>) -> RepositoryResult<Vec<StockItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 库位
    // ==========================================

    pub fn insert_location(&self, location: &StockLocation) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO stock_location (name, description, parent_id) VALUES (?1, ?2, ?3)",
            params![location.name, location.description, location.parent_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_location(&self, id: i64) -> RepositoryResult<Option<StockLocation>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, description, parent_id FROM stock_location WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StockLocation {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        parent_id: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_location(&self, id: i64) -> RepositoryResult<StockLocation> {
        self.find_location(id)?
            .ok_or_else(|| RepositoryError::not_found("StockLocation", id))
    }

    /// 库位子树（含自身）
    pub fn location_subtree_ids(&self, root_id: i64) -> RepositoryResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            WITH RECURSIVE tree(id) AS (
                SELECT id FROM stock_location WHERE id = ?1
                UNION
                SELECT l.id FROM stock_location l JOIN tree t ON l.parent_id = t.id
            )
            SELECT id FROM tree ORDER BY id
            "#,
        )?;
        let ids = stmt
            .query_map(params![root_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // ==========================================
    // 库存项
    // ==========================================

    pub fn insert_item(&self, item: &StockItem) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO stock_item (
                part_id, supplier_part_id, location_id, quantity, serial, serial_int, batch,
                status, is_building, build_id, consumed_by_id, belongs_to_id, customer_id,
                sales_order_id, purchase_order_id, purchase_price, expiry_date, parent_id,
                notes, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            "#,
            params![
                item.part_id,
                item.supplier_part_id,
                item.location_id,
                item.quantity,
                item.serial,
                item.serial_int,
                item.batch,
                item.status.code(),
                item.is_building,
                item.build_id,
                item.consumed_by_id,
                item.belongs_to_id,
                item.customer_id,
                item.sales_order_id,
                item.purchase_order_id,
                item.purchase_price,
                fmt_opt_date(item.expiry_date),
                item.parent_id,
                item.notes,
                fmt_datetime(item.updated_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 全量更新（updated_at 取当前时间）
    pub fn update_item(&self, item: &StockItem) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE stock_item SET
                location_id = ?2, quantity = ?3, serial = ?4, serial_int = ?5, batch = ?6,
                status = ?7, is_building = ?8, build_id = ?9, consumed_by_id = ?10,
                belongs_to_id = ?11, customer_id = ?12, sales_order_id = ?13,
                purchase_order_id = ?14, purchase_price = ?15, expiry_date = ?16,
                parent_id = ?17, notes = ?18, updated_at = ?19
            WHERE id = ?1
            "#,
            params![
                item.id,
                item.location_id,
                item.quantity,
                item.serial,
                item.serial_int,
                item.batch,
                item.status.code(),
                item.is_building,
                item.build_id,
                item.consumed_by_id,
                item.belongs_to_id,
                item.customer_id,
                item.sales_order_id,
                item.purchase_order_id,
                item.purchase_price,
                fmt_opt_date(item.expiry_date),
                item.parent_id,
                item.notes,
                fmt_datetime(chrono::Local::now().naive_local()),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("StockItem", item.id));
        }
        Ok(())
    }

    pub fn delete_item(&self, id: i64) -> RepositoryResult<()> {
        self.conn
            .execute("DELETE FROM stock_item WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn find_item(&self, id: i64) -> RepositoryResult<Option<StockItem>> {
        let sql = format!("SELECT {} FROM stock_item WHERE id = ?1", ITEM_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_item)
            .optional()?)
    }

    pub fn get_item(&self, id: i64) -> RepositoryResult<StockItem> {
        self.find_item(id)?
            .ok_or_else(|| RepositoryError::not_found("StockItem", id))
    }

    pub fn list_items_for_part(&self, part_id: i64) -> RepositoryResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_item WHERE part_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        );
        self.query_items(&sql, vec![part_id.into()])
    }

    /// 候选在库库存（按数量、ID 升序）
    ///
    /// SQL 只做粗过滤，状态是否可用由调用方以 `in_stock()` 判定
    pub fn list_candidate_items(&self, part_ids: &[i64]) -> RepositoryResult<Vec<StockItem>> {
        if part_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; part_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM stock_item
             WHERE part_id IN ({})
               AND quantity > 0 AND is_building = 0
               AND belongs_to_id IS NULL AND consumed_by_id IS NULL
               AND customer_id IS NULL AND sales_order_id IS NULL
             ORDER BY quantity ASC, id ASC",
            ITEM_COLUMNS, placeholders
        );
        let values = part_ids.iter().map(|id| (*id).into()).collect();
        self.query_items(&sql, values)
    }

    pub fn find_by_serial(&self, part_id: i64, serial: &str) -> RepositoryResult<Option<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_item WHERE part_id = ?1 AND serial = ?2",
            ITEM_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![part_id, serial], Self::map_item)
            .optional()?)
    }

    /// 零件最大序列号（整数部分）
    pub fn max_serial_int(&self, part_id: i64) -> RepositoryResult<Option<i64>> {
        let v: Option<i64> = self.conn.query_row(
            "SELECT MAX(serial_int) FROM stock_item WHERE part_id = ?1",
            params![part_id],
            |row| row.get(0),
        )?;
        Ok(v)
    }

    /// 生产中的产出
    pub fn list_incomplete_outputs(&self, build_id: i64) -> RepositoryResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_item WHERE build_id = ?1 AND is_building = 1 ORDER BY id",
            ITEM_COLUMNS
        );
        self.query_items(&sql, vec![build_id.into()])
    }

    /// 已完工的产出
    pub fn list_completed_outputs(&self, build_id: i64) -> RepositoryResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_item WHERE build_id = ?1 AND is_building = 0 ORDER BY id",
            ITEM_COLUMNS
        );
        self.query_items(&sql, vec![build_id.into()])
    }

    /// 已安装进指定库存项的子项
    pub fn list_installed_in(&self, parent_item_id: i64) -> RepositoryResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_item WHERE belongs_to_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        );
        self.query_items(&sql, vec![parent_item_id.into()])
    }

    // ==========================================
    // 分配占用汇总
    // ==========================================

    /// 未发货的销售分配合计
    pub fn sales_allocated_total(&self, item_id: i64) -> RepositoryResult<f64> {
        let v: f64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(a.quantity), 0)
            FROM sales_order_allocation a
            JOIN sales_order_shipment s ON s.id = a.shipment_id
            WHERE a.item_id = ?1 AND s.shipment_date IS NULL
            "#,
            params![item_id],
            |row| row.get(0),
        )?;
        Ok(v)
    }

    /// 进行中生产订单的分配合计
    pub fn build_allocated_total(&self, item_id: i64) -> RepositoryResult<f64> {
        let v: f64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(bi.quantity), 0)
            FROM build_item bi
            JOIN build b ON b.id = bi.build_id
            WHERE bi.stock_item_id = ?1 AND b.status IN (?2, ?3)
            "#,
            params![
                item_id,
                BuildStatus::Pending.code(),
                BuildStatus::Production.code()
            ],
            |row| row.get(0),
        )?;
        Ok(v)
    }

    // ==========================================
    // 库存履历
    // ==========================================

    pub fn insert_tracking(&self, entry: &StockItemTracking) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO stock_item_tracking (item_id, code, date, user, notes, deltas_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.item_id,
                entry.code.code(),
                fmt_datetime(entry.date),
                entry.user,
                entry.notes,
                entry.deltas.as_ref().map(|v| v.to_string()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_tracking(&self, item_id: i64) -> RepositoryResult<Vec<StockItemTracking>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, code, date, user, notes, deltas_json
             FROM stock_item_tracking WHERE item_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![item_id], |row| {
                let deltas: Option<String> = row.get(6)?;
                Ok(StockItemTracking {
                    id: row.get(0)?,
                    item_id: row.get(1)?,
                    code: get_code(row, 2, StockHistoryCode::from_code)?,
                    date: get_datetime(row, 3)?,
                    user: row.get(4)?,
                    notes: row.get(5)?,
                    deltas: deltas.and_then(|s| serde_json::from_str(&s).ok()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
