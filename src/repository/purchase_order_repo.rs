// ==========================================
// MRP 订单系统 - 采购订单仓储
// ==========================================

use crate::domain::purchase_order::{OrderExtraLine, PurchaseOrder, PurchaseOrderLineItem};
use crate::domain::types::PurchaseOrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::{fmt_date, fmt_opt_date, get_code, get_date, get_opt_date};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ORDER_COLUMNS: &str = "id, reference, reference_int, description, supplier_id, \
     supplier_reference, currency, status, creation_date, issue_date, target_date, \
     complete_date, created_by, received_by, responsible, notes";
const LINE_COLUMNS: &str = "id, order_id, supplier_part_id, quantity, received, purchase_price, \
     reference, notes, target_date, destination_id";

pub struct PurchaseOrderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PurchaseOrderRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_order(row: &Row) -> rusqlite::Result<PurchaseOrder> {
        Ok(PurchaseOrder {
            id: row.get(0)?,
            reference: row.get(1)?,
            reference_int: row.get(2)?,
            description: row.get(3)?,
            supplier_id: row.get(4)?,
            supplier_reference: row.get(5)?,
            currency: row.get(6)?,
            status: get_code(row, 7, PurchaseOrderStatus::from_code)?,
            creation_date: get_date(row, 8)?,
            issue_date: get_opt_date(row, 9)?,
            target_date: get_opt_date(row, 10)?,
            complete_date: get_opt_date(row, 11)?,
            created_by: row.get(12)?,
            received_by: row.get(13)?,
            responsible: row.get(14)?,
            notes: row.get(15)?,
        })
    }

    fn map_line(row: &Row) -> rusqlite::Result<PurchaseOrderLineItem> {
        Ok(PurchaseOrderLineItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            supplier_part_id: row.get(2)?,
            quantity: row.get(3)?,
            received: row.get(4)?,
            purchase_price: row.get(5)?,
            reference: row.get(6)?,
            notes: row.get(7)?,
            target_date: get_opt_date(row, 8)?,
            destination_id: row.get(9)?,
        })
    }

    // ==========================================
    // 订单
    // ==========================================

    pub fn insert(&self, order: &PurchaseOrder) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO purchase_order (
                reference, reference_int, description, supplier_id, supplier_reference,
                currency, status, creation_date, issue_date, target_date, complete_date,
                created_by, received_by, responsible, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                order.reference,
                order.reference_int,
                order.description,
                order.supplier_id,
                order.supplier_reference,
                order.currency,
                order.status.code(),
                fmt_date(order.creation_date),
                fmt_opt_date(order.issue_date),
                fmt_opt_date(order.target_date),
                fmt_opt_date(order.complete_date),
                order.created_by,
                order.received_by,
                order.responsible,
                order.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, order: &PurchaseOrder) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE purchase_order SET
                description = ?2, supplier_reference = ?3, status = ?4, issue_date = ?5,
                target_date = ?6, complete_date = ?7, received_by = ?8, responsible = ?9,
                notes = ?10
            WHERE id = ?1
            "#,
            params![
                order.id,
                order.description,
                order.supplier_reference,
                order.status.code(),
                fmt_opt_date(order.issue_date),
                fmt_opt_date(order.target_date),
                fmt_opt_date(order.complete_date),
                order.received_by,
                order.responsible,
                order.notes,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("PurchaseOrder", order.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {} FROM purchase_order WHERE id = ?1", ORDER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_order)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<PurchaseOrder> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("PurchaseOrder", id))
    }

    pub fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<PurchaseOrder>> {
        let sql = format!(
            "SELECT {} FROM purchase_order WHERE reference = ?1",
            ORDER_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![reference], Self::map_order)
            .optional()?)
    }

    pub fn max_reference_int(&self) -> RepositoryResult<i64> {
        let v: Option<i64> =
            self.conn
                .query_row("SELECT MAX(reference_int) FROM purchase_order", [], |row| {
                    row.get(0)
                })?;
        Ok(v.unwrap_or(0))
    }

    /// 按状态过滤（None 表示全部）
    pub fn list(&self, statuses: Option<&[PurchaseOrderStatus]>) -> RepositoryResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "SELECT {} FROM purchase_order ORDER BY reference_int, id",
            ORDER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], Self::map_order)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(match statuses {
            Some(filter) => orders
                .into_iter()
                .filter(|o| filter.contains(&o.status))
                .collect(),
            None => orders,
        })
    }

    // ==========================================
    // 订单行
    // ==========================================

    pub fn insert_line(&self, line: &PurchaseOrderLineItem) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO purchase_order_line (
                order_id, supplier_part_id, quantity, received, purchase_price,
                reference, notes, target_date, destination_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                line.order_id,
                line.supplier_part_id,
                line.quantity,
                line.received,
                line.purchase_price,
                line.reference,
                line.notes,
                fmt_opt_date(line.target_date),
                line.destination_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_line(&self, line: &PurchaseOrderLineItem) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE purchase_order_line SET
                quantity = ?2, received = ?3, purchase_price = ?4, reference = ?5,
                notes = ?6, target_date = ?7, destination_id = ?8
            WHERE id = ?1
            "#,
            params![
                line.id,
                line.quantity,
                line.received,
                line.purchase_price,
                line.reference,
                line.notes,
                fmt_opt_date(line.target_date),
                line.destination_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("PurchaseOrderLineItem", line.id));
        }
        Ok(())
    }

    pub fn find_line(&self, id: i64) -> RepositoryResult<Option<PurchaseOrderLineItem>> {
        let sql = format!(
            "SELECT {} FROM purchase_order_line WHERE id = ?1",
            LINE_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_line)
            .optional()?)
    }

    pub fn get_line(&self, id: i64) -> RepositoryResult<PurchaseOrderLineItem> {
        self.find_line(id)?
            .ok_or_else(|| RepositoryError::not_found("PurchaseOrderLineItem", id))
    }

    pub fn list_lines(&self, order_id: i64) -> RepositoryResult<Vec<PurchaseOrderLineItem>> {
        let sql = format!(
            "SELECT {} FROM purchase_order_line WHERE order_id = ?1 ORDER BY id",
            LINE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![order_id], Self::map_line)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 附加行
    // ==========================================

    pub fn insert_extra_line(&self, line: &OrderExtraLine) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO purchase_order_extra_line (order_id, reference, quantity, price, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![line.order_id, line.reference, line.quantity, line.price, line.notes],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_extra_lines(&self, order_id: i64) -> RepositoryResult<Vec<OrderExtraLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, order_id, reference, quantity, price, notes
             FROM purchase_order_extra_line WHERE order_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![order_id], |row| {
                Ok(OrderExtraLine {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    reference: row.get(2)?,
                    quantity: row.get(3)?,
                    price: row.get(4)?,
                    notes: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
