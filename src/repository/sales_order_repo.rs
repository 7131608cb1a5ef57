// ==========================================
// MRP 订单系统 - 销售订单仓储
// ==========================================
// 职责: 销售订单、订单行、附加行、发货单、库存分配
// ==========================================

use crate::domain::purchase_order::OrderExtraLine;
use crate::domain::sales_order::{
    SalesOrder, SalesOrderAllocation, SalesOrderLineItem, SalesOrderShipment,
};
use crate::domain::types::SalesOrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::{fmt_date, fmt_opt_date, get_code, get_date, get_opt_date};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ORDER_COLUMNS: &str = "id, reference, reference_int, description, customer_id, \
     customer_reference, currency, status, creation_date, issue_date, target_date, \
     shipment_date, created_by, shipped_by, responsible, notes";
const LINE_COLUMNS: &str =
    "id, order_id, part_id, quantity, shipped, sale_price, reference, notes, target_date";
const SHIPMENT_COLUMNS: &str = "id, order_id, reference, shipment_date, checked_by, \
     tracking_number, invoice_number, link, notes";

pub struct SalesOrderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SalesOrderRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_order(row: &Row) -> rusqlite::Result<SalesOrder> {
        Ok(SalesOrder {
            id: row.get(0)?,
            reference: row.get(1)?,
            reference_int: row.get(2)?,
            description: row.get(3)?,
            customer_id: row.get(4)?,
            customer_reference: row.get(5)?,
            currency: row.get(6)?,
            status: get_code(row, 7, SalesOrderStatus::from_code)?,
            creation_date: get_date(row, 8)?,
            issue_date: get_opt_date(row, 9)?,
            target_date: get_opt_date(row, 10)?,
            shipment_date: get_opt_date(row, 11)?,
            created_by: row.get(12)?,
            shipped_by: row.get(13)?,
            responsible: row.get(14)?,
            notes: row.get(15)?,
        })
    }

    fn map_line(row: &Row) -> rusqlite::Result<SalesOrderLineItem> {
        Ok(SalesOrderLineItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            part_id: row.get(2)?,
            quantity: row.get(3)?,
            shipped: row.get(4)?,
            sale_price: row.get(5)?,
            reference: row.get(6)?,
            notes: row.get(7)?,
            target_date: get_opt_date(row, 8)?,
        })
    }

    fn map_shipment(row: &Row) -> rusqlite::Result<SalesOrderShipment> {
        Ok(SalesOrderShipment {
            id: row.get(0)?,
            order_id: row.get(1)?,
            reference: row.get(2)?,
            shipment_date: get_opt_date(row, 3)?,
            checked_by: row.get(4)?,
            tracking_number: row.get(5)?,
            invoice_number: row.get(6)?,
            link: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn map_allocation(row: &Row) -> rusqlite::Result<SalesOrderAllocation> {
        Ok(SalesOrderAllocation {
            id: row.get(0)?,
            line_id: row.get(1)?,
            shipment_id: row.get(2)?,
            item_id: row.get(3)?,
            quantity: row.get(4)?,
        })
    }

    // ==========================================
    // 订单
    // ==========================================

    pub fn insert(&self, order: &SalesOrder) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO sales_order (
                reference, reference_int, description, customer_id, customer_reference,
                currency, status, creation_date, issue_date, target_date, shipment_date,
                created_by, shipped_by, responsible, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                order.reference,
                order.reference_int,
                order.description,
                order.customer_id,
                order.customer_reference,
                order.currency,
                order.status.code(),
                fmt_date(order.creation_date),
                fmt_opt_date(order.issue_date),
                fmt_opt_date(order.target_date),
                fmt_opt_date(order.shipment_date),
                order.created_by,
                order.shipped_by,
                order.responsible,
                order.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, order: &SalesOrder) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE sales_order SET
                description = ?2, customer_reference = ?3, status = ?4, issue_date = ?5,
                target_date = ?6, shipment_date = ?7, shipped_by = ?8, responsible = ?9,
                notes = ?10
            WHERE id = ?1
            "#,
            params![
                order.id,
                order.description,
                order.customer_reference,
                order.status.code(),
                fmt_opt_date(order.issue_date),
                fmt_opt_date(order.target_date),
                fmt_opt_date(order.shipment_date),
                order.shipped_by,
                order.responsible,
                order.notes,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("SalesOrder", order.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<SalesOrder>> {
        let sql = format!("SELECT {} FROM sales_order WHERE id = ?1", ORDER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_order)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<SalesOrder> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("SalesOrder", id))
    }

    pub fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<SalesOrder>> {
        let sql = format!("SELECT {} FROM sales_order WHERE reference = ?1", ORDER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![reference], Self::map_order)
            .optional()?)
    }

    pub fn max_reference_int(&self) -> RepositoryResult<i64> {
        let v: Option<i64> =
            self.conn
                .query_row("SELECT MAX(reference_int) FROM sales_order", [], |row| row.get(0))?;
        Ok(v.unwrap_or(0))
    }

    pub fn list(&self, statuses: Option<&[SalesOrderStatus]>) -> RepositoryResult<Vec<SalesOrder>> {
        let sql = format!(
            "SELECT {} FROM sales_order ORDER BY reference_int, id",
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

    pub fn insert_line(&self, line: &SalesOrderLineItem) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO sales_order_line (
                order_id, part_id, quantity, shipped, sale_price, reference, notes, target_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                line.order_id,
                line.part_id,
                line.quantity,
                line.shipped,
                line.sale_price,
                line.reference,
                line.notes,
                fmt_opt_date(line.target_date),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_line(&self, line: &SalesOrderLineItem) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE sales_order_line SET
                quantity = ?2, shipped = ?3, sale_price = ?4, reference = ?5, notes = ?6,
                target_date = ?7
            WHERE id = ?1
            "#,
            params![
                line.id,
                line.quantity,
                line.shipped,
                line.sale_price,
                line.reference,
                line.notes,
                fmt_opt_date(line.target_date),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("SalesOrderLineItem", line.id));
        }
        Ok(())
    }

    pub fn find_line(&self, id: i64) -> RepositoryResult<Option<SalesOrderLineItem>> {
        let sql = format!("SELECT {} FROM sales_order_line WHERE id = ?1", LINE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_line)
            .optional()?)
    }

    pub fn get_line(&self, id: i64) -> RepositoryResult<SalesOrderLineItem> {
        self.find_line(id)?
            .ok_or_else(|| RepositoryError::not_found("SalesOrderLineItem", id))
    }

    pub fn list_lines(&self, order_id: i64) -> RepositoryResult<Vec<SalesOrderLineItem>> {
        let sql = format!(
            "SELECT {} FROM sales_order_line WHERE order_id = ?1 ORDER BY id",
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
            "INSERT INTO sales_order_extra_line (order_id, reference, quantity, price, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![line.order_id, line.reference, line.quantity, line.price, line.notes],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_extra_lines(&self, order_id: i64) -> RepositoryResult<Vec<OrderExtraLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, order_id, reference, quantity, price, notes
             FROM sales_order_extra_line WHERE order_id = ?1 ORDER BY id",
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

    // ==========================================
    // 发货单
    // ==========================================

    pub fn insert_shipment(&self, shipment: &SalesOrderShipment) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO sales_order_shipment (
                order_id, reference, shipment_date, checked_by, tracking_number,
                invoice_number, link, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                shipment.order_id,
                shipment.reference,
                fmt_opt_date(shipment.shipment_date),
                shipment.checked_by,
                shipment.tracking_number,
                shipment.invoice_number,
                shipment.link,
                shipment.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_shipment(&self, shipment: &SalesOrderShipment) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE sales_order_shipment SET
                shipment_date = ?2, checked_by = ?3, tracking_number = ?4,
                invoice_number = ?5, link = ?6, notes = ?7
            WHERE id = ?1
            "#,
            params![
                shipment.id,
                fmt_opt_date(shipment.shipment_date),
                shipment.checked_by,
                shipment.tracking_number,
                shipment.invoice_number,
                shipment.link,
                shipment.notes,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("SalesOrderShipment", shipment.id));
        }
        Ok(())
    }

    pub fn find_shipment(&self, id: i64) -> RepositoryResult<Option<SalesOrderShipment>> {
        let sql = format!(
            "SELECT {} FROM sales_order_shipment WHERE id = ?1",
            SHIPMENT_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_shipment)
            .optional()?)
    }

    pub fn get_shipment(&self, id: i64) -> RepositoryResult<SalesOrderShipment> {
        self.find_shipment(id)?
            .ok_or_else(|| RepositoryError::not_found("SalesOrderShipment", id))
    }

    pub fn find_shipment_by_reference(
        &self,
        order_id: i64,
        reference: &str,
    ) -> RepositoryResult<Option<SalesOrderShipment>> {
        let sql = format!(
            "SELECT {} FROM sales_order_shipment WHERE order_id = ?1 AND reference = ?2",
            SHIPMENT_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![order_id, reference], Self::map_shipment)
            .optional()?)
    }

    pub fn list_shipments(&self, order_id: i64) -> RepositoryResult<Vec<SalesOrderShipment>> {
        let sql = format!(
            "SELECT {} FROM sales_order_shipment WHERE order_id = ?1 ORDER BY id",
            SHIPMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![order_id], Self::map_shipment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 库存分配
    // ==========================================

    pub fn insert_allocation(&self, allocation: &SalesOrderAllocation) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO sales_order_allocation (line_id, shipment_id, item_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                allocation.line_id,
                allocation.shipment_id,
                allocation.item_id,
                allocation.quantity
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_allocation(&self, allocation: &SalesOrderAllocation) -> RepositoryResult<()> {
        let rows = self.conn.execute(
            "UPDATE sales_order_allocation SET item_id = ?2, quantity = ?3 WHERE id = ?1",
            params![allocation.id, allocation.item_id, allocation.quantity],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("SalesOrderAllocation", allocation.id));
        }
        Ok(())
    }

    pub fn delete_allocation(&self, id: i64) -> RepositoryResult<()> {
        self.conn
            .execute("DELETE FROM sales_order_allocation WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn find_allocation(&self, id: i64) -> RepositoryResult<Option<SalesOrderAllocation>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, line_id, shipment_id, item_id, quantity
                 FROM sales_order_allocation WHERE id = ?1",
                params![id],
                Self::map_allocation,
            )
            .optional()?)
    }

    fn query_allocations(
        &self,
        filter: &str,
        key: i64,
    ) -> RepositoryResult<Vec<SalesOrderAllocation>> {
        let sql = format!(
            "SELECT a.id, a.line_id, a.shipment_id, a.item_id, a.quantity
             FROM sales_order_allocation a
             JOIN sales_order_line l ON l.id = a.line_id
             WHERE {} = ?1
             ORDER BY a.id",
            filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![key], Self::map_allocation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_allocations_for_shipment(
        &self,
        shipment_id: i64,
    ) -> RepositoryResult<Vec<SalesOrderAllocation>> {
        self.query_allocations("a.shipment_id", shipment_id)
    }

    pub fn list_allocations_for_line(
        &self,
        line_id: i64,
    ) -> RepositoryResult<Vec<SalesOrderAllocation>> {
        self.query_allocations("a.line_id", line_id)
    }

    pub fn list_allocations_for_order(
        &self,
        order_id: i64,
    ) -> RepositoryResult<Vec<SalesOrderAllocation>> {
        self.query_allocations("l.order_id", order_id)
    }

    /// 删除订单下所有未发货的分配
    pub fn delete_pending_allocations_for_order(&self, order_id: i64) -> RepositoryResult<usize> {
        let n = self.conn.execute(
            r#"
            DELETE FROM sales_order_allocation
            WHERE line_id IN (SELECT id FROM sales_order_line WHERE order_id = ?1)
              AND shipment_id IN (
                  SELECT id FROM sales_order_shipment WHERE shipment_date IS NULL
              )
            "#,
            params![order_id],
        )?;
        Ok(n)
    }

    /// 订单行已分配合计（含已发货分配）
    pub fn line_allocated_total(&self, line_id: i64) -> RepositoryResult<f64> {
        let v: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM sales_order_allocation WHERE line_id = ?1",
            params![line_id],
            |row| row.get(0),
        )?;
        Ok(v)
    }

    /// 订单行未发货分配合计
    pub fn line_pending_allocated_total(&self, line_id: i64) -> RepositoryResult<f64> {
        let v: f64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(a.quantity), 0)
            FROM sales_order_allocation a
            JOIN sales_order_shipment s ON s.id = a.shipment_id
            WHERE a.line_id = ?1 AND s.shipment_date IS NULL
            "#,
            params![line_id],
            |row| row.get(0),
        )?;
        Ok(v)
    }
}
