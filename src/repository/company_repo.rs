// ==========================================
// MRP 订单系统 - 企业 / 供应商零件仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::company::{Company, SupplierPart};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::get_bool;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COMPANY_COLUMNS: &str = "id, name, description, is_supplier, is_customer, currency";
const SUPPLIER_PART_COLUMNS: &str = "id, part_id, supplier_id, sku, pack_size";

pub struct CompanyRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CompanyRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_company(row: &Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            is_supplier: get_bool(row, 3)?,
            is_customer: get_bool(row, 4)?,
            currency: row.get(5)?,
        })
    }

    fn map_supplier_part(row: &Row) -> rusqlite::Result<SupplierPart> {
        Ok(SupplierPart {
            id: row.get(0)?,
            part_id: row.get(1)?,
            supplier_id: row.get(2)?,
            sku: row.get(3)?,
            pack_size: row.get(4)?,
        })
    }

    // ==========================================
    // Company
    // ==========================================

    pub fn insert(&self, company: &Company) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO company (name, description, is_supplier, is_customer, currency)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                company.name,
                company.description,
                company.is_supplier,
                company.is_customer,
                company.currency,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Company>> {
        let sql = format!("SELECT {} FROM company WHERE id = ?1", COMPANY_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_company)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<Company> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Company", id))
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Company>> {
        let sql = format!("SELECT {} FROM company ORDER BY name", COMPANY_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::map_company)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // SupplierPart
    // ==========================================

    pub fn insert_supplier_part(&self, sp: &SupplierPart) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO supplier_part (part_id, supplier_id, sku, pack_size)
             VALUES (?1, ?2, ?3, ?4)",
            params![sp.part_id, sp.supplier_id, sp.sku, sp.pack_size],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_supplier_part(&self, id: i64) -> RepositoryResult<Option<SupplierPart>> {
        let sql = format!(
            "SELECT {} FROM supplier_part WHERE id = ?1",
            SUPPLIER_PART_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_supplier_part)
            .optional()?)
    }

    pub fn get_supplier_part(&self, id: i64) -> RepositoryResult<SupplierPart> {
        self.find_supplier_part(id)?
            .ok_or_else(|| RepositoryError::not_found("SupplierPart", id))
    }

    pub fn list_supplier_parts(&self, part_id: i64) -> RepositoryResult<Vec<SupplierPart>> {
        let sql = format!(
            "SELECT {} FROM supplier_part WHERE part_id = ?1 ORDER BY id",
            SUPPLIER_PART_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![part_id], Self::map_supplier_part)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
