// ==========================================
// MRP 订单系统 - 零件 / BOM 仓储
// ==========================================

use crate::domain::part::{BomItem, Part};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row::get_bool;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PART_COLUMNS: &str = "id, name, description, ipn, trackable, salable, purchaseable, \
     assembly, component, is_virtual, active, default_location_id";
const BOM_COLUMNS: &str = "id, part_id, sub_part_id, quantity, reference, optional, consumable";

pub struct PartRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PartRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_part(row: &Row) -> rusqlite::Result<Part> {
        Ok(Part {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            ipn: row.get(3)?,
            trackable: get_bool(row, 4)?,
            salable: get_bool(row, 5)?,
            purchaseable: get_bool(row, 6)?,
            assembly: get_bool(row, 7)?,
            component: get_bool(row, 8)?,
            is_virtual: get_bool(row, 9)?,
            active: get_bool(row, 10)?,
            default_location_id: row.get(11)?,
        })
    }

    fn map_bom(row: &Row) -> rusqlite::Result<BomItem> {
        Ok(BomItem {
            id: row.get(0)?,
            part_id: row.get(1)?,
            sub_part_id: row.get(2)?,
            quantity: row.get(3)?,
            reference: row.get(4)?,
            optional: get_bool(row, 5)?,
            consumable: get_bool(row, 6)?,
            substitute_part_ids: Vec::new(),
        })
    }

    // ==========================================
    // Part
    // ==========================================

    pub fn insert(&self, part: &Part) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO part (name, description, ipn, trackable, salable, purchaseable,
                               assembly, component, is_virtual, active, default_location_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                part.name,
                part.description,
                part.ipn,
                part.trackable,
                part.salable,
                part.purchaseable,
                part.assembly,
                part.component,
                part.is_virtual,
                part.active,
                part.default_location_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Part>> {
        let sql = format!("SELECT {} FROM part WHERE id = ?1", PART_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_part)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<Part> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Part", id))
    }

    /// 按名称或 IPN 精确查找（导入用）
    pub fn find_by_name_or_ipn(&self, text: &str) -> RepositoryResult<Vec<Part>> {
        let sql = format!(
            "SELECT {} FROM part WHERE name = ?1 OR ipn = ?1 ORDER BY id",
            PART_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![text], Self::map_part)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Part>> {
        let sql = format!("SELECT {} FROM part ORDER BY id", PART_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::map_part)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // BOM
    // ==========================================

    pub fn insert_bom_item(&self, bom: &BomItem) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO bom_item (part_id, sub_part_id, quantity, reference, optional, consumable)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bom.part_id,
                bom.sub_part_id,
                bom.quantity,
                bom.reference,
                bom.optional,
                bom.consumable,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        for part_id in &bom.substitute_part_ids {
            self.insert_substitute(id, *part_id)?;
        }
        Ok(id)
    }

    pub fn insert_substitute(&self, bom_item_id: i64, part_id: i64) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO bom_item_substitute (bom_item_id, part_id) VALUES (?1, ?2)",
            params![bom_item_id, part_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn load_substitutes(&self, bom: &mut BomItem) -> RepositoryResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT part_id FROM bom_item_substitute WHERE bom_item_id = ?1 ORDER BY id",
        )?;
        bom.substitute_part_ids = stmt
            .query_map(params![bom.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(())
    }

    pub fn find_bom_item(&self, id: i64) -> RepositoryResult<Option<BomItem>> {
        let sql = format!("SELECT {} FROM bom_item WHERE id = ?1", BOM_COLUMNS);
        let found = self
            .conn
            .query_row(&sql, params![id], Self::map_bom)
            .optional()?;
        match found {
            Some(mut bom) => {
                self.load_substitutes(&mut bom)?;
                Ok(Some(bom))
            }
            None => Ok(None),
        }
    }

    pub fn get_bom_item(&self, id: i64) -> RepositoryResult<BomItem> {
        self.find_bom_item(id)?
            .ok_or_else(|| RepositoryError::not_found("BomItem", id))
    }

    /// 装配件的 BOM（含替代件）
    pub fn list_bom_items(&self, part_id: i64) -> RepositoryResult<Vec<BomItem>> {
        let sql = format!(
            "SELECT {} FROM bom_item WHERE part_id = ?1 ORDER BY id",
            BOM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut items = stmt
            .query_map(params![part_id], Self::map_bom)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for bom in items.iter_mut() {
            self.load_substitutes(bom)?;
        }
        Ok(items)
    }

    /// BOM 中是否含有追踪件
    pub fn has_trackable_components(&self, part_id: i64) -> RepositoryResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bom_item b JOIN part p ON p.id = b.sub_part_id
             WHERE b.part_id = ?1 AND p.trackable = 1",
            params![part_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
