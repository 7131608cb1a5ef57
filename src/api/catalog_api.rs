// ==========================================
// MRP 订单系统 - 企业 / 零件 / BOM API
// ==========================================
// 职责: 主数据维护（订单工作流的前置数据）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::db::Database;
use crate::domain::company::{Company, SupplierPart};
use crate::domain::part::{BomItem, Part};
use crate::engine::quantity::{is_positive, round_qty};
use crate::repository::{CompanyRepository, PartRepository};
use rusqlite::Connection;

/// BOM 行校验
///
/// - 父件必须是装配件
/// - 子件不能是父件本身
/// - 数量 > 0
/// - 子件 / 替代件必须存在
pub(crate) fn validate_bom_item(conn: &Connection, bom: &BomItem) -> ApiResult<()> {
    let repo = PartRepository::new(conn);
    let parent = repo.get(bom.part_id)?;
    if !parent.assembly {
        return Err(ApiError::field(
            "part",
            format!("Part '{}' is not an assembly", parent.full_name()),
        ));
    }
    if bom.sub_part_id == bom.part_id {
        return Err(ApiError::field("sub_part", "Part cannot be added to its own Bill of Materials"));
    }
    if !is_positive(bom.quantity) {
        return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
    }
    repo.get(bom.sub_part_id)?;
    for id in &bom.substitute_part_ids {
        if *id == bom.part_id || *id == bom.sub_part_id {
            return Err(ApiError::field("substitutes", "Invalid substitute part"));
        }
        repo.get(*id)?;
    }
    Ok(())
}

// ==========================================
// CatalogApi - 主数据 API
// ==========================================
pub struct CatalogApi {
    db: Database,
}

impl CatalogApi {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ==========================================
    // 企业
    // ==========================================

    pub fn create_company(&self, company: Company) -> ApiResult<Company> {
        if company.name.trim().is_empty() {
            return Err(ApiError::field("name", "Company name must not be empty"));
        }
        self.db.with_transaction(|tx| {
            let mut company = company;
            company.id = CompanyRepository::new(tx).insert(&company)?;
            tracing::info!(company_id = company.id, name = %company.name, "企业已创建");
            Ok(company)
        })
    }

    pub fn get_company(&self, company_id: i64) -> ApiResult<Company> {
        self.db
            .with_conn(|conn| Ok(CompanyRepository::new(conn).get(company_id)?))
    }

    /// 创建供应商零件（供应商必须是 supplier，pack_size > 0）
    pub fn create_supplier_part(
        &self,
        part_id: i64,
        supplier_id: i64,
        sku: &str,
        pack_size: f64,
    ) -> ApiResult<SupplierPart> {
        if !is_positive(pack_size) {
            return Err(ApiError::field("pack_size", "Pack size must be greater than zero"));
        }
        if sku.trim().is_empty() {
            return Err(ApiError::field("sku", "SKU must not be empty"));
        }

        self.db.with_transaction(|tx| {
            let companies = CompanyRepository::new(tx);
            let supplier = companies.get(supplier_id)?;
            if !supplier.is_supplier {
                return Err(ApiError::field(
                    "supplier",
                    format!("Company '{}' is not a supplier", supplier.name),
                ));
            }
            let part = PartRepository::new(tx).get(part_id)?;
            if !part.purchaseable {
                return Err(ApiError::field("part", "Part is not purchaseable"));
            }

            let mut sp = SupplierPart {
                id: 0,
                part_id,
                supplier_id,
                sku: sku.trim().to_string(),
                pack_size: round_qty(pack_size),
            };
            sp.id = companies.insert_supplier_part(&sp)?;
            Ok(sp)
        })
    }

    // ==========================================
    // 零件 / BOM
    // ==========================================

    pub fn create_part(&self, part: Part) -> ApiResult<Part> {
        if part.name.trim().is_empty() {
            return Err(ApiError::field("name", "Part name must not be empty"));
        }
        self.db.with_transaction(|tx| {
            let mut part = part;
            part.id = PartRepository::new(tx).insert(&part)?;
            tracing::info!(part_id = part.id, name = %part.name, "零件已创建");
            Ok(part)
        })
    }

    pub fn get_part(&self, part_id: i64) -> ApiResult<Part> {
        self.db.with_conn(|conn| Ok(PartRepository::new(conn).get(part_id)?))
    }

    pub fn add_bom_item(&self, bom: BomItem) -> ApiResult<BomItem> {
        self.db.with_transaction(|tx| {
            let mut bom = bom;
            bom.quantity = round_qty(bom.quantity);
            validate_bom_item(tx, &bom)?;
            bom.id = PartRepository::new(tx).insert_bom_item(&bom)?;
            tracing::debug!(bom_item_id = bom.id, part_id = bom.part_id, sub_part_id = bom.sub_part_id, "BOM 行已添加");
            Ok(bom)
        })
    }

    pub fn add_bom_substitute(&self, bom_item_id: i64, part_id: i64) -> ApiResult<BomItem> {
        self.db.with_transaction(|tx| {
            let repo = PartRepository::new(tx);
            let mut bom = repo.get_bom_item(bom_item_id)?;
            if bom.is_valid_part(part_id) {
                return Err(ApiError::field("part", "Duplicate substitute part"));
            }
            bom.substitute_part_ids.push(part_id);
            validate_bom_item(tx, &bom)?;
            repo.insert_substitute(bom_item_id, part_id)?;
            Ok(bom)
        })
    }

    pub fn get_bom(&self, part_id: i64) -> ApiResult<Vec<BomItem>> {
        self.db
            .with_conn(|conn| Ok(PartRepository::new(conn).list_bom_items(part_id)?))
    }
}
