// ==========================================
// MRP 订单系统 - 企业与供应商零件
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Company - 企业（供应商 / 客户）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub is_supplier: bool,
    pub is_customer: bool,
    pub currency: String, // 默认币种（仅记录，不做汇率换算）
}

impl Company {
    pub fn new(name: &str, is_supplier: bool, is_customer: bool) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            is_supplier,
            is_customer,
            currency: "USD".to_string(),
        }
    }
}

// ==========================================
// SupplierPart - 供应商零件
// ==========================================
// pack_size: 每"采购单位"折合的库存数量，必须 > 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPart {
    pub id: i64,
    pub part_id: i64,
    pub supplier_id: i64,
    pub sku: String,
    pub pack_size: f64,
}

impl SupplierPart {
    /// 采购数量换算为库存数量
    pub fn stock_quantity(&self, purchase_quantity: f64) -> f64 {
        purchase_quantity * self.pack_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_quantity_uses_pack_size() {
        let sp = SupplierPart {
            id: 1,
            part_id: 1,
            supplier_id: 1,
            sku: "R-10K".to_string(),
            pack_size: 2.5,
        };
        assert_eq!(sp.stock_quantity(4.0), 10.0);
    }
}
