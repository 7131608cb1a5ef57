// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::NaiveDate;
use mrp_orders::domain::types::StockStatus;
use mrp_orders::domain::{BomItem, Part, StockItem};

// ==========================================
// Part 构建器
// ==========================================

pub struct PartBuilder {
    part: Part,
}

impl PartBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            part: Part::new(name),
        }
    }

    pub fn ipn(mut self, ipn: &str) -> Self {
        self.part.ipn = Some(ipn.to_string());
        self
    }

    pub fn assembly(mut self) -> Self {
        self.part.assembly = true;
        self
    }

    pub fn trackable(mut self) -> Self {
        self.part.trackable = true;
        self
    }

    pub fn salable(mut self) -> Self {
        self.part.salable = true;
        self
    }

    pub fn not_purchaseable(mut self) -> Self {
        self.part.purchaseable = false;
        self
    }

    pub fn virtual_part(mut self) -> Self {
        self.part.is_virtual = true;
        self
    }

    pub fn default_location(mut self, location_id: i64) -> Self {
        self.part.default_location_id = Some(location_id);
        self
    }

    pub fn build(self) -> Part {
        self.part
    }
}

// ==========================================
// BomItem 构建器
// ==========================================

pub struct BomBuilder {
    bom: BomItem,
}

impl BomBuilder {
    pub fn new(assembly_id: i64, sub_part_id: i64, quantity: f64) -> Self {
        Self {
            bom: BomItem {
                id: 0,
                part_id: assembly_id,
                sub_part_id,
                quantity,
                reference: String::new(),
                optional: false,
                consumable: false,
                substitute_part_ids: Vec::new(),
            },
        }
    }

    pub fn optional(mut self) -> Self {
        self.bom.optional = true;
        self
    }

    pub fn consumable(mut self) -> Self {
        self.bom.consumable = true;
        self
    }

    pub fn substitute(mut self, part_id: i64) -> Self {
        self.bom.substitute_part_ids.push(part_id);
        self
    }

    pub fn reference(mut self, reference: &str) -> Self {
        self.bom.reference = reference.to_string();
        self
    }

    pub fn build(self) -> BomItem {
        self.bom
    }
}

// ==========================================
// StockItem 构建器
// ==========================================

pub struct StockItemBuilder {
    item: StockItem,
}

impl StockItemBuilder {
    pub fn new(part_id: i64, quantity: f64) -> Self {
        Self {
            item: StockItem::new(part_id, quantity),
        }
    }

    pub fn location(mut self, location_id: i64) -> Self {
        self.item.location_id = Some(location_id);
        self
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.item.serial = Some(serial.to_string());
        self
    }

    pub fn batch(mut self, batch: &str) -> Self {
        self.item.batch = batch.to_string();
        self
    }

    pub fn expiry(mut self, date: NaiveDate) -> Self {
        self.item.expiry_date = Some(date);
        self
    }

    pub fn status(mut self, status: StockStatus) -> Self {
        self.item.status = status;
        self
    }

    pub fn build(self) -> StockItem {
        self.item
    }
}
