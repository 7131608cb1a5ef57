// ==========================================
// MRP 订单系统 - 零件与 BOM
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Part - 零件主数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub ipn: Option<String>, // 内部零件号

    // ===== 属性标志 =====
    pub trackable: bool,    // 需要序列号跟踪
    pub salable: bool,      // 可销售
    pub purchaseable: bool, // 可采购
    pub assembly: bool,     // 可由其他零件装配
    pub component: bool,    // 可作为其他零件的组件
    pub is_virtual: bool,   // 虚拟零件（无实物库存）
    pub active: bool,

    pub default_location_id: Option<i64>,
}

impl Part {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            ipn: None,
            trackable: false,
            salable: false,
            purchaseable: true,
            assembly: false,
            component: true,
            is_virtual: false,
            active: true,
            default_location_id: None,
        }
    }

    pub fn full_name(&self) -> String {
        match &self.ipn {
            Some(ipn) if !ipn.is_empty() => format!("{} | {}", ipn, self.name),
            _ => self.name.clone(),
        }
    }
}

// ==========================================
// BomItem - BOM 行
// ==========================================
// quantity: 生产 1 个父件所需子件数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub id: i64,
    pub part_id: i64,     // 父件（装配件）
    pub sub_part_id: i64, // 子件
    pub quantity: f64,
    pub reference: String,
    pub optional: bool,
    pub consumable: bool, // 耗材行不跟踪分配

    /// 替代件（从 bom_item_substitute 加载）
    #[serde(default)]
    pub substitute_part_ids: Vec<i64>,
}

impl BomItem {
    /// 可用于该 BOM 行分配的零件：子件 + 替代件
    pub fn valid_part_ids(&self) -> Vec<i64> {
        let mut ids = vec![self.sub_part_id];
        for id in &self.substitute_part_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    pub fn is_valid_part(&self, part_id: i64) -> bool {
        self.sub_part_id == part_id || self.substitute_part_ids.contains(&part_id)
    }
}

/// BOM 替代件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItemSubstitute {
    pub id: i64,
    pub bom_item_id: i64,
    pub part_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_part_ids_includes_substitutes_once() {
        let bom = BomItem {
            id: 1,
            part_id: 10,
            sub_part_id: 20,
            quantity: 2.0,
            reference: String::new(),
            optional: false,
            consumable: false,
            substitute_part_ids: vec![21, 22, 21],
        };
        assert_eq!(bom.valid_part_ids(), vec![20, 21, 22]);
        assert!(bom.is_valid_part(22));
        assert!(!bom.is_valid_part(10));
    }

    #[test]
    fn test_full_name_with_ipn() {
        let mut part = Part::new("Widget");
        assert_eq!(part.full_name(), "Widget");
        part.ipn = Some("W-001".to_string());
        assert_eq!(part.full_name(), "W-001 | Widget");
    }
}
