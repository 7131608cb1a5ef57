// ==========================================
// StockApi 集成测试
// ==========================================
// 测试范围: 库位树、库存项创建、拆分 / 增减、可用库存查询
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::{PartBuilder, StockItemBuilder};
use mrp_orders::domain::types::{StockHistoryCode, StockStatus};

#[test]
fn test_location_tree() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let root = env.location("Warehouse");
    let aisle = env.sub_location("Aisle 1", root.id);
    let bin = env.sub_location("Bin 1", aisle.id);
    let other = env.location("Office");

    let ids = env.stock_api.location_tree_ids(root.id).unwrap();
    assert_eq!(ids, vec![root.id, aisle.id, bin.id]);
    assert!(!ids.contains(&other.id));

    assert_field_error(env.stock_api.create_location("  ", "", None), "name", "must not be empty");
}

#[test]
fn test_serialized_stock_rules() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let loc = env.location("Stores");
    let part = env.part(PartBuilder::new("Chassis").trackable());

    let item = env.serial_stock(part.id, "42", loc.id);
    assert_eq!(item.serial_int, Some(42));
    assert!(item.is_serialized());

    assert_field_error(
        env.stock_api.create_stock_item(
            StockItemBuilder::new(part.id, 1.0).serial("42").build(),
            USER,
        ),
        "serial",
        "Serial number already exists: 42",
    );
    assert_field_error(
        env.stock_api.create_stock_item(
            StockItemBuilder::new(part.id, 2.0).serial("43").build(),
            USER,
        ),
        "quantity",
        "Quantity must be 1 for item with a serial number",
    );
    assert_field_error(
        env.stock_api.split_stock(item.id, 1.0, USER),
        "quantity",
        "Serialized stock cannot be split",
    );
}

#[test]
fn test_split_take_and_add() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let loc = env.location("Stores");
    let part = env.part(PartBuilder::new("Bolt"));
    let item = env.stock_item(StockItemBuilder::new(part.id, 10.0).location(loc.id).batch("B1"));

    let child = env.stock_api.split_stock(item.id, 4.0, USER).unwrap();
    assert_eq!(child.quantity, 4.0);
    assert_eq!(child.parent_id, Some(item.id));
    assert_eq!(child.batch, "B1");
    assert_eq!(child.location_id, Some(loc.id));
    assert_eq!(env.item(item.id).quantity, 6.0);
    assert!(env
        .stock_api
        .get_tracking(child.id)
        .unwrap()
        .iter()
        .any(|t| t.code == StockHistoryCode::SplitFromParent));

    assert_field_error(
        env.stock_api.split_stock(item.id, 6.0, USER),
        "quantity",
        "Split quantity must be less than stock quantity",
    );

    let taken = env.stock_api.take_stock(item.id, 2.0, USER, "盘点").unwrap();
    assert_eq!(taken.quantity, 4.0);
    assert_field_error(
        env.stock_api.take_stock(item.id, 5.0, USER, ""),
        "quantity",
        "must not exceed",
    );

    let added = env.stock_api.add_stock(item.id, 1.5, USER, "").unwrap();
    assert_eq!(added.quantity, 5.5);

    let codes: Vec<_> = env
        .stock_api
        .get_tracking(item.id)
        .unwrap()
        .into_iter()
        .map(|t| t.code)
        .collect();
    assert!(codes.contains(&StockHistoryCode::StockRemove));
    assert!(codes.contains(&StockHistoryCode::StockAdd));
}

#[test]
fn test_available_stock_filters() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let warehouse = env.location("Warehouse");
    let shelf = env.sub_location("Shelf", warehouse.id);
    let quarantine = env.sub_location("Quarantine", warehouse.id);
    let part = env.part(PartBuilder::new("Bolt"));

    let good = env.stock(part.id, 5.0, shelf.id);
    env.stock(part.id, 5.0, quarantine.id);
    env.stock_item(
        StockItemBuilder::new(part.id, 5.0)
            .location(shelf.id)
            .status(StockStatus::Rejected),
    );

    let all = env
        .stock_api
        .available_stock_for_part(part.id, Some(warehouse.id), None)
        .unwrap();
    assert_eq!(all.len(), 2);

    let filtered = env
        .stock_api
        .available_stock_for_part(part.id, Some(warehouse.id), Some(quarantine.id))
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].item.id, good.id);
    assert_eq!(filtered[0].unallocated, 5.0);
}
