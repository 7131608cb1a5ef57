// ==========================================
// PurchaseOrderApi 集成测试
// ==========================================
// 测试范围:
// 1. 创建: 编号生成、供应商校验、行合并
// 2. 状态流转: 下单 / 完成 / 取消
// 3. 收货: 包装换算、库位回退、序列号、自动完成、事件
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::PartBuilder;
use mrp_orders::api::{ApiError, NewPurchaseLine, NewPurchaseOrder, ReceiveLine};
use mrp_orders::domain::types::{PurchaseOrderStatus, StockHistoryCode};
use mrp_orders::engine::event_names;

// ==========================================
// 创建
// ==========================================

#[test]
fn test_create_order_generates_sequential_references() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");

    let new = || NewPurchaseOrder {
        supplier_id: supplier.id,
        ..Default::default()
    };
    let first = env.purchase_order_api.create_order(new(), USER).unwrap();
    let second = env.purchase_order_api.create_order(new(), USER).unwrap();

    assert_eq!(first.reference, "PO-0001");
    assert_eq!(second.reference, "PO-0002");
    assert_eq!(first.status, PurchaseOrderStatus::Pending);
    assert_eq!(first.currency, supplier.currency);
    assert_eq!(first.created_by.as_deref(), Some(USER));
}

#[test]
fn test_create_order_rejects_duplicate_and_malformed_reference() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");

    let with_ref = |r: &str| NewPurchaseOrder {
        reference: Some(r.to_string()),
        supplier_id: supplier.id,
        ..Default::default()
    };
    env.purchase_order_api
        .create_order(with_ref("PO-0010"), USER)
        .unwrap();

    assert_field_error(
        env.purchase_order_api.create_order(with_ref("PO-0010"), USER),
        "reference",
        "Reference must be unique",
    );
    assert_field_error(
        env.purchase_order_api.create_order(with_ref("ORDER-7"), USER),
        "reference",
        "Reference must match required pattern",
    );

    // 下一个自动编号接在最大编号之后
    let next = env
        .purchase_order_api
        .create_order(
            NewPurchaseOrder {
                supplier_id: supplier.id,
                ..Default::default()
            },
            USER,
        )
        .unwrap();
    assert_eq!(next.reference, "PO-0011");
}

#[test]
fn test_create_order_requires_supplier() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let customer = env.customer("Retail");

    assert_field_error(
        env.purchase_order_api.create_order(
            NewPurchaseOrder {
                supplier_id: customer.id,
                ..Default::default()
            },
            USER,
        ),
        "supplier",
        "is not a supplier",
    );
}

#[test]
fn test_add_line_item_checks_supplier_and_groups() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let acme = env.supplier("Acme");
    let other = env.supplier("Other");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, acme.id, 1.0);
    let foreign_sp = env.supplier_part(part.id, other.id, 1.0);

    let order = env
        .purchase_order_api
        .create_order(
            NewPurchaseOrder {
                supplier_id: acme.id,
                ..Default::default()
            },
            USER,
        )
        .unwrap();

    assert_field_error(
        env.purchase_order_api.add_line_item(
            order.id,
            NewPurchaseLine {
                supplier_part_id: foreign_sp.id,
                quantity: 1.0,
                ..Default::default()
            },
            USER,
        ),
        "supplier",
        "Part supplier must match PO supplier",
    );

    let line = NewPurchaseLine {
        supplier_part_id: sp.id,
        quantity: 5.0,
        group: true,
        ..Default::default()
    };
    let first = env
        .purchase_order_api
        .add_line_item(order.id, line.clone(), USER)
        .unwrap();
    let merged = env
        .purchase_order_api
        .add_line_item(order.id, line, USER)
        .unwrap();

    assert_eq!(first.id, merged.id);
    assert_eq!(merged.quantity, 10.0);
    assert_eq!(env.purchase_order_api.list_lines(order.id).unwrap().len(), 1);
}

#[test]
fn test_total_price_includes_extra_lines() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, _) = env.placed_purchase_order(&sp, 4.0);
    env.purchase_order_api
        .add_extra_line(order.id, "Freight", 1.0, Some(7.5), "")
        .unwrap();

    // 4 × 10.0 + 1 × 7.5
    let total = env.purchase_order_api.total_price(order.id).unwrap();
    assert!((total - 47.5).abs() < 1e-9);
    assert_eq!(env.purchase_order_api.list_extra_lines(order.id).unwrap().len(), 1);
}

// ==========================================
// 状态流转
// ==========================================

#[test]
fn test_place_and_cancel_publish_events() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, _) = env.placed_purchase_order(&sp, 1.0);
    assert_eq!(order.status, PurchaseOrderStatus::Placed);
    assert!(order.issue_date.is_some());

    let cancelled = env.purchase_order_api.cancel_order(order.id, USER).unwrap();
    assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

    assert_eq!(
        env.events.names(),
        vec![
            event_names::PURCHASE_ORDER_PLACED,
            event_names::PURCHASE_ORDER_CANCELLED
        ]
    );

    // 已取消订单不能再次下单
    assert!(matches!(
        env.purchase_order_api.place_order(order.id, USER),
        Err(ApiError::InvalidStateTransition { .. })
    ));
}

#[test]
fn test_complete_order_requires_received_lines() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, _) = env.placed_purchase_order(&sp, 3.0);
    assert_validation_error(
        env.purchase_order_api.complete_order(order.id, false, USER),
        "Order has incomplete line items",
    );

    let completed = env
        .purchase_order_api
        .complete_order(order.id, true, USER)
        .unwrap();
    assert_eq!(completed.status, PurchaseOrderStatus::Complete);
    assert_eq!(completed.received_by.as_deref(), Some(USER));
    assert!(completed.complete_date.is_some());
}

#[test]
fn test_closed_order_lines_are_locked_unless_setting_allows() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, _) = env.placed_purchase_order(&sp, 1.0);
    env.purchase_order_api
        .complete_order(order.id, true, USER)
        .unwrap();

    let line = NewPurchaseLine {
        supplier_part_id: sp.id,
        quantity: 1.0,
        ..Default::default()
    };
    assert_validation_error(
        env.purchase_order_api.add_line_item(order.id, line.clone(), USER),
        "Line items cannot be modified for a closed order",
    );

    env.settings
        .update(|s| s.purchase_order_edit_completed = true);
    assert!(env.purchase_order_api.add_line_item(order.id, line, USER).is_ok());
}

// ==========================================
// 收货
// ==========================================

#[test]
fn test_receive_converts_pack_size_and_auto_completes() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let shelf = env.location("Shelf");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Resistor").default_location(shelf.id));
    let sp = env.supplier_part(part.id, supplier.id, 100.0);

    let (order, line) = env.placed_purchase_order(&sp, 2.0);
    let items = env
        .purchase_order_api
        .receive_line_items(order.id, vec![ReceiveLine::new(line.id, 2.0)], USER)
        .unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.quantity, 200.0);
    assert_eq!(item.location_id, Some(shelf.id));
    assert_eq!(item.purchase_order_id, Some(order.id));
    assert_eq!(item.supplier_part_id, Some(sp.id));
    // 单价按包装折算
    assert_eq!(item.purchase_price, Some(0.1));

    let tracking = env.stock_api.get_tracking(item.id).unwrap();
    assert!(tracking
        .iter()
        .any(|t| t.code == StockHistoryCode::ReceivedAgainstPurchaseOrder
            && t.deltas.as_ref().map(|d| d["purchaseorder"] == order.id).unwrap_or(false)));

    let order = env.purchase_order_api.get_order(order.id).unwrap();
    assert_eq!(order.status, PurchaseOrderStatus::Complete);
    assert_eq!(order.received_by.as_deref(), Some(USER));

    let names = env.events.names();
    assert!(names.contains(&event_names::PURCHASE_ORDER_RECEIVED.to_string()));
    assert!(names.contains(&event_names::PURCHASE_ORDER_COMPLETED.to_string()));
}

#[test]
fn test_partial_receipt_keeps_order_placed() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let dock = env.location("Dock");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, line) = env.placed_purchase_order(&sp, 10.0);
    let mut receive = ReceiveLine::new(line.id, 4.0);
    receive.location_id = Some(dock.id);
    receive.batch = "B-42".to_string();
    let items = env
        .purchase_order_api
        .receive_line_items(order.id, vec![receive], USER)
        .unwrap();

    assert_eq!(items[0].location_id, Some(dock.id));
    assert_eq!(items[0].batch, "B-42");

    let summary = env.purchase_order_api.line_summary(order.id).unwrap();
    assert_eq!(summary.line_count, 1);
    assert_eq!(summary.completed, 0);
    assert!(!summary.is_complete);
    assert_eq!(
        env.purchase_order_api.get_order(order.id).unwrap().status,
        PurchaseOrderStatus::Placed
    );
    assert_eq!(env.purchase_order_api.list_lines(order.id).unwrap()[0].received, 4.0);
}

#[test]
fn test_receive_requires_placed_order_and_lines() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let order = env
        .purchase_order_api
        .create_order(
            NewPurchaseOrder {
                supplier_id: supplier.id,
                ..Default::default()
            },
            USER,
        )
        .unwrap();
    let line = env
        .purchase_order_api
        .add_line_item(
            order.id,
            NewPurchaseLine {
                supplier_part_id: sp.id,
                quantity: 1.0,
                ..Default::default()
            },
            USER,
        )
        .unwrap();

    assert_validation_error(
        env.purchase_order_api.receive_line_items(order.id, vec![], USER),
        "Line items must be provided",
    );
    assert_validation_error(
        env.purchase_order_api
            .receive_line_items(order.id, vec![ReceiveLine::new(line.id, 1.0)], USER),
        "PLACED",
    );

    // 其他订单的行
    let (other, _) = env.placed_purchase_order(&sp, 1.0);
    assert_field_error(
        env.purchase_order_api
            .receive_line_items(other.id, vec![ReceiveLine::new(line.id, 1.0)], USER),
        "line_item",
        "Line item does not match purchase order",
    );
}

#[test]
fn test_receive_trackable_with_serials() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let shelf = env.location("Shelf");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Chassis").trackable().default_location(shelf.id));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);

    let (order, line) = env.placed_purchase_order(&sp, 6.0);

    let mut receive = ReceiveLine::new(line.id, 3.0);
    receive.serials = Some("1-3".to_string());
    let items = env
        .purchase_order_api
        .receive_line_items(order.id, vec![receive], USER)
        .unwrap();
    let serials: Vec<_> = items.iter().map(|i| i.serial.clone().unwrap()).collect();
    assert_eq!(serials, vec!["1", "2", "3"]);
    assert!(items.iter().all(|i| i.quantity == 1.0));

    // 重复序列号
    let mut duplicate = ReceiveLine::new(line.id, 2.0);
    duplicate.serials = Some("3, 4".to_string());
    assert_field_error(
        env.purchase_order_api
            .receive_line_items(order.id, vec![duplicate], USER),
        "serials",
        "Serial numbers already exist: 3",
    );

    // 追踪件数量必须为整数
    assert_field_error(
        env.purchase_order_api
            .receive_line_items(order.id, vec![ReceiveLine::new(line.id, 1.5)], USER),
        "quantity",
        "An integer quantity must be provided for trackable parts",
    );

    // 失败的收货不改变已收数量
    assert_eq!(env.purchase_order_api.list_lines(order.id).unwrap()[0].received, 3.0);
}

#[test]
fn test_serials_rejected_for_untracked_part() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);
    let (order, line) = env.placed_purchase_order(&sp, 2.0);

    let mut receive = ReceiveLine::new(line.id, 2.0);
    receive.serials = Some("1-2".to_string());
    assert_field_error(
        env.purchase_order_api
            .receive_line_items(order.id, vec![receive], USER),
        "serials",
        "Serial numbers can only be assigned to trackable parts",
    );
}

#[test]
fn test_over_receipt_is_accepted() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);
    let (order, line) = env.placed_purchase_order(&sp, 2.0);

    env.purchase_order_api
        .receive_line_items(order.id, vec![ReceiveLine::new(line.id, 5.0)], USER)
        .unwrap();

    let line = &env.purchase_order_api.list_lines(order.id).unwrap()[0];
    assert_eq!(line.received, 5.0);
    assert_eq!(
        env.purchase_order_api.get_order(order.id).unwrap().status,
        PurchaseOrderStatus::Complete
    );
}

#[test]
fn test_overdue_orders() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let today = chrono::Local::now().date_naive();

    let late = env
        .purchase_order_api
        .create_order(
            NewPurchaseOrder {
                supplier_id: supplier.id,
                target_date: Some(today - chrono::Duration::days(2)),
                ..Default::default()
            },
            USER,
        )
        .unwrap();
    env.purchase_order_api
        .create_order(
            NewPurchaseOrder {
                supplier_id: supplier.id,
                target_date: Some(today + chrono::Duration::days(2)),
                ..Default::default()
            },
            USER,
        )
        .unwrap();

    let overdue = env.purchase_order_api.list_overdue(today).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.id);
}

#[test]
fn test_actions_are_logged() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.supplier("Acme");
    let part = env.part(PartBuilder::new("Bolt"));
    let sp = env.supplier_part(part.id, supplier.id, 1.0);
    let (order, line) = env.placed_purchase_order(&sp, 1.0);
    env.purchase_order_api
        .receive_line_items(order.id, vec![ReceiveLine::new(line.id, 1.0)], USER)
        .unwrap();

    let logs = env.action_logs("purchase_order", order.id);
    let types: Vec<_> = logs.iter().map(|l| l.action_type.as_str()).collect();
    assert!(types.contains(&"CreatePurchaseOrder"));
    assert!(types.contains(&"PlacePurchaseOrder"));
    assert!(types.contains(&"ReceivePurchaseOrder"));
    assert!(logs.iter().all(|l| l.actor == USER));
}
