// ==========================================
// MRP 订单系统 - 演示数据库初始化
// ==========================================
// 用法: seed_demo_db [db_path]
// 说明: 备份并重建数据库，跑通 采购 → 生产 → 销售 一整条链路
// ==========================================

use chrono::{Duration, Local};
use std::error::Error;
use std::fs;
use std::path::Path;

use mrp_orders::api::{
    AllocationRequest, AutoAllocateOptions, BuildAllocationRequest, CompleteBuildOptions,
    CompleteOutputsRequest, CompleteShipment, NewBuild, NewPurchaseLine, NewPurchaseOrder,
    NewSalesLine, NewSalesOrder, ReceiveLine,
};
use mrp_orders::app::{get_default_db_path, AppState};
use mrp_orders::domain::{BomItem, Company, Part};

const USER: &str = "demo";

fn main() -> Result<(), Box<dyn Error>> {
    mrp_orders::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;
    let state = AppState::new(db_path.clone())?;
    seed_scenario(&state)?;

    eprintln!("Seeded demo database: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_scenario(state: &AppState) -> Result<(), Box<dyn Error>> {
    let today = Local::now().date_naive();

    // ===== 库位 =====
    let warehouse = state.stock_api.create_location("Warehouse", "Main warehouse", None)?;
    let shelf = state
        .stock_api
        .create_location("Shelf A", "Components shelf", Some(warehouse.id))?;
    let finished = state
        .stock_api
        .create_location("Finished Goods", "Completed assemblies", Some(warehouse.id))?;

    // ===== 企业 =====
    let supplier = state
        .catalog_api
        .create_company(Company::new("Acme Components", true, false))?;
    let customer = state
        .catalog_api
        .create_company(Company::new("Widget Retail", false, true))?;

    // ===== 零件 =====
    let resistor = state.catalog_api.create_part(Part {
        default_location_id: Some(shelf.id),
        ..Part::new("Resistor 10k")
    })?;
    let screw = state.catalog_api.create_part(Part {
        default_location_id: Some(shelf.id),
        ..Part::new("M3 Screw")
    })?;
    let chassis = state.catalog_api.create_part(Part {
        trackable: true,
        default_location_id: Some(shelf.id),
        ..Part::new("Chassis")
    })?;
    let widget = state.catalog_api.create_part(Part {
        assembly: true,
        salable: true,
        purchaseable: false,
        default_location_id: Some(finished.id),
        ..Part::new("Widget")
    })?;
    let gadget = state.catalog_api.create_part(Part {
        assembly: true,
        salable: true,
        trackable: true,
        purchaseable: false,
        default_location_id: Some(finished.id),
        ..Part::new("Gadget")
    })?;

    // ===== BOM =====
    state.catalog_api.add_bom_item(bom(widget.id, resistor.id, 4.0, false))?;
    state.catalog_api.add_bom_item(bom(widget.id, screw.id, 2.0, true))?;
    let gadget_chassis = state.catalog_api.add_bom_item(bom(gadget.id, chassis.id, 1.0, false))?;
    state.catalog_api.add_bom_item(bom(gadget.id, resistor.id, 2.0, false))?;

    // ===== 供应商零件 =====
    let sp_resistor = state
        .catalog_api
        .create_supplier_part(resistor.id, supplier.id, "ACME-R10K", 100.0)?;
    let sp_screw = state
        .catalog_api
        .create_supplier_part(screw.id, supplier.id, "ACME-M3", 50.0)?;
    let sp_chassis = state
        .catalog_api
        .create_supplier_part(chassis.id, supplier.id, "ACME-CH", 1.0)?;

    // ===== 采购: 下单并全部收货（自动完成） =====
    let po = state.purchase_order_api.create_order(
        NewPurchaseOrder {
            supplier_id: supplier.id,
            description: "Initial component stock".to_string(),
            target_date: Some(today + Duration::days(7)),
            ..Default::default()
        },
        USER,
    )?;
    let line_resistor = state.purchase_order_api.add_line_item(
        po.id,
        purchase_line(sp_resistor.id, 1.0, 12.0),
        USER,
    )?;
    let line_screw = state.purchase_order_api.add_line_item(
        po.id,
        purchase_line(sp_screw.id, 1.0, 4.0),
        USER,
    )?;
    let line_chassis = state.purchase_order_api.add_line_item(
        po.id,
        purchase_line(sp_chassis.id, 3.0, 25.0),
        USER,
    )?;
    state
        .purchase_order_api
        .add_extra_line(po.id, "Shipping", 1.0, Some(15.0), "")?;
    state.purchase_order_api.place_order(po.id, USER)?;

    let mut chassis_receipt = ReceiveLine::new(line_chassis.id, 3.0);
    chassis_receipt.serials = Some("1-3".to_string());
    let received = state.purchase_order_api.receive_line_items(
        po.id,
        vec![
            ReceiveLine::new(line_resistor.id, 1.0),
            ReceiveLine::new(line_screw.id, 1.0),
            chassis_receipt,
        ],
        USER,
    )?;
    let chassis_items: Vec<_> = received
        .iter()
        .filter(|item| item.part_id == chassis.id)
        .cloned()
        .collect();

    // 第二张采购单保持 PLACED，且已逾期
    let open_po = state.purchase_order_api.create_order(
        NewPurchaseOrder {
            supplier_id: supplier.id,
            description: "Restock".to_string(),
            target_date: Some(today - Duration::days(3)),
            ..Default::default()
        },
        USER,
    )?;
    state.purchase_order_api.add_line_item(
        open_po.id,
        purchase_line(sp_resistor.id, 2.0, 12.0),
        USER,
    )?;
    state.purchase_order_api.place_order(open_po.id, USER)?;

    // ===== 生产: Widget（非追踪） =====
    let widget_build = state.build_api.create_build(
        NewBuild {
            part_id: widget.id,
            quantity: 10.0,
            title: "Widget batch".to_string(),
            take_from_id: Some(warehouse.id),
            target_date: Some(today + Duration::days(2)),
            ..Default::default()
        },
        USER,
    )?;
    state.build_api.issue_build(widget_build.id, USER)?;
    state
        .build_api
        .auto_allocate(widget_build.id, AutoAllocateOptions::default(), USER)?;
    let widget_outputs = state
        .build_api
        .create_outputs(widget_build.id, 10.0, None, None, USER)?;
    state.build_api.complete_outputs(
        widget_build.id,
        CompleteOutputsRequest::new(widget_outputs.iter().map(|o| o.id).collect()),
        USER,
    )?;
    state
        .build_api
        .complete_build(widget_build.id, CompleteBuildOptions::default(), USER)?;

    // ===== 生产: Gadget（追踪，带序列号） =====
    let gadget_build = state.build_api.create_build(
        NewBuild {
            part_id: gadget.id,
            quantity: 2.0,
            title: "Gadget prototypes".to_string(),
            take_from_id: Some(warehouse.id),
            ..Default::default()
        },
        USER,
    )?;
    state.build_api.issue_build(gadget_build.id, USER)?;
    let gadget_outputs = state
        .build_api
        .create_outputs(gadget_build.id, 2.0, Some("1, 2"), None, USER)?;
    let requests = gadget_outputs
        .iter()
        .zip(chassis_items.iter())
        .map(|(output, chassis_item)| BuildAllocationRequest {
            bom_item_id: gadget_chassis.id,
            stock_item_id: chassis_item.id,
            quantity: 1.0,
            output_id: Some(output.id),
        })
        .collect();
    state.build_api.allocate_stock(gadget_build.id, requests, USER)?;
    state
        .build_api
        .auto_allocate(gadget_build.id, AutoAllocateOptions::default(), USER)?;
    // 只完工第一个产出，订单保持生产中
    state.build_api.complete_outputs(
        gadget_build.id,
        CompleteOutputsRequest::new(vec![gadget_outputs[0].id]),
        USER,
    )?;

    // ===== 销售: Widget 部分发货 =====
    let so = state.sales_order_api.create_order(
        NewSalesOrder {
            customer_id: customer.id,
            description: "Widgets for retail".to_string(),
            target_date: Some(today + Duration::days(10)),
            ..Default::default()
        },
        USER,
    )?;
    let so_line = state.sales_order_api.add_line_item(
        so.id,
        NewSalesLine {
            part_id: widget.id,
            quantity: 5.0,
            sale_price: Some(40.0),
            ..Default::default()
        },
        USER,
    )?;
    state.sales_order_api.issue_order(so.id, USER)?;
    let shipment = match state.sales_order_api.list_shipments(so.id)?.into_iter().next() {
        Some(shipment) => shipment,
        None => state.sales_order_api.create_shipment(so.id, "1")?,
    };
    let widget_stock = state
        .stock_api
        .available_stock_for_part(widget.id, None, None)?;
    if let Some(stock) = widget_stock.first() {
        state.sales_order_api.allocate_stock(
            shipment.id,
            vec![AllocationRequest {
                line_id: so_line.id,
                stock_item_id: stock.item.id,
                quantity: 5.0,
            }],
            USER,
        )?;
        state.sales_order_api.complete_shipment(
            shipment.id,
            CompleteShipment {
                tracking_number: "TRK-0001".to_string(),
                ..Default::default()
            },
            USER,
        )?;
    }

    eprintln!(
        "purchase orders: {}, builds: {}, sales orders: {}",
        state.purchase_order_api.list_orders(None)?.len(),
        state.build_api.list_builds(None)?.len(),
        state.sales_order_api.list_orders(None)?.len(),
    );
    Ok(())
}

fn bom(part_id: i64, sub_part_id: i64, quantity: f64, consumable: bool) -> BomItem {
    BomItem {
        id: 0,
        part_id,
        sub_part_id,
        quantity,
        reference: String::new(),
        optional: false,
        consumable,
        substitute_part_ids: Vec::new(),
    }
}

fn purchase_line(supplier_part_id: i64, quantity: f64, price: f64) -> NewPurchaseLine {
    NewPurchaseLine {
        supplier_part_id,
        quantity,
        purchase_price: Some(price),
        ..Default::default()
    }
}
