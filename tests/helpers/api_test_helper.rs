// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 组装临时数据库上的全部 API，并提供常用主数据夹具
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use tempfile::NamedTempFile;

use mrp_orders::api::{
    ApiError, BuildOrderApi, CatalogApi, NewBuild, NewPurchaseLine, NewPurchaseOrder,
    NewSalesLine, NewSalesOrder, PurchaseOrderApi, SalesOrderApi, StockApi,
};
use mrp_orders::config::OrderSettings;
use mrp_orders::db::Database;
use mrp_orders::domain::{
    ActionLog, BomItem, Build, Company, Part, PurchaseOrder, PurchaseOrderLineItem, SalesOrder,
    SalesOrderLineItem, StockItem, StockLocation, SupplierPart,
};
use mrp_orders::engine::RecordingEventPublisher;
use mrp_orders::importer::BomImporter;
use mrp_orders::repository::ActionLogRepository;

use super::mock_config::MockSettings;
use super::test_data_builder::{BomBuilder, PartBuilder, StockItemBuilder};

pub use test_helpers::write_temp_csv;

pub const USER: &str = "tester";

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 所有 API 共用同一个临时数据库；事件写入内存记录器
pub struct ApiTestEnv {
    pub db: Database,
    pub settings: Arc<MockSettings>,
    pub events: Arc<RecordingEventPublisher>,

    pub catalog_api: CatalogApi,
    pub stock_api: StockApi,
    pub purchase_order_api: PurchaseOrderApi,
    pub sales_order_api: SalesOrderApi,
    pub build_api: BuildOrderApi,
    pub bom_importer: BomImporter,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 默认设置的测试环境
    pub fn new() -> Result<Self, String> {
        Self::with_settings(OrderSettings::default())
    }

    pub fn with_settings(settings: OrderSettings) -> Result<Self, String> {
        mrp_orders::logging::init_test();
        let (temp_file, db) =
            test_helpers::create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let settings = Arc::new(MockSettings::new(settings));
        let events = Arc::new(RecordingEventPublisher::new());

        Ok(Self {
            catalog_api: CatalogApi::new(db.clone()),
            stock_api: StockApi::new(db.clone()),
            purchase_order_api: PurchaseOrderApi::new(db.clone(), settings.clone(), events.clone()),
            sales_order_api: SalesOrderApi::new(db.clone(), settings.clone(), events.clone()),
            build_api: BuildOrderApi::new(db.clone(), settings.clone(), events.clone()),
            bom_importer: BomImporter::new(db.clone()),
            db,
            settings,
            events,
            _temp_file: temp_file,
        })
    }

    // ==========================================
    // 主数据夹具
    // ==========================================

    pub fn location(&self, name: &str) -> StockLocation {
        self.stock_api
            .create_location(name, "", None)
            .expect("创建库位失败")
    }

    pub fn sub_location(&self, name: &str, parent_id: i64) -> StockLocation {
        self.stock_api
            .create_location(name, "", Some(parent_id))
            .expect("创建库位失败")
    }

    pub fn supplier(&self, name: &str) -> Company {
        self.catalog_api
            .create_company(Company::new(name, true, false))
            .expect("创建供应商失败")
    }

    pub fn customer(&self, name: &str) -> Company {
        self.catalog_api
            .create_company(Company::new(name, false, true))
            .expect("创建客户失败")
    }

    pub fn part(&self, builder: PartBuilder) -> Part {
        self.catalog_api
            .create_part(builder.build())
            .expect("创建零件失败")
    }

    pub fn bom(&self, builder: BomBuilder) -> BomItem {
        self.catalog_api
            .add_bom_item(builder.build())
            .expect("添加 BOM 行失败")
    }

    pub fn supplier_part(&self, part_id: i64, supplier_id: i64, pack_size: f64) -> SupplierPart {
        self.catalog_api
            .create_supplier_part(part_id, supplier_id, &format!("SKU-{}", part_id), pack_size)
            .expect("创建供应商零件失败")
    }

    pub fn stock(&self, part_id: i64, quantity: f64, location_id: i64) -> StockItem {
        self.stock_item(StockItemBuilder::new(part_id, quantity).location(location_id))
    }

    pub fn serial_stock(&self, part_id: i64, serial: &str, location_id: i64) -> StockItem {
        self.stock_item(
            StockItemBuilder::new(part_id, 1.0)
                .serial(serial)
                .location(location_id),
        )
    }

    pub fn stock_item(&self, builder: StockItemBuilder) -> StockItem {
        self.stock_api
            .create_stock_item(builder.build(), USER)
            .expect("创建库存失败")
    }

    pub fn item(&self, item_id: i64) -> StockItem {
        self.stock_api.get_item(item_id).expect("库存项不存在")
    }

    // ==========================================
    // 订单夹具
    // ==========================================

    /// 已下单采购订单 + 一行
    pub fn placed_purchase_order(
        &self,
        supplier_part: &SupplierPart,
        quantity: f64,
    ) -> (PurchaseOrder, PurchaseOrderLineItem) {
        let order = self
            .purchase_order_api
            .create_order(
                NewPurchaseOrder {
                    supplier_id: supplier_part.supplier_id,
                    ..Default::default()
                },
                USER,
            )
            .expect("创建采购订单失败");
        let line = self
            .purchase_order_api
            .add_line_item(
                order.id,
                NewPurchaseLine {
                    supplier_part_id: supplier_part.id,
                    quantity,
                    purchase_price: Some(10.0),
                    ..Default::default()
                },
                USER,
            )
            .expect("添加采购订单行失败");
        let order = self
            .purchase_order_api
            .place_order(order.id, USER)
            .expect("下单失败");
        (order, line)
    }

    /// 销售订单 + 一行
    pub fn sales_order(
        &self,
        customer_id: i64,
        part_id: i64,
        quantity: f64,
    ) -> (SalesOrder, SalesOrderLineItem) {
        let order = self
            .sales_order_api
            .create_order(
                NewSalesOrder {
                    customer_id,
                    ..Default::default()
                },
                USER,
            )
            .expect("创建销售订单失败");
        let line = self
            .sales_order_api
            .add_line_item(
                order.id,
                NewSalesLine {
                    part_id,
                    quantity,
                    ..Default::default()
                },
                USER,
            )
            .expect("添加销售订单行失败");
        (order, line)
    }

    /// 已下达的生产订单
    pub fn issued_build(&self, part_id: i64, quantity: f64, take_from: Option<i64>) -> Build {
        let build = self
            .build_api
            .create_build(
                NewBuild {
                    part_id,
                    quantity,
                    take_from_id: take_from,
                    ..Default::default()
                },
                USER,
            )
            .expect("创建生产订单失败");
        self.build_api
            .issue_build(build.id, USER)
            .expect("下达生产订单失败")
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn action_logs(&self, entity_kind: &str, entity_id: i64) -> Vec<ActionLog> {
        self.db
            .with_conn(|conn| ActionLogRepository::new(conn).find_by_entity(entity_kind, entity_id))
            .expect("查询操作日志失败")
    }
}

/// 断言字段级错误
pub fn assert_field_error<T: std::fmt::Debug>(result: Result<T, ApiError>, field: &str, message: &str) {
    match result {
        Err(ApiError::FieldValueError {
            field: actual_field,
            message: actual_message,
        }) => {
            assert_eq!(actual_field, field, "字段不匹配: {}", actual_message);
            assert!(
                actual_message.contains(message),
                "错误消息不匹配: 期望包含 '{}'，实际 '{}'",
                message,
                actual_message
            );
        }
        other => panic!("期望字段错误 {}: {}，实际 {:?}", field, message, other),
    }
}

/// 断言非字段级校验错误
pub fn assert_validation_error<T: std::fmt::Debug>(result: Result<T, ApiError>, message: &str) {
    match result {
        Err(ApiError::ValidationError(actual)) => assert!(
            actual.contains(message),
            "错误消息不匹配: 期望包含 '{}'，实际 '{}'",
            message,
            actual
        ),
        other => panic!("期望校验错误 '{}'，实际 {:?}", message, other),
    }
}
