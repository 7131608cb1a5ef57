// ==========================================
// MRP 订单系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和 API 实例
// ==========================================

use std::sync::Arc;

use crate::api::{BuildOrderApi, CatalogApi, PurchaseOrderApi, SalesOrderApi, StockApi};
use crate::config::{ConfigManager, OrderSettingsReader};
use crate::db::Database;
use crate::engine::{NoOpEventPublisher, OrderEventPublisher};
use crate::importer::BomImporter;

/// 应用状态
///
/// 包含所有 API 实例和共享资源，全部 API 共用同一个数据库句柄
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享数据库句柄
    pub db: Database,

    /// 配置管理器（同时作为订单设置来源）
    pub config_manager: Arc<ConfigManager>,

    /// 主数据 API（公司/物料/BOM）
    pub catalog_api: Arc<CatalogApi>,

    /// 库存 API
    pub stock_api: Arc<StockApi>,

    /// 采购订单 API
    pub purchase_order_api: Arc<PurchaseOrderApi>,

    /// 销售订单 API
    pub sales_order_api: Arc<SalesOrderApi>,

    /// 生产订单 API
    pub build_api: Arc<BuildOrderApi>,

    /// BOM 导入
    pub bom_importer: Arc<BomImporter>,

    /// 事件发布器
    pub event_publisher: Arc<dyn OrderEventPublisher>,
}

impl AppState {
    /// 创建新的 AppState 实例（事件丢弃）
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_publisher(db_path, Arc::new(NoOpEventPublisher))
    }

    /// 使用指定事件发布器创建 AppState
    ///
    /// 该方法会：
    /// 1. 打开数据库并初始化 schema
    /// 2. 创建共享连接上的 ConfigManager
    /// 3. 创建所有 API 实例
    pub fn with_publisher(
        db_path: String,
        event_publisher: Arc<dyn OrderEventPublisher>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let db = Database::open(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_database(db_path, db, event_publisher)
    }

    /// 基于已打开的数据库创建（测试可传入内存库）
    pub fn from_database(
        db_path: String,
        db: Database,
        event_publisher: Arc<dyn OrderEventPublisher>,
    ) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(db.shared_connection())
                .map_err(|e| format!("无法初始化ConfigManager: {}", e))?,
        );
        let settings: Arc<dyn OrderSettingsReader> = config_manager.clone();

        let catalog_api = Arc::new(CatalogApi::new(db.clone()));
        let stock_api = Arc::new(StockApi::new(db.clone()));
        let purchase_order_api = Arc::new(PurchaseOrderApi::new(
            db.clone(),
            settings.clone(),
            event_publisher.clone(),
        ));
        let sales_order_api = Arc::new(SalesOrderApi::new(
            db.clone(),
            settings.clone(),
            event_publisher.clone(),
        ));
        let build_api = Arc::new(BuildOrderApi::new(
            db.clone(),
            settings,
            event_publisher.clone(),
        ));
        let bom_importer = Arc::new(BomImporter::new(db.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            db,
            config_manager,
            catalog_api,
            stock_api,
            purchase_order_api,
            sales_order_api,
            build_api,
            bom_importer,
            event_publisher,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级：
/// 1. 环境变量 `MRP_ORDERS_DB_PATH`
/// 2. 用户数据目录下的 mrp-orders(-dev)/mrp_orders.db
/// 3. 当前目录 ./mrp_orders.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MRP_ORDERS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./mrp_orders.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("mrp-orders-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("mrp-orders");
        }

        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&path).is_ok() {
            path = path.join("mrp_orders.db");
        } else {
            path = PathBuf::from("./mrp_orders.db");
        }
    }

    path.to_string_lossy().to_string()
}
