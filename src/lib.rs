// ==========================================
// MRP 订单系统 - 核心库
// ==========================================
// 范围: 采购订单 / 销售订单 / 生产订单 工作流
// 技术栈: Rust + SQLite
// ==========================================

// 分层: domain <- repository <- engine <- api <- app
// importer/config 为外围输入, db/perf/logging 为基础设施

pub mod domain;
pub mod repository;
pub mod engine; // 纯规则: 状态机/分配/序列号/引用号
pub mod importer;
pub mod config;
pub mod db;
pub mod logging;
pub mod perf;
pub mod api; // 每个公开操作一个事务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BuildStatus, PurchaseOrderStatus, SalesOrderStatus, StockHistoryCode, StockStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, BomItem, Build, BuildItem, Company, Part, PurchaseOrder,
    PurchaseOrderLineItem, SalesOrder, SalesOrderAllocation, SalesOrderLineItem,
    SalesOrderShipment, StockItem, StockLocation, SupplierPart,
};

// 引擎
pub use engine::{OrderEvent, OrderEventPublisher, WorkflowError};

// API
pub use api::{
    ApiError, ApiResult, BuildOrderApi, CatalogApi, PurchaseOrderApi, SalesOrderApi, StockApi,
};

// 数据库
pub use db::Database;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "MRP 订单系统";

/// 对应 migrations/ 下的建库脚本版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(DB_VERSION, "v0.1");
    }
}
