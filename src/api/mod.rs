// ==========================================
// MRP 订单系统 - API 层
// ==========================================
// 职责: 订单工作流业务 API（事务边界 + 操作日志 + 事件）
// ==========================================

pub mod build_api;
pub mod catalog_api;
pub(crate) mod common;
pub mod error;
pub mod purchase_order_api;
pub mod sales_order_api;
pub mod stock_api;
pub(crate) mod stock_ops;

// 重导出核心类型
pub use build_api::{
    AutoAllocateOptions, BomLineReport, BuildAllocationReport, BuildAllocationRequest,
    BuildOrderApi, CompleteBuildOptions, CompleteOutputsRequest, NewBuild, OverallocationPolicy,
};
pub use catalog_api::CatalogApi;
pub use error::{ApiError, ApiResult};
pub use purchase_order_api::{
    LineSummary, NewPurchaseLine, NewPurchaseOrder, PurchaseOrderApi, ReceiveLine,
};
pub use sales_order_api::{
    AllocationRequest, CompleteShipment, LineAllocationReport, NewSalesLine, NewSalesOrder,
    SalesAllocationSummary, SalesOrderApi,
};
pub use stock_api::{AvailableStock, StockApi};
