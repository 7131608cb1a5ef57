// ==========================================
// MRP 订单系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、状态码、纯谓词
// 红线: 不含数据访问逻辑,不含工作流规则
// ==========================================

pub mod action_log;
pub mod build;
pub mod company;
pub mod part;
pub mod purchase_order;
pub mod sales_order;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use build::{Build, BuildItem};
pub use company::{Company, SupplierPart};
pub use part::{BomItem, BomItemSubstitute, Part};
pub use purchase_order::{OrderExtraLine, PurchaseOrder, PurchaseOrderLineItem};
pub use sales_order::{SalesOrder, SalesOrderAllocation, SalesOrderLineItem, SalesOrderShipment};
pub use stock::{StockItem, StockItemTracking, StockLocation};
pub use types::{BuildStatus, PurchaseOrderStatus, SalesOrderStatus, StockHistoryCode, StockStatus};
