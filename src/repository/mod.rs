// ==========================================
// MRP 订单系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: 仓储借用 `&Connection`，可直接传入事务
// ==========================================

pub mod action_log_repo;
pub mod build_repo;
pub mod company_repo;
pub mod error;
pub mod part_repo;
pub mod purchase_order_repo;
pub mod row;
pub mod sales_order_repo;
pub mod stock_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use build_repo::BuildRepository;
pub use company_repo::CompanyRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use part_repo::PartRepository;
pub use purchase_order_repo::PurchaseOrderRepository;
pub use sales_order_repo::SalesOrderRepository;
pub use stock_repo::StockRepository;
