// ==========================================
// MRP 订单系统 - 操作日志数据仓储
// ==========================================
// 依据: v0.1_schema.sql action_log 表
// 红线: 所有工作流写操作必须记录
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
