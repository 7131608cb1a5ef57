// ==========================================
// MRP 订单系统 - 引擎层
// ==========================================
// 职责: 订单工作流的纯规则（状态转换、分配运算、编号、序列号、事件）
// 红线: Engine 不拼 SQL
// ==========================================

pub mod allocation;
pub mod error;
pub mod events;
pub mod quantity;
pub mod reference;
pub mod serial;
pub mod transitions;

// 重导出核心规则
pub use allocation::{
    plan_auto_allocation, plan_trim, unallocated_stock, validate_stock_allocation,
    AllocationCandidate, BomLineRequirement, LineAllocation, TrimStep,
};
pub use error::{WorkflowError, WorkflowResult};
pub use events::{
    event_names, ChannelEventPublisher, EventDispatcher, NoOpEventPublisher, OrderEvent,
    OrderEventHandler, OrderEventPublisher, RecordingEventPublisher,
};
pub use reference::{
    extract_reference_int, format_reference, next_reference, reference_matches,
    validate_reference_pattern, ReferencePattern,
};
pub use serial::extract_serial_numbers;
pub use transitions::{
    build_transition, ensure_line_editable, purchase_order_transition, sales_order_transition,
    OrderAction,
};
