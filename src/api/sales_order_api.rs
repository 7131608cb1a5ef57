// ==========================================
// MRP 订单系统 - 销售订单 API
// ==========================================
// 职责: 销售订单、发货单、库存分配、发货完成
// 红线:
// - 分配数量不超过库存项未分配数量
// - 发货拆分不产生也不消灭数量
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::common::{
    duplicate_reference, load_settings, log_action, publish_all, resolve_reference, today,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::stock_ops;
use crate::config::{OrderSettings, OrderSettingsReader};
use crate::db::Database;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::purchase_order::OrderExtraLine;
use crate::domain::sales_order::{
    SalesOrder, SalesOrderAllocation, SalesOrderLineItem, SalesOrderShipment,
};
use crate::domain::types::{SalesOrderStatus, StockHistoryCode};
use crate::engine::allocation::{validate_stock_allocation, LineAllocation};
use crate::engine::events::{event_names, OrderEvent, OrderEventPublisher};
use crate::engine::quantity::{is_positive, qty_eq, qty_ge, qty_gt, round_qty};
use crate::engine::serial::extract_serial_numbers;
use crate::engine::transitions::{ensure_line_editable, sales_order_transition, OrderAction};
use crate::perf::PerfGuard;
use crate::repository::{CompanyRepository, PartRepository, SalesOrderRepository, StockRepository};

/// 默认发货单编号
pub const DEFAULT_SHIPMENT_REFERENCE: &str = "1";

// ==========================================
// 请求 / 响应结构
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSalesOrder {
    pub reference: Option<String>,
    pub customer_id: i64,
    pub description: String,
    pub customer_reference: String,
    pub currency: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub responsible: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSalesLine {
    pub part_id: i64,
    pub quantity: f64,
    pub sale_price: Option<f64>,
    pub reference: String,
    pub notes: String,
    pub target_date: Option<NaiveDate>,
}

/// 分配请求: 订单行 ← 库存项 × 数量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub line_id: i64,
    pub stock_item_id: i64,
    pub quantity: f64,
}

/// 发货完成参数（shipment_date 为空时取当天）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteShipment {
    pub shipment_date: Option<NaiveDate>,
    pub tracking_number: String,
    pub invoice_number: String,
    pub link: String,
}

/// 订单行分配状况
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineAllocationReport {
    pub line_id: i64,
    pub allocation: LineAllocation,
}

/// 订单分配汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesAllocationSummary {
    pub order_id: i64,
    pub lines: Vec<LineAllocationReport>,
    pub is_fully_allocated: bool,
    pub is_over_allocated: bool,
    pub is_completed: bool,
    pub pending_shipments: usize,
    pub completed_shipments: usize,
}

// ==========================================
// SalesOrderApi - 销售订单 API
// ==========================================
pub struct SalesOrderApi {
    db: Database,
    settings: Arc<dyn OrderSettingsReader>,
    events: Arc<dyn OrderEventPublisher>,
}

impl SalesOrderApi {
    pub fn new(
        db: Database,
        settings: Arc<dyn OrderSettingsReader>,
        events: Arc<dyn OrderEventPublisher>,
    ) -> Self {
        Self {
            db,
            settings,
            events,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_order(&self, order_id: i64) -> ApiResult<SalesOrder> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).get(order_id)?))
    }

    pub fn list_orders(&self, statuses: Option<&[SalesOrderStatus]>) -> ApiResult<Vec<SalesOrder>> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).list(statuses)?))
    }

    pub fn list_lines(&self, order_id: i64) -> ApiResult<Vec<SalesOrderLineItem>> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).list_lines(order_id)?))
    }

    pub fn get_line(&self, line_id: i64) -> ApiResult<SalesOrderLineItem> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).get_line(line_id)?))
    }

    pub fn list_shipments(&self, order_id: i64) -> ApiResult<Vec<SalesOrderShipment>> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).list_shipments(order_id)?))
    }

    pub fn get_shipment(&self, shipment_id: i64) -> ApiResult<SalesOrderShipment> {
        self.db
            .with_conn(|conn| Ok(SalesOrderRepository::new(conn).get_shipment(shipment_id)?))
    }

    pub fn list_allocations(&self, order_id: i64) -> ApiResult<Vec<SalesOrderAllocation>> {
        self.db.with_conn(|conn| {
            Ok(SalesOrderRepository::new(conn).list_allocations_for_order(order_id)?)
        })
    }

    pub fn list_overdue(&self, today: NaiveDate) -> ApiResult<Vec<SalesOrder>> {
        let orders = self.list_orders(Some(&SalesOrderStatus::OPEN))?;
        Ok(orders.into_iter().filter(|o| o.is_overdue(today)).collect())
    }

    /// 订单分配汇总
    pub fn allocation_summary(&self, order_id: i64) -> ApiResult<SalesAllocationSummary> {
        self.db.with_conn(|conn| {
            let repo = SalesOrderRepository::new(conn);
            let order = repo.get(order_id)?;
            let shipped = order.status.is_complete();

            let mut lines = Vec::new();
            for line in repo.list_lines(order_id)? {
                let allocation = LineAllocation {
                    required: line.quantity,
                    allocated: round_qty(repo.line_allocated_total(line.id)?),
                    fulfilled: line.shipped,
                };
                lines.push(LineAllocationReport {
                    line_id: line.id,
                    allocation,
                });
            }

            let shipments = repo.list_shipments(order_id)?;
            let completed_shipments = shipments.iter().filter(|s| s.is_complete()).count();

            Ok(SalesAllocationSummary {
                order_id,
                is_fully_allocated: lines
                    .iter()
                    .all(|l| l.allocation.is_fully_allocated(shipped)),
                is_over_allocated: lines.iter().any(|l| l.allocation.is_over_allocated()),
                is_completed: lines
                    .iter()
                    .all(|l| qty_ge(l.allocation.fulfilled, l.allocation.required)),
                pending_shipments: shipments.len() - completed_shipments,
                completed_shipments,
                lines,
            })
        })
    }

    // ==========================================
    // 创建 / 编辑
    // ==========================================

    /// 创建销售订单
    ///
    /// SALESORDER_DEFAULT_SHIPMENT 开启时同一事务内创建发货单 "1"
    pub fn create_order(&self, new: NewSalesOrder, user: &str) -> ApiResult<SalesOrder> {
        let _perf = PerfGuard::new("create_sales_order");
        let settings = load_settings(self.settings.as_ref())?;

        self.db.with_transaction(|tx| {
            let customer = CompanyRepository::new(tx).get(new.customer_id)?;
            if !customer.is_customer {
                return Err(ApiError::field(
                    "customer",
                    format!("Company '{}' is not a customer", customer.name),
                ));
            }

            let repo = SalesOrderRepository::new(tx);
            let (reference, reference_int) = resolve_reference(
                new.reference.as_deref(),
                &settings.sales_order_reference_pattern,
                repo.max_reference_int()?,
            )?;
            if repo.find_by_reference(&reference)?.is_some() {
                return Err(duplicate_reference(&reference));
            }

            let mut order = SalesOrder {
                id: 0,
                reference,
                reference_int,
                description: new.description.clone(),
                customer_id: customer.id,
                customer_reference: new.customer_reference.clone(),
                currency: new.currency.clone().unwrap_or(customer.currency),
                status: SalesOrderStatus::Pending,
                creation_date: today(),
                issue_date: None,
                target_date: new.target_date,
                shipment_date: None,
                created_by: Some(user.to_string()),
                shipped_by: None,
                responsible: new.responsible.clone(),
                notes: new.notes.clone(),
            };
            order.id = repo.insert(&order)?;

            if settings.sales_order_default_shipment {
                repo.insert_shipment(&SalesOrderShipment::new(order.id, DEFAULT_SHIPMENT_REFERENCE))?;
            }

            log_action(
                tx,
                ActionLog::new(ActionType::CreateSalesOrder, user, "sales_order", Some(order.id))
                    .with_payload(&serde_json::json!({ "reference": order.reference })),
            )?;
            tracing::info!(order_id = order.id, reference = %order.reference, "销售订单已创建");
            Ok(order)
        })
    }

    pub fn add_line_item(
        &self,
        order_id: i64,
        new: NewSalesLine,
        user: &str,
    ) -> ApiResult<SalesOrderLineItem> {
        let settings = load_settings(self.settings.as_ref())?;
        let quantity = round_qty(new.quantity);
        if !is_positive(quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }

        self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let order = repo.get(order_id)?;
            ensure_line_editable(order.is_open(), settings.sales_order_edit_completed)?;

            let part = PartRepository::new(tx).get(new.part_id)?;
            if !part.salable {
                return Err(ApiError::field("part", "Part must be salable"));
            }
            if part.is_virtual {
                return Err(ApiError::field("part", "Virtual parts cannot be sold"));
            }

            let mut line = SalesOrderLineItem {
                id: 0,
                order_id,
                part_id: Some(part.id),
                quantity,
                shipped: 0.0,
                sale_price: new.sale_price,
                reference: new.reference.clone(),
                notes: new.notes.clone(),
                target_date: new.target_date,
            };
            line.id = repo.insert_line(&line)?;
            tracing::debug!(order_id, line_id = line.id, user, "销售订单行已添加");
            Ok(line)
        })
    }

    pub fn add_extra_line(
        &self,
        order_id: i64,
        reference: &str,
        quantity: f64,
        price: Option<f64>,
        notes: &str,
    ) -> ApiResult<OrderExtraLine> {
        let settings = load_settings(self.settings.as_ref())?;
        self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let order = repo.get(order_id)?;
            ensure_line_editable(order.is_open(), settings.sales_order_edit_completed)?;

            let mut line = OrderExtraLine {
                id: 0,
                order_id,
                reference: reference.to_string(),
                quantity: round_qty(quantity),
                price,
                notes: notes.to_string(),
            };
            line.id = repo.insert_extra_line(&line)?;
            Ok(line)
        })
    }

    /// 下达: Pending → InProgress
    pub fn issue_order(&self, order_id: i64, user: &str) -> ApiResult<SalesOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            order.status = sales_order_transition(order.status, OrderAction::Issue)?;
            order.issue_date = Some(today());
            repo.update(&order)?;
            log_action(
                tx,
                ActionLog::new(ActionType::IssueSalesOrder, user, "sales_order", Some(order_id)),
            )?;
            Ok::<_, ApiError>(order)
        })?;

        tracing::info!(order_id, "销售订单已下达");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::SALES_ORDER_ISSUED, order_id)],
        );
        Ok(order)
    }

    // ==========================================
    // 发货单
    // ==========================================

    pub fn create_shipment(&self, order_id: i64, reference: &str) -> ApiResult<SalesOrderShipment> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ApiError::field("reference", "Shipment reference must not be empty"));
        }

        self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let order = repo.get(order_id)?;
            if !order.is_open() {
                return Err(ApiError::validation(
                    "Shipments can only be created for an open order",
                ));
            }
            if repo.find_shipment_by_reference(order_id, reference)?.is_some() {
                return Err(ApiError::field(
                    "reference",
                    format!("Shipment reference must be unique for order: {}", reference),
                ));
            }

            let mut shipment = SalesOrderShipment::new(order_id, reference);
            shipment.id = repo.insert_shipment(&shipment)?;
            Ok(shipment)
        })
    }

    // ==========================================
    // 库存分配
    // ==========================================

    /// 将库存分配到发货单
    ///
    /// 允许超出订单行数量（以 is_over_allocated 报告）
    pub fn allocate_stock(
        &self,
        shipment_id: i64,
        requests: Vec<AllocationRequest>,
        user: &str,
    ) -> ApiResult<Vec<SalesOrderAllocation>> {
        let _perf = PerfGuard::new("allocate_sales_stock");
        let settings = load_settings(self.settings.as_ref())?;

        self.db.with_transaction(|tx| {
            let allocations = allocate_in_tx(tx, &settings, shipment_id, &requests)?;
            log_action(
                tx,
                ActionLog::new(ActionType::AllocateSalesStock, user, "sales_order_shipment", Some(shipment_id))
                    .with_payload(&requests),
            )?;
            Ok(allocations)
        })
    }

    /// 按序列号分配
    ///
    /// 序列号表达式展开后必须全部对应在库、未分配的单件库存
    pub fn allocate_serials(
        &self,
        order_id: i64,
        line_id: i64,
        shipment_id: i64,
        serials: &str,
        quantity: f64,
        user: &str,
    ) -> ApiResult<Vec<SalesOrderAllocation>> {
        let settings = load_settings(self.settings.as_ref())?;

        self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let line = repo.get_line(line_id)?;
            if line.order_id != order_id {
                return Err(ApiError::field("line_item", "Line item is not associated with this order"));
            }
            let part_id = line
                .part_id
                .ok_or_else(|| ApiError::field("line_item", "Line item has no part"))?;

            let stock = StockRepository::new(tx);
            let next = stock.max_serial_int(part_id)?.unwrap_or(0) + 1;
            let numbers = extract_serial_numbers(serials, quantity, next)?;

            let mut not_found = Vec::new();
            let mut unavailable = Vec::new();
            let mut requests = Vec::new();
            for serial in numbers.iter().map(|n| n.to_string()) {
                match stock.find_by_serial(part_id, &serial)? {
                    Some(item) if qty_eq(item.quantity, 1.0) => {
                        let free = stock_ops::unallocated_quantity(tx, &item)?;
                        if item.in_stock() && is_positive(free) {
                            requests.push(AllocationRequest {
                                line_id,
                                stock_item_id: item.id,
                                quantity: 1.0,
                            });
                        } else {
                            unavailable.push(serial);
                        }
                    }
                    _ => not_found.push(serial),
                }
            }

            if !not_found.is_empty() {
                return Err(ApiError::field(
                    "serial_numbers",
                    format!("No matching item for serial {}", not_found.join(",")),
                ));
            }
            if !unavailable.is_empty() {
                return Err(ApiError::field(
                    "serial_numbers",
                    format!("The following serial numbers are already allocated: {}", unavailable.join(",")),
                ));
            }

            let allocations = allocate_in_tx(tx, &settings, shipment_id, &requests)?;
            log_action(
                tx,
                ActionLog::new(ActionType::AllocateSalesStock, user, "sales_order_shipment", Some(shipment_id))
                    .with_payload(&serde_json::json!({ "line_id": line_id, "serials": serials })),
            )?;
            Ok(allocations)
        })
    }

    pub fn delete_allocation(&self, allocation_id: i64, user: &str) -> ApiResult<()> {
        self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let allocation = repo
                .find_allocation(allocation_id)?
                .ok_or_else(|| ApiError::NotFound(format!("SalesOrderAllocation(id={})不存在", allocation_id)))?;
            let shipment = repo.get_shipment(allocation.shipment_id)?;
            if shipment.is_complete() {
                return Err(ApiError::validation(
                    "Allocation cannot be deleted after the shipment has been sent",
                ));
            }
            repo.delete_allocation(allocation_id)?;
            tracing::debug!(allocation_id, user, "销售分配已删除");
            Ok(())
        })
    }

    // ==========================================
    // 发货 / 完成 / 取消
    // ==========================================

    /// 完成发货单
    ///
    /// 每条分配: 部分数量先拆分 → 库存项转给客户 → 订单行 shipped 增加
    pub fn complete_shipment(
        &self,
        shipment_id: i64,
        data: CompleteShipment,
        user: &str,
    ) -> ApiResult<SalesOrderShipment> {
        let _perf = PerfGuard::new("complete_shipment");

        let shipment = self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let stock = StockRepository::new(tx);

            let mut shipment = repo.get_shipment(shipment_id)?;
            if shipment.is_complete() {
                return Err(ApiError::validation("Shipment has already been sent"));
            }
            let allocations = repo.list_allocations_for_shipment(shipment_id)?;
            if allocations.is_empty() {
                return Err(ApiError::validation("Shipment has no allocated stock items"));
            }
            let order = repo.get(shipment.order_id)?;
            if !order.is_open() {
                return Err(ApiError::validation("Shipments can only be sent for an open order"));
            }

            for mut allocation in allocations {
                let mut item = stock.get_item(allocation.item_id)?;
                if qty_gt(allocation.quantity, item.quantity) {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "Allocated quantity ({}) exceeds stock quantity ({}) for item {}",
                        allocation.quantity, item.quantity, item.id
                    )));
                }

                let mut shipped =
                    stock_ops::detach_quantity(tx, &mut item, allocation.quantity, user, &order.reference)?;
                shipped.customer_id = Some(order.customer_id);
                shipped.sales_order_id = Some(order.id);
                stock.update_item(&shipped)?;
                stock_ops::track(
                    tx,
                    shipped.id,
                    StockHistoryCode::ShippedAgainstSalesOrder,
                    user,
                    &order.reference,
                    Some(serde_json::json!({
                        "customer": order.customer_id,
                        "salesorder": order.id,
                    })),
                )?;

                let mut line = repo.get_line(allocation.line_id)?;
                line.shipped = round_qty(line.shipped + allocation.quantity);
                repo.update_line(&line)?;

                allocation.item_id = shipped.id;
                repo.update_allocation(&allocation)?;
            }

            shipment.shipment_date = Some(data.shipment_date.unwrap_or_else(today));
            shipment.checked_by = Some(user.to_string());
            shipment.tracking_number = data.tracking_number.clone();
            shipment.invoice_number = data.invoice_number.clone();
            shipment.link = data.link.clone();
            repo.update_shipment(&shipment)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CompleteShipment, user, "sales_order_shipment", Some(shipment_id))
                    .with_payload(&serde_json::json!({ "order_id": order.id })),
            )?;
            Ok(shipment)
        })?;

        tracing::info!(shipment_id, order_id = shipment.order_id, "发货单已完成");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::SHIPMENT_COMPLETED, shipment_id)
                .with_payload(serde_json::json!({ "order_id": shipment.order_id }))],
        );
        Ok(shipment)
    }

    pub fn complete_order(
        &self,
        order_id: i64,
        accept_incomplete: bool,
        user: &str,
    ) -> ApiResult<SalesOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            let lines = repo.list_lines(order_id)?;

            if lines.is_empty() {
                return Err(ApiError::validation(
                    "Order cannot be completed as no parts have been assigned",
                ));
            }
            if !order.is_open() {
                return Err(ApiError::validation("Only a pending order can be marked as complete"));
            }
            if repo.list_shipments(order_id)?.iter().any(|s| !s.is_complete()) {
                return Err(ApiError::validation(
                    "Order cannot be completed as there are incomplete shipments",
                ));
            }
            if !accept_incomplete && lines.iter().any(|l| !l.is_completed()) {
                return Err(ApiError::validation(
                    "Order cannot be completed as there are incomplete line items",
                ));
            }

            order.status = sales_order_transition(order.status, OrderAction::Complete)?;
            order.shipment_date = Some(today());
            order.shipped_by = Some(user.to_string());
            repo.update(&order)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CompleteSalesOrder, user, "sales_order", Some(order_id))
                    .with_payload(&serde_json::json!({ "accept_incomplete": accept_incomplete })),
            )?;
            Ok(order)
        })?;

        tracing::info!(order_id, "销售订单已完成");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::SALES_ORDER_COMPLETED, order_id)],
        );
        Ok(order)
    }

    /// 取消订单，释放所有未发货分配
    pub fn cancel_order(&self, order_id: i64, user: &str) -> ApiResult<SalesOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = SalesOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            order.status = sales_order_transition(order.status, OrderAction::Cancel)?;
            repo.update(&order)?;
            let released = repo.delete_pending_allocations_for_order(order_id)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CancelSalesOrder, user, "sales_order", Some(order_id))
                    .with_payload(&serde_json::json!({ "released_allocations": released })),
            )?;
            Ok::<_, ApiError>(order)
        })?;

        tracing::info!(order_id, "销售订单已取消");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::SALES_ORDER_CANCELLED, order_id)],
        );
        Ok(order)
    }
}

/// 事务内分配校验 + 写入
fn allocate_in_tx(
    conn: &Connection,
    settings: &OrderSettings,
    shipment_id: i64,
    requests: &[AllocationRequest],
) -> ApiResult<Vec<SalesOrderAllocation>> {
    if requests.is_empty() {
        return Err(ApiError::validation("Allocation items must be provided"));
    }

    let repo = SalesOrderRepository::new(conn);
    let stock = StockRepository::new(conn);

    let shipment = repo.get_shipment(shipment_id)?;
    if shipment.is_complete() {
        return Err(ApiError::field("shipment", "Shipment has already been shipped"));
    }
    let order = repo.get(shipment.order_id)?;
    if !order.is_open() {
        return Err(ApiError::field("shipment", "Stock can only be allocated to an open order"));
    }

    let today = today();
    let mut created = Vec::new();
    for request in requests {
        let line = repo.get_line(request.line_id)?;
        if line.order_id != order.id {
            return Err(ApiError::field("line_item", "Line item is not associated with this order"));
        }

        let item = stock.get_item(request.stock_item_id)?;
        if line.part_id != Some(item.part_id) {
            return Err(ApiError::field(
                "stock_item",
                "Cannot allocate stock item to a line with a different part",
            ));
        }
        if !item.in_stock() {
            return Err(ApiError::field("stock_item", "Item must be in stock"));
        }
        if settings.expired_blocks_sale(item.expiry_date, today) {
            return Err(ApiError::field("stock_item", "Expired stock items cannot be allocated"));
        }

        let quantity = round_qty(request.quantity);
        let available = stock_ops::unallocated_quantity(conn, &item)?;
        validate_stock_allocation(quantity, available, item.is_serialized())?;

        let mut allocation = SalesOrderAllocation {
            id: 0,
            line_id: line.id,
            shipment_id,
            item_id: item.id,
            quantity,
        };
        allocation.id = repo.insert_allocation(&allocation)?;

        let line_total = repo.line_allocated_total(line.id)?;
        if qty_gt(line_total, line.quantity) {
            tracing::warn!(
                line_id = line.id,
                allocated = line_total,
                required = line.quantity,
                "销售订单行超量分配"
            );
        }
        tracing::debug!(allocation_id = allocation.id, item_id = item.id, quantity, available, "销售分配");
        created.push(allocation);
    }
    Ok(created)
}
