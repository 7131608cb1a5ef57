// ==========================================
// MRP 订单系统 - 采购订单 API
// ==========================================
// 职责: 采购订单创建、下单、收货、完成、取消
// 红线:
// - 状态只经由 engine::transitions 变更
// - 每个操作在单个事务内完成，事件在提交后发布
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::common::{
    duplicate_reference, load_settings, log_action, publish_all, resolve_reference, today,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::stock_ops;
use crate::config::OrderSettingsReader;
use crate::db::Database;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::purchase_order::{OrderExtraLine, PurchaseOrder, PurchaseOrderLineItem};
use crate::domain::stock::StockItem;
use crate::domain::types::{PurchaseOrderStatus, StockHistoryCode, StockStatus};
use crate::engine::events::{event_names, OrderEvent, OrderEventPublisher};
use crate::engine::quantity::{is_integer_qty, is_positive, qty_gt, round_qty};
use crate::engine::serial::extract_serial_numbers;
use crate::engine::transitions::{ensure_line_editable, purchase_order_transition, OrderAction};
use crate::perf::PerfGuard;
use crate::repository::{CompanyRepository, PartRepository, PurchaseOrderRepository, StockRepository};

// ==========================================
// 请求 / 响应结构
// ==========================================

/// 新建采购订单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub reference: Option<String>, // 为空时按编号模式生成
    pub supplier_id: i64,
    pub description: String,
    pub supplier_reference: String,
    pub currency: Option<String>, // 为空时取供应商默认币种
    pub target_date: Option<NaiveDate>,
    pub responsible: Option<String>,
    pub notes: String,
}

/// 新增采购订单行
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPurchaseLine {
    pub supplier_part_id: i64,
    pub quantity: f64,
    /// 同一供应商零件已有行时合并数量
    pub group: bool,
    pub reference: String,
    pub purchase_price: Option<f64>,
    pub destination_id: Option<i64>,
    pub target_date: Option<NaiveDate>,
    pub notes: String,
}

/// 收货行
///
/// quantity 以采购单位计，入库数量 = quantity × pack_size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveLine {
    pub line_id: i64,
    pub quantity: f64,
    pub location_id: Option<i64>,
    pub status: StockStatus,
    pub batch: String,
    pub serials: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl ReceiveLine {
    pub fn new(line_id: i64, quantity: f64) -> Self {
        Self {
            line_id,
            quantity,
            location_id: None,
            status: StockStatus::Ok,
            batch: String::new(),
            serials: None,
            expiry_date: None,
        }
    }
}

/// 订单行汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSummary {
    pub line_count: usize,
    pub completed: usize,
    pub pending: usize,
    pub is_complete: bool, // 有行且无待收货行
}

impl LineSummary {
    fn from_lines(lines: &[PurchaseOrderLineItem]) -> Self {
        let completed = lines.iter().filter(|l| l.is_completed()).count();
        let pending = lines.len() - completed;
        Self {
            line_count: lines.len(),
            completed,
            pending,
            is_complete: !lines.is_empty() && pending == 0,
        }
    }
}

// ==========================================
// PurchaseOrderApi - 采购订单 API
// ==========================================
pub struct PurchaseOrderApi {
    db: Database,
    settings: Arc<dyn OrderSettingsReader>,
    events: Arc<dyn OrderEventPublisher>,
}

impl PurchaseOrderApi {
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

    pub fn get_order(&self, order_id: i64) -> ApiResult<PurchaseOrder> {
        self.db
            .with_conn(|conn| Ok(PurchaseOrderRepository::new(conn).get(order_id)?))
    }

    pub fn list_orders(
        &self,
        statuses: Option<&[PurchaseOrderStatus]>,
    ) -> ApiResult<Vec<PurchaseOrder>> {
        self.db
            .with_conn(|conn| Ok(PurchaseOrderRepository::new(conn).list(statuses)?))
    }

    pub fn list_lines(&self, order_id: i64) -> ApiResult<Vec<PurchaseOrderLineItem>> {
        self.db
            .with_conn(|conn| Ok(PurchaseOrderRepository::new(conn).list_lines(order_id)?))
    }

    pub fn list_extra_lines(&self, order_id: i64) -> ApiResult<Vec<OrderExtraLine>> {
        self.db.with_conn(|conn| {
            Ok(PurchaseOrderRepository::new(conn).list_extra_lines(order_id)?)
        })
    }

    /// 逾期订单（未关闭且目标日期 <= today）
    pub fn list_overdue(&self, today: NaiveDate) -> ApiResult<Vec<PurchaseOrder>> {
        let orders = self.list_orders(Some(&PurchaseOrderStatus::OPEN))?;
        Ok(orders.into_iter().filter(|o| o.is_overdue(today)).collect())
    }

    pub fn line_summary(&self, order_id: i64) -> ApiResult<LineSummary> {
        self.db.with_conn(|conn| {
            let repo = PurchaseOrderRepository::new(conn);
            repo.get(order_id)?;
            Ok(LineSummary::from_lines(&repo.list_lines(order_id)?))
        })
    }

    /// 订单总价: 行 + 附加行中有单价者 Σ quantity × price（单一币种）
    pub fn total_price(&self, order_id: i64) -> ApiResult<f64> {
        self.db.with_conn(|conn| {
            let repo = PurchaseOrderRepository::new(conn);
            repo.get(order_id)?;
            let lines: f64 = repo
                .list_lines(order_id)?
                .iter()
                .filter_map(|l| l.purchase_price.map(|p| p * l.quantity))
                .sum();
            let extras: f64 = repo
                .list_extra_lines(order_id)?
                .iter()
                .filter_map(|l| l.price.map(|p| p * l.quantity))
                .sum();
            Ok(round_qty(lines + extras))
        })
    }

    // ==========================================
    // 创建 / 编辑
    // ==========================================

    pub fn create_order(&self, new: NewPurchaseOrder, user: &str) -> ApiResult<PurchaseOrder> {
        let _perf = PerfGuard::new("create_purchase_order");
        let settings = load_settings(self.settings.as_ref())?;

        self.db.with_transaction(|tx| {
            let supplier = CompanyRepository::new(tx).get(new.supplier_id)?;
            if !supplier.is_supplier {
                return Err(ApiError::field(
                    "supplier",
                    format!("Company '{}' is not a supplier", supplier.name),
                ));
            }

            let repo = PurchaseOrderRepository::new(tx);
            let (reference, reference_int) = resolve_reference(
                new.reference.as_deref(),
                &settings.purchase_order_reference_pattern,
                repo.max_reference_int()?,
            )?;
            if repo.find_by_reference(&reference)?.is_some() {
                return Err(duplicate_reference(&reference));
            }

            let mut order = PurchaseOrder {
                id: 0,
                reference,
                reference_int,
                description: new.description.clone(),
                supplier_id: supplier.id,
                supplier_reference: new.supplier_reference.clone(),
                currency: new.currency.clone().unwrap_or(supplier.currency),
                status: PurchaseOrderStatus::Pending,
                creation_date: today(),
                issue_date: None,
                target_date: new.target_date,
                complete_date: None,
                created_by: Some(user.to_string()),
                received_by: None,
                responsible: new.responsible.clone(),
                notes: new.notes.clone(),
            };
            order.id = repo.insert(&order)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CreatePurchaseOrder, user, "purchase_order", Some(order.id))
                    .with_payload(&serde_json::json!({ "reference": order.reference })),
            )?;
            tracing::info!(order_id = order.id, reference = %order.reference, "采购订单已创建");
            Ok(order)
        })
    }

    /// 添加订单行
    ///
    /// group = true 且已有同一供应商零件的行时，合并到该行
    pub fn add_line_item(
        &self,
        order_id: i64,
        new: NewPurchaseLine,
        user: &str,
    ) -> ApiResult<PurchaseOrderLineItem> {
        let settings = load_settings(self.settings.as_ref())?;
        let quantity = round_qty(new.quantity);
        if !is_positive(quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }

        self.db.with_transaction(|tx| {
            let repo = PurchaseOrderRepository::new(tx);
            let order = repo.get(order_id)?;
            ensure_line_editable(order.is_open(), settings.purchase_order_edit_completed)?;

            let sp = CompanyRepository::new(tx).get_supplier_part(new.supplier_part_id)?;
            if sp.supplier_id != order.supplier_id {
                return Err(ApiError::field("supplier", "Part supplier must match PO supplier"));
            }
            if let Some(loc) = new.destination_id {
                StockRepository::new(tx).get_location(loc)?;
            }

            if new.group {
                let existing = repo
                    .list_lines(order_id)?
                    .into_iter()
                    .find(|l| l.supplier_part_id == Some(sp.id));
                if let Some(mut line) = existing {
                    line.quantity = round_qty(line.quantity + quantity);
                    repo.update_line(&line)?;
                    tracing::debug!(line_id = line.id, quantity = line.quantity, "合并采购订单行");
                    return Ok(line);
                }
            }

            let mut line = PurchaseOrderLineItem {
                id: 0,
                order_id,
                supplier_part_id: Some(sp.id),
                quantity,
                received: 0.0,
                purchase_price: new.purchase_price,
                reference: new.reference.clone(),
                notes: new.notes.clone(),
                target_date: new.target_date,
                destination_id: new.destination_id,
            };
            line.id = repo.insert_line(&line)?;
            tracing::debug!(order_id, line_id = line.id, user, "采购订单行已添加");
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
            let repo = PurchaseOrderRepository::new(tx);
            let order = repo.get(order_id)?;
            ensure_line_editable(order.is_open(), settings.purchase_order_edit_completed)?;

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

    // ==========================================
    // 状态流转
    // ==========================================

    /// 下单: Pending → Placed
    pub fn place_order(&self, order_id: i64, user: &str) -> ApiResult<PurchaseOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = PurchaseOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            order.status = purchase_order_transition(order.status, OrderAction::Place)?;
            order.issue_date = Some(today());
            repo.update(&order)?;

            log_action(
                tx,
                ActionLog::new(ActionType::PlacePurchaseOrder, user, "purchase_order", Some(order_id)),
            )?;
            Ok::<_, ApiError>(order)
        })?;

        tracing::info!(order_id, reference = %order.reference, "采购订单已下单");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::PURCHASE_ORDER_PLACED, order_id)],
        );
        Ok(order)
    }

    /// 完成订单
    ///
    /// accept_incomplete = false 时所有行必须已收齐
    pub fn complete_order(
        &self,
        order_id: i64,
        accept_incomplete: bool,
        user: &str,
    ) -> ApiResult<PurchaseOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = PurchaseOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            let status = purchase_order_transition(order.status, OrderAction::Complete)?;

            if !accept_incomplete && repo.list_lines(order_id)?.iter().any(|l| !l.is_completed()) {
                return Err(ApiError::validation("Order has incomplete line items"));
            }

            order.status = status;
            order.complete_date = Some(today());
            order.received_by = Some(user.to_string());
            repo.update(&order)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CompletePurchaseOrder, user, "purchase_order", Some(order_id))
                    .with_payload(&serde_json::json!({ "accept_incomplete": accept_incomplete })),
            )?;
            Ok(order)
        })?;

        tracing::info!(order_id, "采购订单已完成");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::PURCHASE_ORDER_COMPLETED, order_id)],
        );
        Ok(order)
    }

    pub fn cancel_order(&self, order_id: i64, user: &str) -> ApiResult<PurchaseOrder> {
        let order = self.db.with_transaction(|tx| {
            let repo = PurchaseOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            order.status = purchase_order_transition(order.status, OrderAction::Cancel)?;
            repo.update(&order)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CancelPurchaseOrder, user, "purchase_order", Some(order_id)),
            )?;
            Ok::<_, ApiError>(order)
        })?;

        tracing::info!(order_id, "采购订单已取消");
        publish_all(
            self.events.as_ref(),
            vec![OrderEvent::new(event_names::PURCHASE_ORDER_CANCELLED, order_id)],
        );
        Ok(order)
    }

    // ==========================================
    // 收货
    // ==========================================

    /// 按行收货，返回新建的库存项
    ///
    /// 全部行收齐后订单自动完成（received_by = user）
    pub fn receive_line_items(
        &self,
        order_id: i64,
        lines: Vec<ReceiveLine>,
        user: &str,
    ) -> ApiResult<Vec<StockItem>> {
        let _perf = PerfGuard::new("receive_line_items");
        if lines.is_empty() {
            return Err(ApiError::validation("Line items must be provided"));
        }

        let (items, completed) = self.db.with_transaction(|tx| {
            let repo = PurchaseOrderRepository::new(tx);
            let mut order = repo.get(order_id)?;
            if order.status != PurchaseOrderStatus::Placed {
                return Err(ApiError::validation(
                    "Lines can only be received against an order marked as 'PLACED'",
                ));
            }

            let mut created = Vec::new();
            for receive in &lines {
                created.extend(self.receive_one(tx, &order, receive, user)?);
            }

            // 全部行收齐 → 自动完成
            let summary = LineSummary::from_lines(&repo.list_lines(order_id)?);
            let completed = summary.is_complete;
            if completed {
                order.status = purchase_order_transition(order.status, OrderAction::Complete)?;
                order.complete_date = Some(today());
                order.received_by = Some(user.to_string());
                repo.update(&order)?;
            }

            log_action(
                tx,
                ActionLog::new(ActionType::ReceivePurchaseOrder, user, "purchase_order", Some(order_id))
                    .with_payload(&serde_json::json!({
                        "lines": lines.iter().map(|l| l.line_id).collect::<Vec<_>>(),
                        "items": created.iter().map(|i: &StockItem| i.id).collect::<Vec<_>>(),
                        "completed": completed,
                    })),
            )?;
            Ok((created, completed))
        })?;

        tracing::info!(order_id, items = items.len(), completed, "采购订单收货");
        let mut events = vec![OrderEvent::new(event_names::PURCHASE_ORDER_RECEIVED, order_id)
            .with_payload(serde_json::json!({ "items": items.len() }))];
        if completed {
            events.push(OrderEvent::new(event_names::PURCHASE_ORDER_COMPLETED, order_id));
        }
        publish_all(self.events.as_ref(), events);
        Ok(items)
    }

    fn receive_one(
        &self,
        tx: &rusqlite::Connection,
        order: &PurchaseOrder,
        receive: &ReceiveLine,
        user: &str,
    ) -> ApiResult<Vec<StockItem>> {
        let repo = PurchaseOrderRepository::new(tx);
        let stock = StockRepository::new(tx);

        let mut line = repo.get_line(receive.line_id)?;
        if line.order_id != order.id {
            return Err(ApiError::field("line_item", "Line item does not match purchase order"));
        }
        let quantity = round_qty(receive.quantity);
        if !is_positive(quantity) {
            return Err(ApiError::field("quantity", "Quantity must be greater than zero"));
        }
        let sp_id = line
            .supplier_part_id
            .ok_or_else(|| ApiError::field("line_item", "Line item has no supplier part"))?;
        let sp = CompanyRepository::new(tx).get_supplier_part(sp_id)?;
        let part = PartRepository::new(tx).get(sp.part_id)?;

        let stock_quantity = round_qty(sp.stock_quantity(quantity));
        if part.trackable && !is_integer_qty(stock_quantity) {
            return Err(ApiError::field(
                "quantity",
                "An integer quantity must be provided for trackable parts",
            ));
        }

        let location_id = receive
            .location_id
            .or(line.destination_id)
            .or(part.default_location_id);
        if let Some(loc) = location_id {
            stock.get_location(loc)?;
        }

        let serials = match receive.serials.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => {
                if !part.trackable {
                    return Err(ApiError::field(
                        "serials",
                        "Serial numbers can only be assigned to trackable parts",
                    ));
                }
                let next = stock.max_serial_int(part.id)?.unwrap_or(0) + 1;
                let serials = extract_serial_numbers(text, stock_quantity, next)?;
                let mut existing = Vec::new();
                for s in &serials {
                    if stock.find_by_serial(part.id, &s.to_string())?.is_some() {
                        existing.push(s.to_string());
                    }
                }
                if !existing.is_empty() {
                    return Err(ApiError::field(
                        "serials",
                        format!("Serial numbers already exist: {}", existing.join(", ")),
                    ));
                }
                serials
            }
            None => Vec::new(),
        };

        let template = {
            let mut item = StockItem::new(part.id, stock_quantity);
            item.supplier_part_id = Some(sp.id);
            item.location_id = location_id;
            item.batch = receive.batch.clone();
            item.status = receive.status;
            item.purchase_order_id = Some(order.id);
            item.purchase_price = line.purchase_price.map(|p| round_qty(p / sp.pack_size));
            item.expiry_date = receive.expiry_date;
            item
        };

        let mut batch: Vec<StockItem> = Vec::new();
        if serials.is_empty() {
            batch.push(template);
        } else {
            for serial in &serials {
                let mut item = template.clone();
                item.quantity = 1.0;
                item.serial = Some(serial.to_string());
                item.serial_int = Some(*serial);
                batch.push(item);
            }
        }

        let deltas = serde_json::json!({
            "status": receive.status.code(),
            "purchaseorder": order.id,
        });
        for item in batch.iter_mut() {
            item.id = stock.insert_item(item)?;
            stock_ops::track(
                tx,
                item.id,
                StockHistoryCode::ReceivedAgainstPurchaseOrder,
                user,
                &order.reference,
                Some(deltas.clone()),
            )?;
        }

        line.received = round_qty(line.received + quantity);
        if qty_gt(line.received, line.quantity) {
            tracing::warn!(line_id = line.id, received = line.received, quantity = line.quantity, "超量收货");
        }
        repo.update_line(&line)?;

        tracing::debug!(
            line_id = line.id,
            quantity,
            stock_quantity,
            items = batch.len(),
            "采购订单行收货"
        );
        Ok(batch)
    }
}
