// ==========================================
// MRP 订单系统 - 订单事件发布
// ==========================================
// 职责: 定义订单事件发布 trait，API 层在事务提交后发布
// 实现:
// - NoOpEventPublisher: 丢弃
// - RecordingEventPublisher: 内存记录（测试）
// - ChannelEventPublisher + EventDispatcher: tokio 通道异步分发
// ==========================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// 事件名称
pub mod event_names {
    pub const PURCHASE_ORDER_PLACED: &str = "purchaseorder.placed";
    pub const PURCHASE_ORDER_COMPLETED: &str = "purchaseorder.completed";
    pub const PURCHASE_ORDER_CANCELLED: &str = "purchaseorder.cancelled";
    pub const PURCHASE_ORDER_RECEIVED: &str = "purchaseorder.received";

    pub const SALES_ORDER_ISSUED: &str = "salesorder.issued";
    pub const SALES_ORDER_COMPLETED: &str = "salesorder.completed";
    pub const SALES_ORDER_CANCELLED: &str = "salesorder.cancelled";
    pub const SHIPMENT_COMPLETED: &str = "salesordershipment.completed";

    pub const BUILD_ISSUED: &str = "build.issued";
    pub const BUILD_COMPLETED: &str = "build.completed";
    pub const BUILD_CANCELLED: &str = "build.cancelled";
    pub const BUILD_OUTPUT_COMPLETED: &str = "build.output_completed";
}

// ==========================================
// 订单事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: String,
    pub name: String,
    pub entity_id: i64,
    pub payload: JsonValue,
    pub occurred_at: NaiveDateTime,
}

impl OrderEvent {
    pub fn new(name: &str, entity_id: i64) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            entity_id,
            payload: JsonValue::Null,
            occurred_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 订单事件发布者
///
/// 发布失败只记录告警，不影响已提交的业务数据
pub trait OrderEventPublisher: Send + Sync {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl OrderEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - name={}, entity_id={}",
            event.name,
            event.entity_id
        );
        Ok(())
    }
}

/// 内存记录发布者
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl OrderEventPublisher for RecordingEventPublisher {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        events.push(event);
        Ok(())
    }
}

/// 通道发布者：事件写入 tokio 无界通道，由 EventDispatcher 消费
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::UnboundedSender<OrderEvent>,
}

impl ChannelEventPublisher {
    /// 创建发布者与配套分发器
    pub fn channel() -> (Self, EventDispatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, EventDispatcher::new(receiver))
    }
}

impl OrderEventPublisher for ChannelEventPublisher {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sender
            .send(event)
            .map_err(|e| format!("事件通道已关闭: {}", e.0.name))?;
        Ok(())
    }
}

// ==========================================
// 事件分发
// ==========================================

/// 订单事件处理器
#[async_trait]
pub trait OrderEventHandler: Send + Sync {
    /// 处理器名称（日志用）
    fn name(&self) -> &str;

    /// 是否关心该事件（默认全部）
    fn accepts(&self, _event: &OrderEvent) -> bool {
        true
    }

    async fn handle(&self, event: &OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 事件分发器：逐个取出事件，并发交给所有关心它的处理器
pub struct EventDispatcher {
    receiver: mpsc::UnboundedReceiver<OrderEvent>,
    handlers: Vec<Arc<dyn OrderEventHandler>>,
}

impl EventDispatcher {
    fn new(receiver: mpsc::UnboundedReceiver<OrderEvent>) -> Self {
        Self {
            receiver,
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn OrderEventHandler>) {
        self.handlers.push(handler);
    }

    /// 分发单个事件，返回失败的处理器数量
    pub async fn dispatch(&self, event: &OrderEvent) -> usize {
        let futures = self
            .handlers
            .iter()
            .filter(|h| h.accepts(event))
            .map(|h| async move { (h.name().to_string(), h.handle(event).await) });

        let results = futures::future::join_all(futures).await;

        let mut failed = 0;
        for (handler, result) in results {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(
                    handler = %handler,
                    event = %event.name,
                    entity_id = event.entity_id,
                    "事件处理失败: {}",
                    e
                );
            }
        }
        failed
    }

    /// 运行直到所有发布者被丢弃，返回已处理事件数
    pub async fn run(mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(&event).await;
            processed += 1;
        }
        tracing::info!(processed, "事件分发器退出");
        processed
    }
}

/// 发布事件，失败仅告警
pub fn publish_or_warn(publisher: &dyn OrderEventPublisher, event: OrderEvent) {
    let name = event.name.clone();
    if let Err(e) = publisher.publish(event) {
        tracing::warn!(event = %name, "事件发布失败: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: AtomicUsize,
        only: Option<&'static str>,
    }

    #[async_trait]
    impl OrderEventHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        fn accepts(&self, event: &OrderEvent) -> bool {
            self.only.map(|n| n == event.name).unwrap_or(true)
        }

        async fn handle(&self, _event: &OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl OrderEventHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _event: &OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("boom".into())
        }
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let result = publisher.publish(OrderEvent::new(event_names::BUILD_ISSUED, 1));
        assert!(result.is_ok());
    }

    #[test]
    fn test_recording_publisher() {
        let publisher = RecordingEventPublisher::new();
        publish_or_warn(&publisher, OrderEvent::new(event_names::PURCHASE_ORDER_PLACED, 3));
        publish_or_warn(
            &publisher,
            OrderEvent::new(event_names::PURCHASE_ORDER_RECEIVED, 3)
                .with_payload(serde_json::json!({"lines": 2})),
        );

        assert_eq!(
            publisher.names(),
            vec!["purchaseorder.placed", "purchaseorder.received"]
        );
        assert_eq!(publisher.events()[1].payload["lines"], 2);

        publisher.clear();
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_channel_dispatch_fans_out() {
        let (publisher, mut dispatcher) = ChannelEventPublisher::channel();
        let all = Arc::new(CountingHandler {
            count: AtomicUsize::new(0),
            only: None,
        });
        let builds_only = Arc::new(CountingHandler {
            count: AtomicUsize::new(0),
            only: Some(event_names::BUILD_COMPLETED),
        });
        dispatcher.register(all.clone());
        dispatcher.register(builds_only.clone());
        dispatcher.register(Arc::new(FailingHandler));

        publisher
            .publish(OrderEvent::new(event_names::BUILD_COMPLETED, 1))
            .unwrap();
        publisher
            .publish(OrderEvent::new(event_names::SALES_ORDER_ISSUED, 2))
            .unwrap();
        drop(publisher);

        let processed = dispatcher.run().await;
        assert_eq!(processed, 2);
        assert_eq!(all.count.load(Ordering::SeqCst), 2);
        assert_eq!(builds_only.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_reports_failures() {
        let (_publisher, mut dispatcher) = ChannelEventPublisher::channel();
        dispatcher.register(Arc::new(FailingHandler));
        let failed = dispatcher
            .dispatch(&OrderEvent::new(event_names::BUILD_CANCELLED, 9))
            .await;
        assert_eq!(failed, 1);
    }
}
