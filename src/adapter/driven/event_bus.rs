use crate::domain::event::DomainEvent;
use crate::domain::event_bus::{EventHandler, HandlerError};
use crate::domain::port::{log_context, EventBus, EventBusError, Logger};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const COMPONENT: &str = "InMemoryEventBus";

/// イベントバス設定
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 最大試行回数
    pub max_attempts: u32,
    /// リトライ間隔
    pub retry_delay: Duration,
    /// ハンドラータイムアウト
    pub handler_timeout: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: Duration::from_millis(100),
            handler_timeout: Duration::from_secs(5),
        }
    }
}

/// インメモリイベントバス実装
/// 発行されたイベントを登録済みのハンドラーへ順番に配信する。
/// ハンドラーの失敗はログに記録し、発行元には伝えない
pub struct InMemoryEventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    config: EventBusConfig,
    logger: Arc<dyn Logger>,
}

impl InMemoryEventBus {
    /// 設定を指定してインメモリイベントバスを作成
    pub fn new(config: EventBusConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            config,
            logger,
        }
    }

    /// ハンドラーを登録
    /// 同じ名前のハンドラーは重複して登録できない
    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) -> Result<(), EventBusError> {
        let mut handlers = self.handlers.write().await;
        if handlers
            .iter()
            .any(|h| h.handler_name() == handler.handler_name())
        {
            return Err(EventBusError::SubscriptionFailed(format!(
                "Handler {} is already subscribed",
                handler.handler_name()
            )));
        }
        handlers.push(handler);
        Ok(())
    }

    /// 登録済みのハンドラー数
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// ハンドラーの実行（タイムアウトとリトライ付き）
    async fn execute_handler_with_retry(
        &self,
        handler: &dyn EventHandler,
        event: &DomainEvent,
    ) -> Result<(), HandlerError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = tokio::time::timeout(self.config.handler_timeout, handler.handle(event))
                .await
                .unwrap_or_else(|_| {
                    Err(HandlerError::ProcessingFailed("Handler timeout".to_string()))
                });

            match result {
                Ok(()) => return Ok(()),
                Err(error) if attempts >= self.config.max_attempts => return Err(error),
                Err(_) => tokio::time::sleep(self.config.retry_delay).await,
            }
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError> {
        // 配信中に登録処理を待たせないよう、対象ハンドラーを先に取り出す
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .await
            .iter()
            .filter(|h| h.can_handle(&event))
            .cloned()
            .collect();

        let correlation_id = event.metadata().correlation_id;
        self.logger.debug(
            COMPONENT,
            "Publishing event",
            Some(correlation_id),
            log_context([
                ("event_type", event.event_type().to_string()),
                ("event_id", event.metadata().event_id.to_string()),
                ("handlers", handlers.len().to_string()),
            ]),
        );

        for handler in handlers {
            if let Err(error) = self.execute_handler_with_retry(handler.as_ref(), &event).await {
                self.logger.error(
                    COMPONENT,
                    "Event handler failed",
                    Some(correlation_id),
                    log_context([
                        ("event_type", event.event_type().to_string()),
                        ("handler", handler.handler_name().to_string()),
                        ("error", error.to_string()),
                    ]),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::TracingLogger;
    use crate::domain::event::{PurchaseDeleted, SweetRestocked};
    use crate::domain::model::{PurchaseId, SweetId, UserId};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    // 呼び出し回数を数えるハンドラー
    struct CountingHandler {
        name: &'static str,
        calls: AtomicU32,
        fail: bool,
        slow: bool,
    }

    impl CountingHandler {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: AtomicU32::new(0),
                fail: false,
                slow: false,
            }
        }
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail {
                return Err(HandlerError::ProcessingFailed("boom".to_string()));
            }
            Ok(())
        }

        fn can_handle(&self, event: &DomainEvent) -> bool {
            matches!(event, DomainEvent::PurchaseDeleted(_))
        }

        fn handler_name(&self) -> &str {
            self.name
        }
    }

    fn bus() -> InMemoryEventBus {
        InMemoryEventBus::new(
            EventBusConfig {
                max_attempts: 2,
                retry_delay: Duration::from_millis(1),
                handler_timeout: Duration::from_millis(20),
            },
            Arc::new(TracingLogger::new()),
        )
    }

    fn purchase_deleted() -> DomainEvent {
        DomainEvent::PurchaseDeleted(PurchaseDeleted::new(
            PurchaseId::new(),
            UserId::new(),
            Uuid::new_v4(),
        ))
    }

    #[tokio::test]
    async fn test_publish_delivers_to_matching_handlers() {
        let bus = bus();
        let handler = Arc::new(CountingHandler::new("counting"));
        bus.subscribe(handler.clone()).await.unwrap();

        bus.publish(purchase_deleted()).await.unwrap();
        bus.publish(DomainEvent::SweetRestocked(SweetRestocked::new(
            SweetId::new(),
            1,
            1,
            Uuid::new_v4(),
        )))
        .await
        .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_subscription_is_rejected() {
        let bus = bus();
        bus.subscribe(Arc::new(CountingHandler::new("same"))).await.unwrap();
        let result = bus.subscribe(Arc::new(CountingHandler::new("same"))).await;
        assert!(matches!(result, Err(EventBusError::SubscriptionFailed(_))));
        assert_eq!(bus.handler_count().await, 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_retried_and_not_propagated() {
        let bus = bus();
        let failing = Arc::new(CountingHandler {
            fail: true,
            ..CountingHandler::new("failing")
        });
        let healthy = Arc::new(CountingHandler::new("healthy"));
        bus.subscribe(failing.clone()).await.unwrap();
        bus.subscribe(healthy.clone()).await.unwrap();

        assert!(bus.publish(purchase_deleted()).await.is_ok());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let bus = bus();
        let slow = Arc::new(CountingHandler {
            slow: true,
            ..CountingHandler::new("slow")
        });
        bus.subscribe(slow.clone()).await.unwrap();

        assert!(bus.publish(purchase_deleted()).await.is_ok());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
    }
}
