use crate::application::service::PurchaseHistoryQueryService;
use crate::domain::event::DomainEvent;
use crate::domain::event_bus::{EventHandler, HandlerError};
use crate::domain::port::{log_context, Logger};
use async_trait::async_trait;
use std::sync::Arc;

const HANDLER_NAME: &str = "PurchaseHistoryRefresher";

/// 購入履歴リフレッシュハンドラー
/// 購入・購入記録削除で購入者のビューを読み込み直し、
/// カタログ変更ですべてのビューを無効化する
pub struct PurchaseHistoryRefresher {
    history: Arc<PurchaseHistoryQueryService>,
    logger: Arc<dyn Logger>,
}

impl PurchaseHistoryRefresher {
    pub fn new(history: Arc<PurchaseHistoryQueryService>, logger: Arc<dyn Logger>) -> Self {
        Self { history, logger }
    }
}

#[async_trait]
impl EventHandler for PurchaseHistoryRefresher {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let user_id = match event {
            DomainEvent::SweetPurchased(e) => e.buyer_id,
            DomainEvent::PurchaseDeleted(e) => e.owner_id,
            DomainEvent::CatalogChanged(_) => {
                self.history.invalidate_all().await;
                return Ok(());
            }
            DomainEvent::SweetRestocked(_) => return Ok(()),
        };

        self.logger.debug(
            HANDLER_NAME,
            "Refreshing purchase history view",
            Some(event.metadata().correlation_id),
            log_context([
                ("event_type", event.event_type().to_string()),
                ("user_id", user_id.to_string()),
            ]),
        );
        self.history
            .refresh(user_id)
            .await
            .map_err(|e| HandlerError::RepositoryError(format!("購入履歴の再読み込みに失敗: {}", e)))
    }

    fn can_handle(&self, event: &DomainEvent) -> bool {
        !matches!(event, DomainEvent::SweetRestocked(_))
    }

    fn handler_name(&self) -> &str {
        HANDLER_NAME
    }
}
