use crate::application::service::AccessControl;
use crate::application::ApplicationError;
use crate::domain::event::{DomainEvent, PurchaseDeleted, SweetPurchased};
use crate::domain::model::{PurchaseId, SweetId, UserId};
use crate::domain::port::{log_context, EventBus, Logger, PurchaseRepository};
use crate::domain::service::{PurchaseReceipt, PurchaseTransaction};
use std::sync::Arc;
use uuid::Uuid;

const COMPONENT: &str = "PurchaseApplicationService";

/// 購入アプリケーションサービス
/// 購入と購入記録の削除を行い、購入履歴の更新をイベントで通知する
pub struct PurchaseApplicationService {
    transaction: PurchaseTransaction,
    purchase_repository: Arc<dyn PurchaseRepository>,
    access_control: AccessControl,
    event_bus: Arc<dyn EventBus>,
    logger: Arc<dyn Logger>,
}

impl PurchaseApplicationService {
    /// 新しい購入アプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `transaction` - 購入トランザクション
    /// * `purchase_repository` - 購入記録リポジトリ
    /// * `access_control` - 権限チェック
    /// * `event_bus` - イベントバス
    /// * `logger` - ロガー
    pub fn new(
        transaction: PurchaseTransaction,
        purchase_repository: Arc<dyn PurchaseRepository>,
        access_control: AccessControl,
        event_bus: Arc<dyn EventBus>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            transaction,
            purchase_repository,
            access_control,
            event_bus,
            logger,
        }
    }

    /// 商品を購入
    ///
    /// # Arguments
    /// * `caller` - 購入者（未認証ならNone）
    /// * `sweet_id` - 商品ID
    /// * `quantity` - 購入数量（1以上）
    ///
    /// # Returns
    /// * `Ok(PurchaseReceipt)` - 作成された購入記録と減算後の商品
    /// * `Err(ApplicationError)` - 未認証、数量不正、在庫不足、商品が存在しない、または保存失敗
    pub async fn purchase(
        &self,
        caller: Option<UserId>,
        sweet_id: SweetId,
        quantity: i64,
    ) -> Result<PurchaseReceipt, ApplicationError> {
        let buyer_id = self.access_control.require_user(caller)?;
        if quantity <= 0 {
            return Err(ApplicationError::InvalidArgument(
                "購入数量は1以上である必要があります".to_string(),
            ));
        }
        // u32を超える数量はどの在庫数よりも多いため、在庫不足として扱われる
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let correlation_id = Uuid::new_v4();
        let receipt = match self
            .transaction
            .execute(sweet_id, quantity, buyer_id, correlation_id)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.logger.info(
                    COMPONENT,
                    "Purchase rejected",
                    Some(correlation_id),
                    log_context([
                        ("sweet_id", sweet_id.to_string()),
                        ("buyer_id", buyer_id.to_string()),
                        ("reason", e.to_string()),
                    ]),
                );
                // 一度保存された購入記録が履歴ビューに読み込まれている可能性があるため、
                // 購入記録の削除として通知してビューを読み込み直させる
                if let Some(purchase_id) = e.stored_purchase() {
                    self.publish(DomainEvent::PurchaseDeleted(PurchaseDeleted::new(
                        purchase_id,
                        buyer_id,
                        correlation_id,
                    )))
                    .await;
                }
                return Err(e.into());
            }
        };

        let purchase = &receipt.purchase;
        self.publish(DomainEvent::SweetPurchased(SweetPurchased::new(
            purchase.id(),
            buyer_id,
            sweet_id,
            purchase.quantity(),
            purchase.total_price(),
            receipt.sweet.quantity(),
            correlation_id,
        )))
        .await;

        Ok(receipt)
    }

    /// 自分の購入記録を削除
    ///
    /// # Returns
    /// * `Ok(())` - 削除成功
    /// * `Err(ApplicationError)` - 未認証、存在しない、他人の購入記録、または削除失敗
    pub async fn delete_purchase(
        &self,
        caller: Option<UserId>,
        purchase_id: PurchaseId,
    ) -> Result<(), ApplicationError> {
        let owner_id = self.access_control.require_user(caller)?;
        let not_found =
            || ApplicationError::NotFound(format!("購入記録が見つかりません: {}", purchase_id));

        let purchase = self
            .purchase_repository
            .find_by_id(purchase_id)
            .await?
            .ok_or_else(not_found)?;
        if !purchase.is_owned_by(owner_id) {
            return Err(ApplicationError::PermissionDenied(
                "他の利用者の購入記録は削除できません".to_string(),
            ));
        }

        // 所有者を条件に含めて削除する
        if !self
            .purchase_repository
            .delete_owned(purchase_id, owner_id)
            .await?
        {
            return Err(not_found());
        }

        let correlation_id = Uuid::new_v4();
        self.logger.info(
            COMPONENT,
            "Purchase deleted",
            Some(correlation_id),
            log_context([
                ("purchase_id", purchase_id.to_string()),
                ("owner_id", owner_id.to_string()),
            ]),
        );
        self.publish(DomainEvent::PurchaseDeleted(PurchaseDeleted::new(
            purchase_id,
            owner_id,
            correlation_id,
        )))
        .await;

        Ok(())
    }

    // イベント発行の失敗は警告ログのみ（購入処理の結果は変えない）
    async fn publish(&self, event: DomainEvent) {
        let correlation_id = event.metadata().correlation_id;
        let event_type = event.event_type();
        if let Err(e) = self.event_bus.publish(event).await {
            self.logger.warn(
                COMPONENT,
                "Event publishing failed",
                Some(correlation_id),
                log_context([
                    ("event_type", event_type.to_string()),
                    ("error", e.to_string()),
                ]),
            );
        }
    }
}
