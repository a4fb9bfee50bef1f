use crate::application::service::AccessControl;
use crate::application::ApplicationError;
use crate::domain::event::{CatalogChange, CatalogChanged, DomainEvent, SweetRestocked};
use crate::domain::model::{sample_catalog, NewSweet, Sweet, SweetId, SweetPatch, UserId};
use crate::domain::port::{log_context, EventBus, Logger, SweetRepository};
use std::sync::Arc;
use uuid::Uuid;

const COMPONENT: &str = "InventoryAdminService";

/// 在庫管理アプリケーションサービス
/// 商品の作成・更新・削除と在庫補充を行う。すべて管理者のみ実行可能
pub struct InventoryAdminService {
    sweet_repository: Arc<dyn SweetRepository>,
    access_control: AccessControl,
    event_bus: Arc<dyn EventBus>,
    logger: Arc<dyn Logger>,
}

impl InventoryAdminService {
    /// 新しい在庫管理サービスを作成
    ///
    /// # Arguments
    /// * `sweet_repository` - 商品リポジトリ
    /// * `access_control` - 権限チェック
    /// * `event_bus` - イベントバス
    /// * `logger` - ロガー
    pub fn new(
        sweet_repository: Arc<dyn SweetRepository>,
        access_control: AccessControl,
        event_bus: Arc<dyn EventBus>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            sweet_repository,
            access_control,
            event_bus,
            logger,
        }
    }

    /// 商品を登録
    ///
    /// # Arguments
    /// * `caller` - 呼び出し元の利用者（未認証ならNone）
    /// * `input` - 商品の入力値
    ///
    /// # Returns
    /// * `Ok(Sweet)` - 登録された商品
    /// * `Err(ApplicationError)` - 権限不足、検証失敗、または保存失敗
    pub async fn create(
        &self,
        caller: Option<UserId>,
        input: NewSweet,
    ) -> Result<Sweet, ApplicationError> {
        let admin = self.access_control.require_admin(caller).await?;
        let correlation_id = Uuid::new_v4();

        let sweet = Sweet::create(SweetId::new(), input)?;
        self.sweet_repository.insert(&sweet).await?;

        self.logger.info(
            COMPONENT,
            "Sweet created",
            Some(correlation_id),
            log_context([
                ("sweet_id", sweet.id().to_string()),
                ("admin_id", admin.to_string()),
            ]),
        );
        self.publish(DomainEvent::CatalogChanged(CatalogChanged::new(
            sweet.id(),
            CatalogChange::Created,
            correlation_id,
        )))
        .await;

        Ok(sweet)
    }

    /// 商品を部分更新
    /// 指定されたフィールドのみを書き換える（在庫数を含まない更新は購入による減算と競合しない）
    ///
    /// # Arguments
    /// * `caller` - 呼び出し元の利用者
    /// * `id` - 商品ID
    /// * `patch` - 変更するフィールド
    ///
    /// # Returns
    /// * `Ok(Sweet)` - 更新後の商品
    /// * `Err(ApplicationError)` - 権限不足、検証失敗、商品が存在しない、または保存失敗
    pub async fn update(
        &self,
        caller: Option<UserId>,
        id: SweetId,
        patch: SweetPatch,
    ) -> Result<Sweet, ApplicationError> {
        let admin = self.access_control.require_admin(caller).await?;
        let changes = patch.validate()?;

        let not_found = || ApplicationError::NotFound(format!("商品が見つかりません: {}", id));
        if changes.is_empty() {
            return self.sweet_repository.find_by_id(id).await?.ok_or_else(not_found);
        }

        let correlation_id = Uuid::new_v4();
        let sweet = self
            .sweet_repository
            .update(id, &changes)
            .await?
            .ok_or_else(not_found)?;

        self.logger.info(
            COMPONENT,
            "Sweet updated",
            Some(correlation_id),
            log_context([
                ("sweet_id", id.to_string()),
                ("admin_id", admin.to_string()),
            ]),
        );
        self.publish(DomainEvent::CatalogChanged(CatalogChanged::new(
            id,
            CatalogChange::Updated,
            correlation_id,
        )))
        .await;

        Ok(sweet)
    }

    /// 商品を削除
    /// 購入記録は削除しない（購入履歴では代替表示になる）
    pub async fn delete(&self, caller: Option<UserId>, id: SweetId) -> Result<(), ApplicationError> {
        let admin = self.access_control.require_admin(caller).await?;
        let correlation_id = Uuid::new_v4();

        if !self.sweet_repository.delete(id).await? {
            return Err(ApplicationError::NotFound(format!(
                "商品が見つかりません: {}",
                id
            )));
        }

        self.logger.info(
            COMPONENT,
            "Sweet deleted",
            Some(correlation_id),
            log_context([
                ("sweet_id", id.to_string()),
                ("admin_id", admin.to_string()),
            ]),
        );
        self.publish(DomainEvent::CatalogChanged(CatalogChanged::new(
            id,
            CatalogChange::Deleted,
            correlation_id,
        )))
        .await;

        Ok(())
    }

    /// 在庫を補充する
    /// 補充はストレージ上の原子的な加算で行うため、同時に補充しても加算が失われない
    ///
    /// # Arguments
    /// * `caller` - 呼び出し元の利用者
    /// * `id` - 商品ID
    /// * `delta` - 補充数（1以上）
    ///
    /// # Returns
    /// * `Ok(Sweet)` - 補充後の商品
    /// * `Err(ApplicationError)` - 権限不足、補充数が不正、商品が存在しない、または保存失敗
    pub async fn restock(
        &self,
        caller: Option<UserId>,
        id: SweetId,
        delta: i64,
    ) -> Result<Sweet, ApplicationError> {
        let admin = self.access_control.require_admin(caller).await?;
        if delta <= 0 {
            return Err(ApplicationError::InvalidArgument(
                "補充数は1以上である必要があります".to_string(),
            ));
        }
        let delta = u32::try_from(delta).map_err(|_| {
            ApplicationError::InvalidArgument("補充数が上限を超えています".to_string())
        })?;

        let correlation_id = Uuid::new_v4();
        let sweet = self
            .sweet_repository
            .increment_quantity(id, delta)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("商品が見つかりません: {}", id)))?;

        self.logger.info(
            COMPONENT,
            "Sweet restocked",
            Some(correlation_id),
            log_context([
                ("sweet_id", id.to_string()),
                ("delta", delta.to_string()),
                ("new_quantity", sweet.quantity().to_string()),
                ("admin_id", admin.to_string()),
            ]),
        );
        self.publish(DomainEvent::SweetRestocked(SweetRestocked::new(
            id,
            delta,
            sweet.quantity(),
            correlation_id,
        )))
        .await;

        Ok(sweet)
    }

    /// カタログが空の場合にサンプル商品を登録する
    ///
    /// # Returns
    /// * `Ok(usize)` - 登録した商品数（カタログが空でなければ0）
    pub async fn seed_sample_catalog(&self, caller: Option<UserId>) -> Result<usize, ApplicationError> {
        self.access_control.require_admin(caller).await?;
        self.seed_if_empty().await
    }

    /// 起動時の初期データ投入用（権限チェックなし）
    pub async fn seed_if_empty(&self) -> Result<usize, ApplicationError> {
        if self.sweet_repository.count().await? > 0 {
            return Ok(0);
        }

        let correlation_id = Uuid::new_v4();
        let mut inserted = 0;
        for input in sample_catalog() {
            let sweet = Sweet::create(SweetId::new(), input)?;
            self.sweet_repository.insert(&sweet).await?;
            self.publish(DomainEvent::CatalogChanged(CatalogChanged::new(
                sweet.id(),
                CatalogChange::Created,
                correlation_id,
            )))
            .await;
            inserted += 1;
        }

        self.logger.info(
            COMPONENT,
            "Sample catalog seeded",
            Some(correlation_id),
            log_context([("inserted", inserted.to_string())]),
        );
        Ok(inserted)
    }

    // 変更自体は確定済みのため、イベント発行の失敗は警告ログのみ
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
