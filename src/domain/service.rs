// ドメインサービス
// 複数の集約にまたがるビジネスロジックを実装

use crate::domain::error::DomainError;
use crate::domain::model::{Purchase, PurchaseId, Sweet, SweetId, UserId};
use crate::domain::port::{
    log_context, Logger, PurchaseRepository, RepositoryError, StockDecrement, SweetRepository,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const COMPONENT: &str = "PurchaseTransaction";

/// 購入トランザクションのエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PurchaseError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// 購入記録の作成後に在庫を減算できず、購入記録を削除した
    #[error("Purchase {purchase_id} was rolled back: {cause}")]
    RolledBack {
        purchase_id: PurchaseId,
        cause: Box<PurchaseError>,
    },
    /// 孤立した購入記録を削除できなかった
    #[error("Orphan purchase {purchase_id} could not be rolled back: {cause}")]
    RollbackFailed {
        purchase_id: PurchaseId,
        cause: RepositoryError,
    },
}

impl PurchaseError {
    /// 一度保存された購入記録のID（ロールバック済み、またはロールバック失敗）
    /// 購入者の履歴ビューが一時的にこの購入記録を読み込んだ可能性がある
    pub fn stored_purchase(&self) -> Option<PurchaseId> {
        match self {
            PurchaseError::RolledBack { purchase_id, .. }
            | PurchaseError::RollbackFailed { purchase_id, .. } => Some(*purchase_id),
            _ => None,
        }
    }

    /// ロールバックの有無を除いた失敗理由
    pub fn root_cause(&self) -> &PurchaseError {
        match self {
            PurchaseError::RolledBack { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// 購入トランザクションの結果
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    /// 在庫減算後の商品
    pub sweet: Sweet,
}

/// ロールバック時のリトライ設定
#[derive(Debug, Clone)]
pub struct RollbackPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// 購入トランザクションサービス
/// 在庫の確認、購入記録の作成、在庫の減算を担当する
///
/// 在庫の減算はストレージ層の条件付き更新で行うため、
/// 同じ商品への同時購入があっても在庫数を超えて販売されることはない。
/// 購入記録の作成後に減算できなかった場合は、作成した購入記録を削除する。
#[derive(Clone)]
pub struct PurchaseTransaction {
    sweet_repository: Arc<dyn SweetRepository>,
    purchase_repository: Arc<dyn PurchaseRepository>,
    logger: Arc<dyn Logger>,
    rollback_policy: RollbackPolicy,
}

impl PurchaseTransaction {
    /// 新しい購入トランザクションサービスを作成
    ///
    /// # Arguments
    /// * `sweet_repository` - 商品リポジトリ
    /// * `purchase_repository` - 購入記録リポジトリ
    /// * `logger` - ロガー
    pub fn new(
        sweet_repository: Arc<dyn SweetRepository>,
        purchase_repository: Arc<dyn PurchaseRepository>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            sweet_repository,
            purchase_repository,
            logger,
            rollback_policy: RollbackPolicy::default(),
        }
    }

    /// ロールバックのリトライ設定を変更
    pub fn with_rollback_policy(mut self, rollback_policy: RollbackPolicy) -> Self {
        self.rollback_policy = rollback_policy;
        self
    }

    /// 商品を購入する
    ///
    /// # Arguments
    /// * `sweet_id` - 商品ID
    /// * `quantity` - 購入数量（1以上）
    /// * `buyer_id` - 購入者ID
    /// * `correlation_id` - ログ用の相関ID
    ///
    /// # Returns
    /// * `Ok(PurchaseReceipt)` - 購入成功
    /// * `Err(PurchaseError)` - 購入失敗（在庫・購入記録は変更されていない）
    pub async fn execute(
        &self,
        sweet_id: SweetId,
        quantity: u32,
        buyer_id: UserId,
        correlation_id: Uuid,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        if quantity == 0 {
            return Err(DomainError::InvalidArgument(
                "購入数量は1以上である必要があります".to_string(),
            )
            .into());
        }

        let sweet = self
            .sweet_repository
            .find_by_id(sweet_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("商品が見つかりません: {}", sweet_id)))?;

        // この時点の価格で合計金額を確定する
        let purchase = Purchase::create(
            self.purchase_repository.next_identity(),
            buyer_id,
            &sweet,
            quantity,
        )?;

        // 購入記録の作成から在庫減算（失敗時のロールバック）までは
        // 呼び出し元が処理を中断しても途中で止まらないよう、別タスクで実行する
        let transaction = self.clone();
        let committed = tokio::spawn(async move {
            transaction.commit(purchase, correlation_id).await
        })
        .await
        .map_err(|e| {
            RepositoryError::OperationFailed(format!("購入処理タスクが異常終了しました: {}", e))
        })?;

        committed
    }

    // 購入記録の作成と条件付き在庫減算
    async fn commit(
        &self,
        purchase: Purchase,
        correlation_id: Uuid,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        self.purchase_repository.insert(&purchase).await?;

        let decrement = self
            .sweet_repository
            .decrement_if_available(purchase.sweet_id(), purchase.quantity())
            .await;

        let failure: PurchaseError = match decrement {
            Ok(StockDecrement::Applied(sweet)) => {
                self.logger.info(
                    COMPONENT,
                    "Purchase committed",
                    Some(correlation_id),
                    log_context([
                        ("purchase_id", purchase.id().to_string()),
                        ("sweet_id", purchase.sweet_id().to_string()),
                        ("quantity", purchase.quantity().to_string()),
                        ("remaining", sweet.quantity().to_string()),
                    ]),
                );
                return Ok(PurchaseReceipt { purchase, sweet });
            }
            Ok(StockDecrement::Insufficient { available }) => {
                DomainError::InsufficientStock { available }.into()
            }
            Ok(StockDecrement::NotFound) => DomainError::NotFound(format!(
                "商品が見つかりません: {}",
                purchase.sweet_id()
            ))
            .into(),
            Err(e) => e.into(),
        };

        self.logger.warn(
            COMPONENT,
            "Stock decrement failed, rolling back purchase",
            Some(correlation_id),
            log_context([
                ("purchase_id", purchase.id().to_string()),
                ("reason", failure.to_string()),
            ]),
        );
        self.rollback(purchase.id(), correlation_id).await?;

        Err(PurchaseError::RolledBack {
            purchase_id: purchase.id(),
            cause: Box::new(failure),
        })
    }

    // 孤立した購入記録を削除する（リトライ付き）
    async fn rollback(&self, purchase_id: PurchaseId, correlation_id: Uuid) -> Result<(), PurchaseError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.purchase_repository.delete(purchase_id).await {
                Ok(_) => return Ok(()),
                Err(cause) if attempts >= self.rollback_policy.max_attempts => {
                    self.logger.error(
                        COMPONENT,
                        "Orphan purchase could not be rolled back",
                        Some(correlation_id),
                        log_context([
                            ("purchase_id", purchase_id.to_string()),
                            ("attempts", attempts.to_string()),
                            ("error", cause.to_string()),
                        ]),
                    );
                    return Err(PurchaseError::RollbackFailed { purchase_id, cause });
                }
                Err(_) => tokio::time::sleep(self.rollback_policy.retry_delay).await,
            }
        }
    }
}
