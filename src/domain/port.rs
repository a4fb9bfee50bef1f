// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::DomainEvent;
use crate::domain::model::{
    Pagination, Purchase, PurchaseId, Role, Sweet, SweetChanges, SweetFilter, SweetId, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// 指定レベルでログを出力
    fn log(
        &self,
        level: LogLevel,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Debug, component, message, correlation_id, context);
    }

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Info, component, message, correlation_id, context);
    }

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Warning, component, message, correlation_id, context);
    }

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.log(LogLevel::Error, component, message, correlation_id, context);
    }
}

/// キーと値のペアからログコンテキストを作成する
pub fn log_context<const N: usize>(pairs: [(&str, String); N]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
    /// テーブルが存在しない（マイグレーション未実行）
    SchemaMissing(String),
    /// ストレージ側で権限が拒否された
    PermissionDenied(String),
    /// 不正なリクエスト（ストレージが受け付けない値など）
    MalformedRequest(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
            RepositoryError::SchemaMissing(msg) => write!(f, "Schema missing: {}", msg),
            RepositoryError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            RepositoryError::MalformedRequest(msg) => write!(f, "Malformed request: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// 条件付き在庫減算の結果
#[derive(Debug, Clone, PartialEq)]
pub enum StockDecrement {
    /// 減算に成功した（減算後の商品）
    Applied(Sweet),
    /// 在庫不足のため減算しなかった
    Insufficient { available: u32 },
    /// 商品が存在しない
    NotFound,
}

/// 商品リポジトリトレイト
/// スイーツ集約の永続化を抽象化する
#[async_trait]
pub trait SweetRepository: Send + Sync {
    /// 新しい商品を保存する
    async fn insert(&self, sweet: &Sweet) -> Result<(), RepositoryError>;

    /// 商品IDで商品を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Sweet))` - 商品が見つかった
    /// * `Ok(None)` - 商品が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError>;

    /// 複数の商品IDで商品を検索する（存在しないIDは無視）
    async fn find_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError>;

    /// 条件に一致する商品を1ページ分取得する
    /// 商品名の昇順（同名の場合は登録順）で並べて返す
    ///
    /// # Returns
    /// * `Ok((Vec<Sweet>, u64))` - ページ内の商品と、条件に一致する全件数
    /// * `Err(RepositoryError)` - 取得失敗
    async fn search(
        &self,
        filter: &SweetFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Sweet>, u64), RepositoryError>;

    /// 登録済みのカテゴリを昇順・重複なしで取得する
    async fn categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// 登録済みの商品数を取得する
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// 指定されたフィールドのみを更新する
    ///
    /// # Returns
    /// * `Ok(Some(Sweet))` - 更新後の商品
    /// * `Ok(None)` - 商品が見つからなかった
    async fn update(
        &self,
        id: SweetId,
        changes: &SweetChanges,
    ) -> Result<Option<Sweet>, RepositoryError>;

    /// 商品を物理削除する（購入記録には波及しない）
    ///
    /// # Returns
    /// * `Ok(true)` - 削除した
    /// * `Ok(false)` - 商品が見つからなかった
    async fn delete(&self, id: SweetId) -> Result<bool, RepositoryError>;

    /// 在庫数が要求数量以上の場合に限り、在庫を原子的に減算する
    /// 読み取りと書き込みの間に他の操作が割り込まないことを保証すること
    async fn decrement_if_available(
        &self,
        id: SweetId,
        quantity: u32,
    ) -> Result<StockDecrement, RepositoryError>;

    /// 在庫を原子的に加算する
    ///
    /// # Returns
    /// * `Ok(Some(Sweet))` - 加算後の商品
    /// * `Ok(None)` - 商品が見つからなかった
    async fn increment_quantity(
        &self,
        id: SweetId,
        delta: u32,
    ) -> Result<Option<Sweet>, RepositoryError>;
}

/// 購入記録リポジトリトレイト
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// 購入記録を保存する
    async fn insert(&self, purchase: &Purchase) -> Result<(), RepositoryError>;

    /// 購入IDで購入記録を検索する
    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError>;

    /// 利用者の購入記録を取得する
    /// 購入日時の降順で並べて返す
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError>;

    /// 購入記録を削除する（孤立した購入記録のロールバック用）
    async fn delete(&self, id: PurchaseId) -> Result<bool, RepositoryError>;

    /// 所有者が一致する場合のみ購入記録を削除する
    async fn delete_owned(&self, id: PurchaseId, owner: UserId) -> Result<bool, RepositoryError>;

    /// 新しい一意の購入IDを生成する
    fn next_identity(&self) -> PurchaseId;
}

/// ロールリポジトリトレイト
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// 利用者のロールを取得する
    async fn find_role(&self, user_id: UserId) -> Result<Option<Role>, RepositoryError>;

    /// ロールが未登録の場合のみ登録する
    ///
    /// # Returns
    /// * `Ok(Role)` - 登録済みのロール（既存のロールがあればそのまま）
    async fn insert_if_absent(&self, user_id: UserId, role: Role) -> Result<Role, RepositoryError>;
}

/// イベントバスエラー
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),
}

/// イベントバストレイト
/// イベントの発行と配信を管理するポート
#[async_trait]
pub trait EventBus: Send + Sync {
    /// イベントを発行し、登録されたハンドラーに配信
    async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError>;
}
