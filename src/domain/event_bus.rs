use crate::domain::event::DomainEvent;
use async_trait::async_trait;

/// イベントハンドラーエラー
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// イベントハンドラートレイト
/// 購読しているイベントタイプのみを処理する
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// イベントを処理する
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;

    /// このハンドラーがイベントを処理するか
    fn can_handle(&self, event: &DomainEvent) -> bool;

    /// ログ出力用のハンドラー名
    fn handler_name(&self) -> &str;
}
