/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// 在庫不足（要求数量が現在の在庫数を超えている）
    #[error("Insufficient stock: only {available} available")]
    InsufficientStock { available: u32 },
    /// 入力値の検証失敗（例: 空の商品名、0以下の価格）
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },
    /// 無効な引数（例: 0以下の補充数・購入数）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// 対象が存在しない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 権限不足（ロール不足、または他人のリソース）
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl DomainError {
    /// 検証エラーを作成するヘルパー
    pub fn validation(field: &str, reason: &str) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
