use crate::domain::error::DomainError;
use crate::domain::port::RepositoryError;
use crate::domain::service::PurchaseError;

/// アプリケーション層のエラー型
/// ドメインエラーとリポジトリエラーを、呼び出し元に返すエラー種別に集約する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    /// 参照された商品または購入記録が存在しない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 要求数量が現在の在庫数を超えている
    #[error("Insufficient stock: only {available} available")]
    InsufficientStock { available: u32 },
    /// 管理者入力の検証失敗
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },
    /// 無効な引数（0以下の補充数・購入数、不正なページ指定など）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// ロール不足、未認証、または他人のリソース
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// ストレージの障害（ネットワーク、スキーマ不一致など）
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ApplicationError {
    /// 再試行で解決する可能性があるか
    pub fn is_transient(&self) -> bool {
        matches!(self, ApplicationError::StorageUnavailable(_))
    }

    /// 利用者向けのメッセージ
    pub fn user_message(&self) -> String {
        match self {
            ApplicationError::NotFound(_) => "The requested item no longer exists.".to_string(),
            ApplicationError::InsufficientStock { available: 0 } => {
                "This item is out of stock.".to_string()
            }
            ApplicationError::InsufficientStock { available } => {
                format!("Only {} left in stock.", available)
            }
            ApplicationError::Validation { field, reason } => format!("{}: {}", field, reason),
            ApplicationError::InvalidArgument(msg) => msg.clone(),
            ApplicationError::PermissionDenied(_) => {
                "You do not have permission to perform this action.".to_string()
            }
            ApplicationError::StorageUnavailable(_) => {
                "The store is temporarily unavailable. Please try again.".to_string()
            }
        }
    }
}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientStock { available } => {
                ApplicationError::InsufficientStock { available }
            }
            DomainError::Validation { field, reason } => {
                ApplicationError::Validation { field, reason }
            }
            DomainError::InvalidArgument(msg) => ApplicationError::InvalidArgument(msg),
            DomainError::NotFound(msg) => ApplicationError::NotFound(msg),
            DomainError::PermissionDenied(msg) => ApplicationError::PermissionDenied(msg),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::PermissionDenied(msg) => ApplicationError::PermissionDenied(msg),
            RepositoryError::MalformedRequest(msg) => ApplicationError::InvalidArgument(msg),
            other => ApplicationError::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<PurchaseError> for ApplicationError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Domain(err) => err.into(),
            PurchaseError::Repository(err) => err.into(),
            PurchaseError::RolledBack { cause, .. } => (*cause).into(),
            PurchaseError::RollbackFailed { .. } => {
                ApplicationError::StorageUnavailable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PurchaseId;

    #[test]
    fn test_domain_error_conversion() {
        let err: ApplicationError = DomainError::InsufficientStock { available: 3 }.into();
        assert_eq!(err, ApplicationError::InsufficientStock { available: 3 });

        let err: ApplicationError = DomainError::validation("price", "too low").into();
        assert!(matches!(err, ApplicationError::Validation { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: ApplicationError =
            RepositoryError::PermissionDenied("sweets".to_string()).into();
        assert!(matches!(err, ApplicationError::PermissionDenied(_)));

        let err: ApplicationError =
            RepositoryError::MalformedRequest("bad value".to_string()).into();
        assert!(matches!(err, ApplicationError::InvalidArgument(_)));

        let err: ApplicationError = RepositoryError::SchemaMissing("sweets".to_string()).into();
        assert!(matches!(err, ApplicationError::StorageUnavailable(_)));

        let err: ApplicationError =
            RepositoryError::ConnectionFailed("timeout".to_string()).into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_rollback_failure_is_storage_unavailable() {
        let err: ApplicationError = PurchaseError::RollbackFailed {
            purchase_id: PurchaseId::new(),
            cause: RepositoryError::ConnectionFailed("down".to_string()),
        }
        .into();
        assert!(matches!(err, ApplicationError::StorageUnavailable(_)));
    }

    #[test]
    fn test_rolled_back_purchase_reports_underlying_cause() {
        let err: ApplicationError = PurchaseError::RolledBack {
            purchase_id: PurchaseId::new(),
            cause: Box::new(DomainError::InsufficientStock { available: 1 }.into()),
        }
        .into();
        assert_eq!(err, ApplicationError::InsufficientStock { available: 1 });
    }

    #[test]
    fn test_only_storage_errors_are_transient() {
        assert!(!ApplicationError::InsufficientStock { available: 0 }.is_transient());
        assert!(!ApplicationError::NotFound("x".to_string()).is_transient());
        assert!(ApplicationError::StorageUnavailable("x".to_string()).is_transient());
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            ApplicationError::InsufficientStock { available: 0 }.user_message(),
            "This item is out of stock."
        );
        assert_eq!(
            ApplicationError::InsufficientStock { available: 2 }.user_message(),
            "Only 2 left in stock."
        );
    }
}
