// アプリケーション層
// ユースケースの調整（権限確認、トランザクション、イベント発行）を担当する

pub mod error;
pub mod service;

pub use error::ApplicationError;
