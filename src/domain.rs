// ドメイン層
// ビジネスルールとポート（外部依存の抽象）を定義する

pub mod error;
pub mod event;
pub mod event_bus;
pub mod model;
pub mod port;
pub mod service;
