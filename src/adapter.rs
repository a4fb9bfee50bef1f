pub mod database_config;
pub mod database_error;
pub mod database_migration;
pub mod driven;
pub mod driver;
pub mod server_config;

pub use database_config::{ConfigError, DatabaseConfig};
pub use database_migration::DatabaseMigration;
pub use server_config::{LogFormat, ServerConfig, StorageBackend};

// 環境変数を書き換えるテスト同士の競合を防ぐためのロック
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
