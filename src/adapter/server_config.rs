use crate::adapter::database_config::ConfigError;
use crate::domain::model::UserId;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// ストレージの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StorageBackend::MySql),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid STORAGE_BACKEND: {}",
                other
            ))),
        }
    }
}

/// ログの出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue(format!("Invalid LOG_FORMAT: {}", other))),
        }
    }
}

/// サーバー起動設定を管理する構造体
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// 起動時、カタログが空ならサンプルデータを投入する
    pub seed_sample_catalog: bool,
    pub log_format: LogFormat,
    /// EnvFilterの書式（例: `info`, `sweetshop_inventory=debug`）
    pub log_level: String,
    /// 起動時に管理者ロールを付与する利用者（カンマ区切り）
    pub admin_user_ids: Vec<UserId>,
}

fn parse_user_ids(name: &str, value: &str) -> Result<Vec<UserId>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            UserId::from_string(id)
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}: {}", name, id, e)))
        })
        .collect()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "Invalid {}: {}",
            name, other
        ))),
    }
}

impl ServerConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid SERVER_PORT: {}", e)))?;

        let storage = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .parse::<StorageBackend>()?;

        let seed_sample_catalog = parse_bool(
            "SEED_SAMPLE_CATALOG",
            &env::var("SEED_SAMPLE_CATALOG").unwrap_or_default(),
        )?;

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .parse::<LogFormat>()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_user_ids =
            parse_user_ids("ADMIN_USER_IDS", &env::var("ADMIN_USER_IDS").unwrap_or_default())?;

        Ok(Self {
            host,
            port,
            storage,
            seed_sample_catalog,
            log_format,
            log_level,
            admin_user_ids,
        })
    }

    /// 待ち受けアドレス
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid SERVER_HOST: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ENV_LOCK;

    const VARS: [&str; 7] = [
        "ADMIN_USER_IDS",
        "SERVER_HOST",
        "SERVER_PORT",
        "STORAGE_BACKEND",
        "SEED_SAMPLE_CATALOG",
        "LOG_FORMAT",
        "LOG_LEVEL",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_from_env_with_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.storage, StorageBackend::MySql);
        assert!(!config.seed_sample_catalog);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.log_level, "info");
        assert!(config.admin_user_ids.is_empty());
        assert_eq!(config.bind_address().unwrap().port(), 3000);
    }

    #[test]
    fn test_from_env_with_all_variables() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("SERVER_HOST", "127.0.0.1");
        env::set_var("SERVER_PORT", "8080");
        env::set_var("STORAGE_BACKEND", "Memory");
        env::set_var("SEED_SAMPLE_CATALOG", "true");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("LOG_LEVEL", "sweetshop_inventory=debug");
        env::set_var(
            "ADMIN_USER_IDS",
            " 6f1c7a52-3d9e-4b8a-9c41-0e2f5d7b8a10, ,1b9d6bcd-bbfd-4b2d-9b5d-ab8dfbbd4bed",
        );

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.seed_sample_catalog);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "sweetshop_inventory=debug");
        assert_eq!(
            config.admin_user_ids,
            vec![
                UserId::from_string("6f1c7a52-3d9e-4b8a-9c41-0e2f5d7b8a10").unwrap(),
                UserId::from_string("1b9d6bcd-bbfd-4b2d-9b5d-ab8dfbbd4bed").unwrap(),
            ]
        );

        clear();
    }

    #[test]
    fn test_invalid_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        for (var, value) in [
            ("SERVER_PORT", "not-a-port"),
            ("STORAGE_BACKEND", "postgres"),
            ("SEED_SAMPLE_CATALOG", "maybe"),
            ("LOG_FORMAT", "xml"),
            ("ADMIN_USER_IDS", "admin"),
        ] {
            clear();
            env::set_var(var, value);
            assert!(
                matches!(ServerConfig::from_env(), Err(ConfigError::InvalidValue(_))),
                "{} = {} should be rejected",
                var,
                value
            );
        }
        clear();
    }
}
