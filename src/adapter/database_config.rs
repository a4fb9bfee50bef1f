use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// テーブルの照合順序（マイグレーションと一致させる）
pub const TABLE_CHARSET: &str = "utf8mb4";
pub const TABLE_COLLATION: &str = "utf8mb4_unicode_ci";

/// データベース接続設定を管理する構造体
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// 接続プールの最大接続数（1以上）
    pub max_connections: u32,
    /// プールから接続を取得するまでの待ち時間の上限
    pub acquire_timeout: Duration,
}

/// 設定エラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

// 環境変数を読み取り、未設定ならデフォルト値を使う
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e)))
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_var::<u16>("DATABASE_PORT", "3306")?;
        let database = env::var("DATABASE_NAME").unwrap_or_else(|_| "sweetshop_db".to_string());
        let username = env::var("DATABASE_USER").unwrap_or_else(|_| "sweetshop_user".to_string());
        let password =
            env::var("DATABASE_PASSWORD").unwrap_or_else(|_| "sweetshop_password".to_string());

        let max_connections = parse_var::<u32>("DATABASE_MAX_CONNECTIONS", "10")?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "Invalid DATABASE_MAX_CONNECTIONS: must be at least 1".to_string(),
            ));
        }

        let acquire_timeout =
            Duration::from_secs(parse_var::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS", "5")?);

        Ok(Self {
            host,
            port,
            database,
            username,
            password,
            max_connections,
            acquire_timeout,
        })
    }

    /// MySQL接続オプションを生成
    /// URLを経由しないため、パスワードに `@` や `:` が含まれていてもそのまま渡せる
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .charset(TABLE_CHARSET)
            .collation(TABLE_COLLATION)
    }

    /// 接続プールの設定を生成
    pub fn pool_options(&self) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}
