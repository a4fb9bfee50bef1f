use sweetshop_inventory::adapter::driven::{
    MySqlPurchaseRepository, MySqlRoleRepository, MySqlSweetRepository, TracingLogger,
};
use sweetshop_inventory::adapter::driver::rest_api::{build_app, AppState, Repositories};
use sweetshop_inventory::adapter::{
    DatabaseConfig, DatabaseMigration, LogFormat, ServerConfig, StorageBackend,
};

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// tracingのsubscriberを設定
fn init_tracing(config: &ServerConfig) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

// MySQLに接続し、マイグレーションを実行してリポジトリを作成
async fn connect_mysql() -> Result<Repositories, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Loaded database configuration");

    let pool = config
        .pool_options()
        .connect_with(config.connect_options())
        .await?;
    tracing::info!("Created database connection pool");

    DatabaseMigration::new(pool.clone()).run().await?;

    Ok(Repositories {
        sweets: Arc::new(MySqlSweetRepository::new(pool.clone())),
        purchases: Arc::new(MySqlPurchaseRepository::new(pool.clone())),
        roles: Arc::new(MySqlRoleRepository::new(pool)),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting sweetshop inventory API");

    let repositories = match config.storage {
        StorageBackend::MySql => connect_mysql().await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Repositories::in_memory()
        }
    };

    // サービスを組み立て、イベントハンドラーを登録
    let app_state = AppState::wire(repositories, Arc::new(TracingLogger::new())).await?;

    // 設定で指定された利用者に管理者ロールを付与
    if !config.admin_user_ids.is_empty() {
        let not_granted = app_state
            .account_service
            .grant_admins(&config.admin_user_ids)
            .await?;
        for user_id in &not_granted {
            tracing::warn!(%user_id, "ADMIN_USER_IDS entry already has a non-admin role; left unchanged");
        }
        tracing::info!(
            granted = config.admin_user_ids.len() - not_granted.len(),
            "Granted admin role from configuration"
        );
    }

    if config.seed_sample_catalog {
        let inserted = app_state.inventory_admin_service.seed_if_empty().await?;
        tracing::info!(inserted, "Seeded sample catalog");
    }

    let app = build_app(app_state);

    let address = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, "REST API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
