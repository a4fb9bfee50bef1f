use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::adapter::driven::{
    EventBusConfig, InMemoryEventBus, InMemoryPurchaseRepository, InMemoryRoleRepository,
    InMemorySweetRepository,
};
use crate::adapter::driver::request_dto::{
    CatalogQueryParams, CreateSweetRequest, PurchaseRequest, RestockRequest, UpdateSweetRequest,
};
use crate::adapter::driver::response_dto::{
    AccountResponse, CatalogPageResponse, PurchaseHistoryEntryResponse, PurchaseReceiptResponse,
    SeedResponse, SweetResponse,
};
use crate::application::service::{
    AccessControl, AccountService, CatalogQueryService, InventoryAdminService,
    PurchaseApplicationService, PurchaseHistoryQueryService, PurchaseHistoryRefresher,
};
use crate::application::ApplicationError;
use crate::domain::model::{PurchaseId, SweetId, UserId};
use crate::domain::port::{
    EventBusError, Logger, PurchaseRepository, RoleRepository, SweetRepository,
};
use crate::domain::service::PurchaseTransaction;

/// 呼び出し元の利用者IDを渡すヘッダー（外部の認証ゲートウェイが設定する）
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// 再試行で解決する可能性があるか
    pub retryable: bool,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// リポジトリ一式
#[derive(Clone)]
pub struct Repositories {
    pub sweets: Arc<dyn SweetRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub roles: Arc<dyn RoleRepository>,
}

impl Repositories {
    /// インメモリのリポジトリ一式を作成
    pub fn in_memory() -> Self {
        Self {
            sweets: Arc::new(InMemorySweetRepository::new()),
            purchases: Arc::new(InMemoryPurchaseRepository::new()),
            roles: Arc::new(InMemoryRoleRepository::new()),
        }
    }
}

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub catalog_query_service: Arc<CatalogQueryService>,
    pub inventory_admin_service: Arc<InventoryAdminService>,
    pub purchase_service: Arc<PurchaseApplicationService>,
    pub purchase_history_service: Arc<PurchaseHistoryQueryService>,
    pub account_service: Arc<AccountService>,
}

impl AppState {
    /// リポジトリからサービスを組み立て、購入履歴の更新ハンドラーをイベントバスに登録する
    pub async fn wire(
        repositories: Repositories,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, EventBusError> {
        let event_bus = Arc::new(InMemoryEventBus::new(
            EventBusConfig::default(),
            logger.clone(),
        ));
        let access_control = AccessControl::new(repositories.roles.clone());

        let purchase_history_service = Arc::new(PurchaseHistoryQueryService::new(
            repositories.purchases.clone(),
            repositories.sweets.clone(),
        ));
        event_bus
            .subscribe(Arc::new(PurchaseHistoryRefresher::new(
                purchase_history_service.clone(),
                logger.clone(),
            )))
            .await?;

        let transaction = PurchaseTransaction::new(
            repositories.sweets.clone(),
            repositories.purchases.clone(),
            logger.clone(),
        );

        Ok(Self {
            catalog_query_service: Arc::new(CatalogQueryService::new(repositories.sweets.clone())),
            inventory_admin_service: Arc::new(InventoryAdminService::new(
                repositories.sweets.clone(),
                access_control.clone(),
                event_bus.clone(),
                logger.clone(),
            )),
            purchase_service: Arc::new(PurchaseApplicationService::new(
                transaction,
                repositories.purchases.clone(),
                access_control,
                event_bus,
                logger,
            )),
            purchase_history_service,
            account_service: Arc::new(AccountService::new(repositories.roles)),
        })
    }
}

/// リクエストヘッダーから取得した呼び出し元（未認証ならNone）
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Option<UserId>);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Caller(None));
        };
        value
            .to_str()
            .ok()
            .and_then(|s| UserId::from_string(s.trim()).ok())
            .map(|user_id| Caller(Some(user_id)))
            .ok_or_else(|| {
                map_application_error(ApplicationError::InvalidArgument(format!(
                    "{}ヘッダーの値が不正です",
                    USER_ID_HEADER
                )))
            })
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/sweets", get(list_sweets).post(create_sweet))
        .route("/sweets/categories", get(list_categories))
        .route("/sweets/seed", post(seed_sample_catalog))
        .route(
            "/sweets/:sweet_id",
            get(get_sweet).put(update_sweet).delete(delete_sweet),
        )
        .route("/sweets/:sweet_id/restock", post(restock_sweet))
        .route("/sweets/:sweet_id/purchase", post(purchase_sweet))
        .route("/purchases", get(list_purchases))
        .route("/purchases/:purchase_id", delete(delete_purchase))
        .route("/accounts/me", get(get_account).post(ensure_account))
}

/// 状態とミドルウェアを適用したアプリケーション全体のルーター
pub fn build_app(state: AppState) -> Router {
    create_router()
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sweetshop-inventory",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// 商品一覧取得エンドポイント
async fn list_sweets(
    State(state): State<AppState>,
    Query(params): Query<CatalogQueryParams>,
) -> ApiResult<Json<CatalogPageResponse>> {
    let (filter, pagination) = params
        .into_query()
        .map_err(|e| map_application_error(e.into()))?;

    let page = state
        .catalog_query_service
        .list(filter, pagination)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CatalogPageResponse::from_page(&page)))
}

// カテゴリ一覧取得エンドポイント
async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    state
        .catalog_query_service
        .categories()
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 商品取得エンドポイント
async fn get_sweet(
    State(state): State<AppState>,
    Path(sweet_id): Path<Uuid>,
) -> ApiResult<Json<SweetResponse>> {
    let sweet = state
        .catalog_query_service
        .get(SweetId::from_uuid(sweet_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(SweetResponse::from_sweet(&sweet)))
}

// 商品登録エンドポイント
async fn create_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateSweetRequest>,
) -> ApiResult<(StatusCode, Json<SweetResponse>)> {
    let sweet = state
        .inventory_admin_service
        .create(caller.0, request.into())
        .await
        .map_err(map_application_error)?;
    Ok((StatusCode::CREATED, Json(SweetResponse::from_sweet(&sweet))))
}

// 商品更新エンドポイント
async fn update_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(sweet_id): Path<Uuid>,
    Json(request): Json<UpdateSweetRequest>,
) -> ApiResult<Json<SweetResponse>> {
    let sweet = state
        .inventory_admin_service
        .update(caller.0, SweetId::from_uuid(sweet_id), request.into())
        .await
        .map_err(map_application_error)?;
    Ok(Json(SweetResponse::from_sweet(&sweet)))
}

// 商品削除エンドポイント
async fn delete_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(sweet_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .inventory_admin_service
        .delete(caller.0, SweetId::from_uuid(sweet_id))
        .await
        .map_err(map_application_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// 在庫補充エンドポイント
async fn restock_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(sweet_id): Path<Uuid>,
    Json(request): Json<RestockRequest>,
) -> ApiResult<Json<SweetResponse>> {
    let sweet = state
        .inventory_admin_service
        .restock(caller.0, SweetId::from_uuid(sweet_id), request.quantity)
        .await
        .map_err(map_application_error)?;
    Ok(Json(SweetResponse::from_sweet(&sweet)))
}

// サンプルデータ投入エンドポイント
async fn seed_sample_catalog(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<SeedResponse>> {
    let inserted = state
        .inventory_admin_service
        .seed_sample_catalog(caller.0)
        .await
        .map_err(map_application_error)?;
    Ok(Json(SeedResponse { inserted }))
}

// 購入エンドポイント
async fn purchase_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(sweet_id): Path<Uuid>,
    Json(request): Json<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseReceiptResponse>)> {
    let receipt = state
        .purchase_service
        .purchase(caller.0, SweetId::from_uuid(sweet_id), request.quantity)
        .await
        .map_err(map_application_error)?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseReceiptResponse::from_receipt(&receipt)),
    ))
}

// 購入履歴取得エンドポイント
async fn list_purchases(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<PurchaseHistoryEntryResponse>>> {
    let entries = state
        .purchase_history_service
        .list_for_user(caller.0)
        .await
        .map_err(map_application_error)?;
    Ok(Json(
        entries
            .iter()
            .map(PurchaseHistoryEntryResponse::from_entry)
            .collect(),
    ))
}

// 購入記録削除エンドポイント
async fn delete_purchase(
    State(state): State<AppState>,
    caller: Caller,
    Path(purchase_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .purchase_service
        .delete_purchase(caller.0, PurchaseId::from_uuid(purchase_id))
        .await
        .map_err(map_application_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// アカウント作成（既定ロールの付与）エンドポイント
async fn ensure_account(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<AccountResponse>> {
    let user_id = require_caller(caller)?;
    let role = state
        .account_service
        .ensure_account(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(AccountResponse::new(user_id, Some(role))))
}

// アカウント取得エンドポイント
async fn get_account(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<AccountResponse>> {
    let user_id = require_caller(caller)?;
    let role = state
        .account_service
        .role_of(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(AccountResponse::new(user_id, role)))
}

fn require_caller(caller: Caller) -> Result<UserId, (StatusCode, Json<ApiError>)> {
    caller.0.ok_or_else(|| {
        map_application_error(ApplicationError::PermissionDenied(
            "ログインが必要です".to_string(),
        ))
    })
}

// アプリケーションエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match &err {
        ApplicationError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ApplicationError::InsufficientStock { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
        ApplicationError::Validation { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        }
        ApplicationError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        ApplicationError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        ApplicationError::StorageUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
        }
    };

    if err.is_transient() {
        tracing::error!(error = %err, "Storage failure while handling request");
    }

    (
        status,
        Json(ApiError {
            error: err.user_message(),
            code: code.to_string(),
            retryable: err.is_transient(),
        }),
    )
}
