use sweetshop_inventory::adapter::driven::{
    InMemoryPurchaseRepository, InMemoryRoleRepository, InMemorySweetRepository, TracingLogger,
};
use sweetshop_inventory::adapter::driver::rest_api::{AppState, Repositories};
use sweetshop_inventory::application::service::PurchaseHistoryQueryService;
use sweetshop_inventory::application::ApplicationError;
use sweetshop_inventory::domain::model::{
    NewSweet, Pagination, PurchaseHistoryEntry, Role, Sweet, SweetChanges, SweetFilter, SweetId,
    SweetPatch, UserId,
};
use sweetshop_inventory::domain::port::{
    PurchaseRepository, RepositoryError, RoleRepository, StockDecrement, SweetRepository,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

// テスト用のサービス一式と、検証用のリポジトリ
struct TestContext {
    state: AppState,
    sweets: Arc<InMemorySweetRepository>,
    purchases: Arc<InMemoryPurchaseRepository>,
    admin: UserId,
}

async fn setup_with(sweets: Arc<dyn SweetRepository>) -> (AppState, Arc<InMemoryPurchaseRepository>, UserId) {
    let purchases = Arc::new(InMemoryPurchaseRepository::new());
    let roles = Arc::new(InMemoryRoleRepository::new());
    let admin = UserId::new();
    roles.insert_if_absent(admin, Role::Admin).await.unwrap();

    let state = AppState::wire(
        Repositories {
            sweets,
            purchases: purchases.clone(),
            roles,
        },
        Arc::new(TracingLogger::new()),
    )
    .await
    .unwrap();
    (state, purchases, admin)
}

async fn setup() -> TestContext {
    let sweets = Arc::new(InMemorySweetRepository::new());
    let (state, purchases, admin) = setup_with(sweets.clone()).await;
    TestContext {
        state,
        sweets,
        purchases,
        admin,
    }
}

async fn create_sweet(ctx: &TestContext, name: &str, cents: i64, quantity: i64) -> Sweet {
    ctx.state
        .inventory_admin_service
        .create(
            Some(ctx.admin),
            NewSweet {
                name: name.to_string(),
                category: "Chocolate".to_string(),
                price: Decimal::new(cents, 2),
                quantity,
                image_url: None,
            },
        )
        .await
        .unwrap()
}

async fn stock_of(ctx: &TestContext, id: SweetId) -> u32 {
    ctx.sweets.find_by_id(id).await.unwrap().unwrap().quantity()
}

async fn history(ctx: &TestContext, user: UserId) -> Vec<PurchaseHistoryEntry> {
    ctx.state
        .purchase_history_service
        .list_for_user(Some(user))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Hazelnut Praline", 450, 5).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = ctx.state.purchase_service.clone();
        let sweet_id = sweet.id();
        handles.push(tokio::spawn(async move {
            service.purchase(Some(UserId::new()), sweet_id, 1).await
        }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ApplicationError::InsufficientStock { available }) => {
                assert_eq!(available, 0);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 15);
    assert_eq!(stock_of(&ctx, sweet.id()).await, 0);
}

#[tokio::test]
async fn test_concurrent_mixed_quantities_account_for_every_unit() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Salted Caramel", 300, 17).await;
    let buyer = UserId::new();

    let mut handles = Vec::new();
    for quantity in [1i64, 2, 3, 4, 5, 6, 7] {
        let service = ctx.state.purchase_service.clone();
        let sweet_id = sweet.id();
        handles.push(tokio::spawn(async move {
            service.purchase(Some(buyer), sweet_id, quantity).await
        }));
    }

    let mut sold = 0u32;
    for handle in handles {
        if let Ok(receipt) = handle.await.unwrap() {
            sold += receipt.purchase.quantity();
        }
    }

    assert!(sold <= 17);
    assert_eq!(stock_of(&ctx, sweet.id()).await, 17 - sold);

    let recorded: u32 = ctx
        .purchases
        .find_by_user(buyer)
        .await
        .unwrap()
        .iter()
        .map(|p| p.quantity())
        .sum();
    assert_eq!(recorded, sold);
}

#[tokio::test]
async fn test_purchase_snapshots_total_price() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Rose Barfi", 1250, 10).await;
    let buyer = UserId::new();

    let receipt = ctx
        .state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 3)
        .await
        .unwrap();
    assert_eq!(receipt.purchase.total_price(), Decimal::new(3750, 2));
    assert_eq!(receipt.sweet.quantity(), 7);

    ctx.state
        .inventory_admin_service
        .update(
            Some(ctx.admin),
            sweet.id(),
            SweetPatch {
                price: Some(Decimal::new(2000, 2)),
                ..SweetPatch::default()
            },
        )
        .await
        .unwrap();

    let entries = history(&ctx, buyer).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].purchase().total_price(), Decimal::new(3750, 2));
    // 結合された商品情報は現在の価格を表示する
    assert_eq!(
        entries[0].sweet().unwrap().price.amount(),
        Decimal::new(2000, 2)
    );
}

#[tokio::test]
async fn test_purchase_rejections_leave_state_untouched() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Pistachio Fudge", 500, 2).await;
    let buyer = UserId::new();
    let service = &ctx.state.purchase_service;

    assert!(matches!(
        service.purchase(None, sweet.id(), 1).await,
        Err(ApplicationError::PermissionDenied(_))
    ));
    assert!(matches!(
        service.purchase(Some(buyer), sweet.id(), 0).await,
        Err(ApplicationError::InvalidArgument(_))
    ));
    assert_eq!(
        service.purchase(Some(buyer), sweet.id(), 3).await.unwrap_err(),
        ApplicationError::InsufficientStock { available: 2 }
    );
    assert!(matches!(
        service.purchase(Some(buyer), SweetId::new(), 1).await,
        Err(ApplicationError::NotFound(_))
    ));

    assert_eq!(stock_of(&ctx, sweet.id()).await, 2);
    assert!(ctx.purchases.find_by_user(buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purchase_total_over_limit_is_rejected_without_side_effects() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Saffron Kalakand", 9_999_999_999, 200).await;
    let buyer = UserId::new();

    let error = ctx
        .state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 101)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ApplicationError::Validation { ref field, .. } if field == "quantity"
    ));
    assert_eq!(stock_of(&ctx, sweet.id()).await, 200);
    assert!(ctx.purchases.find_by_user(buyer).await.unwrap().is_empty());

    let receipt = ctx
        .state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 2)
        .await
        .unwrap();
    assert_eq!(receipt.purchase.total_price(), Decimal::new(19_999_999_998, 2));
}

#[tokio::test]
async fn test_history_is_scoped_to_caller_and_newest_first() {
    let ctx = setup().await;
    let first = create_sweet(&ctx, "Almond Toffee", 200, 10).await;
    let second = create_sweet(&ctx, "Coconut Ladoo", 150, 10).await;
    let buyer = UserId::new();
    let other = UserId::new();

    let service = &ctx.state.purchase_service;
    service.purchase(Some(buyer), first.id(), 1).await.unwrap();
    service.purchase(Some(buyer), second.id(), 2).await.unwrap();
    service.purchase(Some(other), first.id(), 4).await.unwrap();

    let entries = history(&ctx, buyer).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].purchase().sweet_id(), second.id());
    assert_eq!(entries[1].purchase().sweet_id(), first.id());
    assert!(entries.iter().all(|e| e.purchase().is_owned_by(buyer)));

    assert_eq!(history(&ctx, other).await.len(), 1);
    assert!(ctx
        .state
        .purchase_history_service
        .list_for_user(None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_history_view_is_refreshed_after_purchase() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Milk Peda", 120, 5).await;
    let buyer = UserId::new();

    // 空のビューをキャッシュさせる
    assert!(history(&ctx, buyer).await.is_empty());

    ctx.state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 1)
        .await
        .unwrap();

    assert_eq!(history(&ctx, buyer).await.len(), 1);
}

#[tokio::test]
async fn test_deleting_sweet_does_not_cascade_to_purchases() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Kaju Katli", 900, 5).await;
    let buyer = UserId::new();
    ctx.state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 2)
        .await
        .unwrap();
    assert!(history(&ctx, buyer).await[0].sweet().is_some());

    ctx.state
        .inventory_admin_service
        .delete(Some(ctx.admin), sweet.id())
        .await
        .unwrap();

    let entries = history(&ctx, buyer).await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].sweet().is_none());
    assert_eq!(entries[0].display_name(), PurchaseHistoryEntry::UNAVAILABLE_NAME);
    assert_eq!(entries[0].purchase().total_price(), Decimal::new(1800, 2));
}

#[tokio::test]
async fn test_delete_purchase_is_owner_only_and_keeps_stock() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Gulab Jamun", 350, 5).await;
    let buyer = UserId::new();
    let receipt = ctx
        .state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 2)
        .await
        .unwrap();
    let purchase_id = receipt.purchase.id();
    assert_eq!(history(&ctx, buyer).await.len(), 1);

    assert!(matches!(
        ctx.state
            .purchase_service
            .delete_purchase(Some(UserId::new()), purchase_id)
            .await,
        Err(ApplicationError::PermissionDenied(_))
    ));

    ctx.state
        .purchase_service
        .delete_purchase(Some(buyer), purchase_id)
        .await
        .unwrap();

    assert!(history(&ctx, buyer).await.is_empty());
    assert_eq!(stock_of(&ctx, sweet.id()).await, 3);
    assert!(matches!(
        ctx.state
            .purchase_service
            .delete_purchase(Some(buyer), purchase_id)
            .await,
        Err(ApplicationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_restock_concurrent_with_purchases() {
    let ctx = setup().await;
    let sweet = create_sweet(&ctx, "Jalebi", 100, 3).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = ctx.state.purchase_service.clone();
        let sweet_id = sweet.id();
        handles.push(tokio::spawn(async move {
            service.purchase(Some(UserId::new()), sweet_id, 1).await.is_ok()
        }));
    }
    let admin_service = ctx.state.inventory_admin_service.clone();
    let admin = ctx.admin;
    let sweet_id = sweet.id();
    let restock = tokio::spawn(async move { admin_service.restock(Some(admin), sweet_id, 4).await });

    let sold = {
        let mut sold = 0u32;
        for handle in handles {
            if handle.await.unwrap() {
                sold += 1;
            }
        }
        sold
    };
    restock.await.unwrap().unwrap();

    assert!(sold >= 3);
    assert_eq!(stock_of(&ctx, sweet.id()).await, 3 + 4 - sold);
}

/// 在庫の減算時の振る舞い
enum DecrementFault {
    /// ストレージ障害を返す
    Unavailable,
    /// 購入記録の作成後、減算前に購入者の履歴を読み込んでから競合に負ける
    LoseRaceAfterHistoryRead { buyer: UserId },
}

/// 在庫の減算だけを差し替えた商品リポジトリ
struct FaultyDecrement {
    inner: InMemorySweetRepository,
    fault: DecrementFault,
    history: OnceLock<Arc<PurchaseHistoryQueryService>>,
    entries_seen_before_rollback: AtomicUsize,
}

impl FaultyDecrement {
    fn new(fault: DecrementFault) -> Self {
        Self {
            inner: InMemorySweetRepository::new(),
            fault,
            history: OnceLock::new(),
            entries_seen_before_rollback: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SweetRepository for FaultyDecrement {
    async fn insert(&self, sweet: &Sweet) -> Result<(), RepositoryError> {
        self.inner.insert(sweet).await
    }

    async fn find_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        self.inner.find_by_ids(ids).await
    }

    async fn search(
        &self,
        filter: &SweetFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Sweet>, u64), RepositoryError> {
        self.inner.search(filter, pagination).await
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        self.inner.categories().await
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.inner.count().await
    }

    async fn update(
        &self,
        id: SweetId,
        changes: &SweetChanges,
    ) -> Result<Option<Sweet>, RepositoryError> {
        self.inner.update(id, changes).await
    }

    async fn delete(&self, id: SweetId) -> Result<bool, RepositoryError> {
        self.inner.delete(id).await
    }

    async fn decrement_if_available(
        &self,
        _id: SweetId,
        _quantity: u32,
    ) -> Result<StockDecrement, RepositoryError> {
        match &self.fault {
            DecrementFault::Unavailable => {
                Err(RepositoryError::ConnectionFailed("connection reset".to_string()))
            }
            DecrementFault::LoseRaceAfterHistoryRead { buyer } => {
                if let Some(history) = self.history.get() {
                    let entries = history
                        .list_for_user(Some(*buyer))
                        .await
                        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
                    self.entries_seen_before_rollback
                        .store(entries.len(), Ordering::SeqCst);
                }
                Ok(StockDecrement::Insufficient { available: 0 })
            }
        }
    }

    async fn increment_quantity(
        &self,
        id: SweetId,
        delta: u32,
    ) -> Result<Option<Sweet>, RepositoryError> {
        self.inner.increment_quantity(id, delta).await
    }
}

async fn insert_sweet(sweets: &FaultyDecrement, name: &str, quantity: i64) -> Sweet {
    let sweet = Sweet::create(
        SweetId::new(),
        NewSweet {
            name: name.to_string(),
            category: "Mithai".to_string(),
            price: Decimal::new(400, 2),
            quantity,
            image_url: None,
        },
    )
    .unwrap();
    sweets.insert(&sweet).await.unwrap();
    sweet
}

#[tokio::test]
async fn test_storage_failure_during_decrement_removes_orphan_purchase() {
    let sweets = Arc::new(FaultyDecrement::new(DecrementFault::Unavailable));
    let sweet = insert_sweet(&sweets, "Mysore Pak", 5).await;
    let (state, purchases, _) = setup_with(sweets.clone()).await;
    let buyer = UserId::new();

    let result = state.purchase_service.purchase(Some(buyer), sweet.id(), 1).await;

    let error = result.unwrap_err();
    assert!(matches!(error, ApplicationError::StorageUnavailable(_)));
    assert!(error.is_transient());
    assert!(purchases.find_by_user(buyer).await.unwrap().is_empty());
    assert_eq!(
        sweets.find_by_id(sweet.id()).await.unwrap().unwrap().quantity(),
        5
    );
}

#[tokio::test]
async fn test_history_read_during_lost_race_does_not_keep_rolled_back_purchase() {
    let buyer = UserId::new();
    let sweets = Arc::new(FaultyDecrement::new(
        DecrementFault::LoseRaceAfterHistoryRead { buyer },
    ));
    let sweet = insert_sweet(&sweets, "Soan Papdi", 1).await;
    let (state, purchases, _) = setup_with(sweets.clone()).await;
    assert!(sweets
        .history
        .set(state.purchase_history_service.clone())
        .is_ok());

    let error = state
        .purchase_service
        .purchase(Some(buyer), sweet.id(), 1)
        .await
        .unwrap_err();

    assert_eq!(error, ApplicationError::InsufficientStock { available: 0 });
    // 減算前の読み込みでは、作成直後の購入記録がビューに入っていた
    assert_eq!(sweets.entries_seen_before_rollback.load(Ordering::SeqCst), 1);
    assert!(purchases.find_by_user(buyer).await.unwrap().is_empty());
    assert!(state
        .purchase_history_service
        .list_for_user(Some(buyer))
        .await
        .unwrap()
        .is_empty());
}
