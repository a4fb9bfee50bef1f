// インメモリリポジトリ
// STORAGE_BACKEND=memory での起動とテストで使用する。
// 各操作は1つのミューテックスの中で完結するため、MySQL実装と同じく
// 条件付き減算・加算は他の操作と割り込み合わない

use crate::domain::model::{
    Pagination, Purchase, PurchaseId, Role, Sweet, SweetChanges, SweetFilter, SweetId, UserId,
};
use crate::domain::port::{
    PurchaseRepository, RepositoryError, RoleRepository, StockDecrement, SweetRepository,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

/// インメモリ商品リポジトリ
#[derive(Default)]
pub struct InMemorySweetRepository {
    sweets: Mutex<HashMap<SweetId, Sweet>>,
}

impl InMemorySweetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SweetRepository for InMemorySweetRepository {
    async fn insert(&self, sweet: &Sweet) -> Result<(), RepositoryError> {
        let mut sweets = self.sweets.lock().await;
        if sweets.contains_key(&sweet.id()) {
            return Err(RepositoryError::OperationFailed(format!(
                "商品IDが重複しています: {}",
                sweet.id()
            )));
        }
        sweets.insert(sweet.id(), sweet.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        Ok(self.sweets.lock().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        let sweets = self.sweets.lock().await;
        Ok(ids.iter().filter_map(|id| sweets.get(id).cloned()).collect())
    }

    async fn search(
        &self,
        filter: &SweetFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Sweet>, u64), RepositoryError> {
        let sweets = self.sweets.lock().await;
        let mut matched: Vec<&Sweet> = sweets.values().filter(|s| filter.matches(s)).collect();
        // 商品名の昇順（大文字小文字を区別しない）、同名の場合は登録順
        matched.sort_by_cached_key(|s| (s.name().to_lowercase(), s.created_at(), s.id()));

        let total = matched.len() as u64;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let sweets = self.sweets.lock().await;
        // 大文字小文字だけが異なるカテゴリは1件にまとめる
        let mut categories: BTreeMap<String, String> = BTreeMap::new();
        for sweet in sweets.values() {
            categories
                .entry(sweet.category().to_lowercase())
                .or_insert_with(|| sweet.category().to_string());
        }
        Ok(categories.into_values().collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.sweets.lock().await.len() as u64)
    }

    async fn update(
        &self,
        id: SweetId,
        changes: &SweetChanges,
    ) -> Result<Option<Sweet>, RepositoryError> {
        let mut sweets = self.sweets.lock().await;
        Ok(sweets.get_mut(&id).map(|sweet| {
            sweet.apply(changes);
            sweet.clone()
        }))
    }

    async fn delete(&self, id: SweetId) -> Result<bool, RepositoryError> {
        Ok(self.sweets.lock().await.remove(&id).is_some())
    }

    async fn decrement_if_available(
        &self,
        id: SweetId,
        quantity: u32,
    ) -> Result<StockDecrement, RepositoryError> {
        let mut sweets = self.sweets.lock().await;
        let Some(sweet) = sweets.get_mut(&id) else {
            return Ok(StockDecrement::NotFound);
        };
        match sweet.decrement(quantity) {
            Ok(()) => Ok(StockDecrement::Applied(sweet.clone())),
            Err(_) => Ok(StockDecrement::Insufficient {
                available: sweet.quantity(),
            }),
        }
    }

    async fn increment_quantity(
        &self,
        id: SweetId,
        delta: u32,
    ) -> Result<Option<Sweet>, RepositoryError> {
        let mut sweets = self.sweets.lock().await;
        let Some(sweet) = sweets.get_mut(&id) else {
            return Ok(None);
        };
        sweet
            .restock(delta)
            .map_err(|e| RepositoryError::MalformedRequest(e.to_string()))?;
        Ok(Some(sweet.clone()))
    }
}

/// インメモリ購入記録リポジトリ
#[derive(Default)]
pub struct InMemoryPurchaseRepository {
    // 登録順
    purchases: Mutex<Vec<Purchase>>,
}

impl InMemoryPurchaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseRepository {
    async fn insert(&self, purchase: &Purchase) -> Result<(), RepositoryError> {
        let mut purchases = self.purchases.lock().await;
        if purchases.iter().any(|p| p.id() == purchase.id()) {
            return Err(RepositoryError::OperationFailed(format!(
                "購入IDが重複しています: {}",
                purchase.id()
            )));
        }
        purchases.push(purchase.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        let purchases = self.purchases.lock().await;
        Ok(purchases.iter().find(|p| p.id() == id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = self.purchases.lock().await;
        // 新しい登録から並べ、購入日時の降順に安定ソートする
        let mut owned: Vec<Purchase> = purchases
            .iter()
            .rev()
            .filter(|p| p.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(owned)
    }

    async fn delete(&self, id: PurchaseId) -> Result<bool, RepositoryError> {
        let mut purchases = self.purchases.lock().await;
        let before = purchases.len();
        purchases.retain(|p| p.id() != id);
        Ok(purchases.len() < before)
    }

    async fn delete_owned(&self, id: PurchaseId, owner: UserId) -> Result<bool, RepositoryError> {
        let mut purchases = self.purchases.lock().await;
        let before = purchases.len();
        purchases.retain(|p| !(p.id() == id && p.is_owned_by(owner)));
        Ok(purchases.len() < before)
    }

    fn next_identity(&self) -> PurchaseId {
        PurchaseId::new()
    }
}

/// インメモリロールリポジトリ
#[derive(Default)]
pub struct InMemoryRoleRepository {
    roles: Mutex<HashMap<UserId, Role>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn find_role(&self, user_id: UserId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.roles.lock().await.get(&user_id).copied())
    }

    async fn insert_if_absent(&self, user_id: UserId, role: Role) -> Result<Role, RepositoryError> {
        Ok(*self.roles.lock().await.entry(user_id).or_insert(role))
    }
}
