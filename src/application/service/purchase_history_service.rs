use crate::application::ApplicationError;
use crate::domain::model::{PurchaseHistoryEntry, SweetId, SweetSnapshot, UserId};
use crate::domain::port::{PurchaseRepository, SweetRepository};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// 購入履歴キャッシュ
/// 利用者ごとの購入履歴ビューを保持する
///
/// 無効化のたびに世代番号を進め、読み込み開始時と世代が変わっていた場合は
/// 読み込み結果を保存しない（古い読み込み結果で新しい状態を上書きしないため）
///
/// 保存から `ttl` 以上経過したビューは未キャッシュとして扱う。
/// 保持数が `max_views` に達した場合は、期限切れのビュー、次に最も古いビューを破棄する
pub struct PurchaseHistoryCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    max_views: usize,
}

#[derive(Default)]
struct CacheState {
    generation: u64,
    views: HashMap<UserId, CachedView>,
}

struct CachedView {
    entries: Vec<PurchaseHistoryEntry>,
    stored_at: Instant,
}

impl Default for PurchaseHistoryCache {
    fn default() -> Self {
        Self::with_limits(Self::DEFAULT_TTL, Self::DEFAULT_MAX_VIEWS)
    }
}

impl PurchaseHistoryCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
    pub const DEFAULT_MAX_VIEWS: usize = 10_000;

    pub fn new() -> Self {
        Self::default()
    }

    /// 有効期限と最大保持数を指定して作成
    pub fn with_limits(ttl: Duration, max_views: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
            max_views: max_views.max(1),
        }
    }

    /// キャッシュ済みで期限内のビューを取得
    pub async fn get(&self, user_id: UserId) -> Option<Vec<PurchaseHistoryEntry>> {
        self.state
            .read()
            .await
            .views
            .get(&user_id)
            .filter(|view| view.stored_at.elapsed() < self.ttl)
            .map(|view| view.entries.clone())
    }

    /// 現在の世代番号
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// 保持しているビューの数（期限切れを含む）
    pub async fn view_count(&self) -> usize {
        self.state.read().await.views.len()
    }

    /// 読み込み開始時の世代のままであればビューを保存する
    ///
    /// # Returns
    /// * `true` - 保存した
    /// * `false` - 読み込み中に無効化されたため破棄した
    pub async fn store(
        &self,
        user_id: UserId,
        entries: Vec<PurchaseHistoryEntry>,
        loaded_at_generation: u64,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation != loaded_at_generation {
            return false;
        }
        if !state.views.contains_key(&user_id) && state.views.len() >= self.max_views {
            self.evict(&mut state.views);
        }
        state.views.insert(
            user_id,
            CachedView {
                entries,
                stored_at: Instant::now(),
            },
        );
        true
    }

    /// 指定した利用者のビューを無効化
    pub async fn invalidate(&self, user_id: UserId) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.views.remove(&user_id);
    }

    /// すべてのビューを無効化
    pub async fn invalidate_all(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.views.clear();
    }

    // 期限切れのビューを破棄し、それでも空きがなければ最も古いビューを破棄する
    fn evict(&self, views: &mut HashMap<UserId, CachedView>) {
        views.retain(|_, view| view.stored_at.elapsed() < self.ttl);
        if views.len() < self.max_views {
            return;
        }
        let oldest = views
            .iter()
            .min_by_key(|(_, view)| view.stored_at)
            .map(|(user_id, _)| *user_id);
        if let Some(user_id) = oldest {
            views.remove(&user_id);
        }
    }
}

/// 購入履歴クエリサービス
/// 呼び出し元自身の購入記録を、現在の商品情報と結合して返す
pub struct PurchaseHistoryQueryService {
    purchase_repository: Arc<dyn PurchaseRepository>,
    sweet_repository: Arc<dyn SweetRepository>,
    cache: PurchaseHistoryCache,
}

impl PurchaseHistoryQueryService {
    /// 新しい購入履歴クエリサービスを作成
    ///
    /// # Arguments
    /// * `purchase_repository` - 購入記録リポジトリ
    /// * `sweet_repository` - 商品リポジトリ（表示用の結合に使用）
    pub fn new(
        purchase_repository: Arc<dyn PurchaseRepository>,
        sweet_repository: Arc<dyn SweetRepository>,
    ) -> Self {
        Self::with_cache(purchase_repository, sweet_repository, PurchaseHistoryCache::new())
    }

    /// キャッシュの設定を指定して作成
    pub fn with_cache(
        purchase_repository: Arc<dyn PurchaseRepository>,
        sweet_repository: Arc<dyn SweetRepository>,
        cache: PurchaseHistoryCache,
    ) -> Self {
        Self {
            purchase_repository,
            sweet_repository,
            cache,
        }
    }

    /// 呼び出し元の購入履歴を取得
    /// 購入日時の降順で並べて返す
    ///
    /// # Arguments
    /// * `caller` - 呼び出し元の利用者（未認証ならNone）
    ///
    /// # Returns
    /// * `Ok(Vec<PurchaseHistoryEntry>)` - 購入履歴（未認証の場合は空）
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn list_for_user(
        &self,
        caller: Option<UserId>,
    ) -> Result<Vec<PurchaseHistoryEntry>, ApplicationError> {
        let Some(user_id) = caller else {
            return Ok(Vec::new());
        };
        if let Some(entries) = self.cache.get(user_id).await {
            return Ok(entries);
        }
        self.reload(user_id).await
    }

    /// 利用者のビューを無効化して読み込み直す
    pub async fn refresh(&self, user_id: UserId) -> Result<(), ApplicationError> {
        self.cache.invalidate(user_id).await;
        self.reload(user_id).await.map(|_| ())
    }

    /// すべてのビューを無効化する（商品情報の変更時）
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all().await;
    }

    async fn reload(&self, user_id: UserId) -> Result<Vec<PurchaseHistoryEntry>, ApplicationError> {
        let generation = self.cache.generation().await;
        let entries = self.load(user_id).await?;
        self.cache.store(user_id, entries.clone(), generation).await;
        Ok(entries)
    }

    // 所有者で絞り込んだ購入記録に、現在の商品情報を結合する
    async fn load(&self, user_id: UserId) -> Result<Vec<PurchaseHistoryEntry>, ApplicationError> {
        let purchases = self.purchase_repository.find_by_user(user_id).await?;

        let sweet_ids: Vec<SweetId> = purchases
            .iter()
            .map(|p| p.sweet_id())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let snapshots: HashMap<SweetId, SweetSnapshot> = self
            .sweet_repository
            .find_by_ids(&sweet_ids)
            .await?
            .iter()
            .map(|sweet| (sweet.id(), SweetSnapshot::from_sweet(sweet)))
            .collect();

        Ok(purchases
            .into_iter()
            .filter(|p| p.is_owned_by(user_id))
            .map(|p| {
                let snapshot = snapshots.get(&p.sweet_id()).cloned();
                PurchaseHistoryEntry::new(p, snapshot)
            })
            .collect())
    }
}
