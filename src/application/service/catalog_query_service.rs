use crate::application::ApplicationError;
use crate::domain::model::{CatalogPage, Pagination, Sweet, SweetFilter, SweetId};
use crate::domain::port::SweetRepository;
use std::sync::Arc;

/// カタログクエリサービス
/// 読み取り専用のカタログ操作を提供する
pub struct CatalogQueryService {
    sweet_repository: Arc<dyn SweetRepository>,
}

impl CatalogQueryService {
    /// 新しいカタログクエリサービスを作成
    ///
    /// # Arguments
    /// * `sweet_repository` - 商品リポジトリ
    pub fn new(sweet_repository: Arc<dyn SweetRepository>) -> Self {
        Self { sweet_repository }
    }

    /// 条件に一致する商品を1ページ分取得
    /// 商品名の昇順で並べて返す
    ///
    /// # Arguments
    /// * `filter` - 検索条件（空文字列の条件は無視される）
    /// * `pagination` - ページ指定
    ///
    /// # Returns
    /// * `Ok(CatalogPage)` - ページ内の商品と全件数（該当なしは空のページ）
    /// * `Err(ApplicationError)` - 価格範囲が不正、または取得失敗
    pub async fn list(
        &self,
        filter: SweetFilter,
        pagination: Pagination,
    ) -> Result<CatalogPage, ApplicationError> {
        let filter = filter.normalized()?;
        let (items, total_count) = self.sweet_repository.search(&filter, pagination).await?;
        Ok(CatalogPage {
            items,
            total_count,
            pagination,
        })
    }

    /// 商品IDで商品を取得
    pub async fn get(&self, id: SweetId) -> Result<Sweet, ApplicationError> {
        self.sweet_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("商品が見つかりません: {}", id)))
    }

    /// 登録済みのカテゴリ一覧（昇順・重複なし）
    pub async fn categories(&self) -> Result<Vec<String>, ApplicationError> {
        self.sweet_repository
            .categories()
            .await
            .map_err(ApplicationError::from)
    }
}
