use crate::domain::error::DomainError;
use crate::domain::model::Sweet;
use rust_decimal::Decimal;

/// カタログ検索条件
/// 指定された条件はすべてAND結合される
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweetFilter {
    /// 商品名の部分一致（大文字小文字を区別しない）
    pub search: Option<String>,
    /// カテゴリの完全一致（大文字小文字を区別しない）
    pub category: Option<String>,
    /// 価格の下限（含む）
    pub min_price: Option<Decimal>,
    /// 価格の上限（含む）
    pub max_price: Option<Decimal>,
}

impl SweetFilter {
    /// 空文字列の条件を取り除き、価格範囲を検証する
    pub fn normalized(self) -> Result<Self, DomainError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(DomainError::InvalidArgument(format!(
                    "価格の下限({})が上限({})を超えています",
                    min, max
                )));
            }
        }

        Ok(Self {
            search: non_blank(self.search),
            category: non_blank(self.category),
            min_price: self.min_price,
            max_price: self.max_price,
        })
    }

    /// 商品が条件に一致するか判定
    pub fn matches(&self, sweet: &Sweet) -> bool {
        if let Some(search) = &self.search {
            if !sweet.name().to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if sweet.category().to_lowercase() != category.to_lowercase() {
                return false;
            }
        }
        let price = sweet.price().amount();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        true
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// ページネーション指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 12;

    /// ページ番号とページサイズを指定して作成（どちらも1以上）
    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::InvalidArgument(
                "ページ番号は1以上である必要があります".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(DomainError::InvalidArgument(
                "ページサイズは1以上である必要があります".to_string(),
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 取得開始位置 ((page - 1) × page_size)
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// 取得件数
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// カタログの1ページ分の検索結果
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Sweet>,
    /// ページングに関係なく、条件に一致する全件数
    pub total_count: u64,
    pub pagination: Pagination,
}

impl CatalogPage {
    /// 総ページ数 (ceil(total_count / page_size))
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.pagination.limit())
    }
}
