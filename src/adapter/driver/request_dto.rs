use crate::domain::model::{NewSweet, Pagination, SweetFilter, SweetPatch};
use crate::domain::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// 商品登録用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateSweetRequest {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<CreateSweetRequest> for NewSweet {
    fn from(request: CreateSweetRequest) -> Self {
        NewSweet {
            name: request.name,
            category: request.category,
            price: request.price,
            quantity: request.quantity,
            image_url: request.image_url,
        }
    }
}

/// 商品更新用のリクエストDTO
/// 省略したフィールドは変更しない。image_urlにnullを指定すると画像を削除する
#[derive(Default, Deserialize)]
pub struct UpdateSweetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub image_url: Option<Option<String>>,
}

// フィールドが存在すればnullでもSomeにする
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<UpdateSweetRequest> for SweetPatch {
    fn from(request: UpdateSweetRequest) -> Self {
        SweetPatch {
            name: request.name,
            category: request.category,
            price: request.price,
            quantity: request.quantity,
            image_url: request.image_url,
        }
    }
}

/// 在庫補充用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

fn default_purchase_quantity() -> i64 {
    1
}

/// 購入用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default = "default_purchase_quantity")]
    pub quantity: i64,
}

/// 商品一覧取得用のクエリパラメータ
#[derive(Default, Deserialize)]
pub struct CatalogQueryParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl CatalogQueryParams {
    /// 検索条件とページ指定に変換
    pub fn into_query(self) -> Result<(SweetFilter, Pagination), DomainError> {
        let pagination = Pagination::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(Pagination::DEFAULT_PAGE_SIZE),
        )?;
        let filter = SweetFilter {
            search: self.search,
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
        };
        Ok((filter, pagination))
    }
}
