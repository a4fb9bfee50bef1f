use crate::domain::model::{
    CatalogPage, Purchase, PurchaseHistoryEntry, Role, StockLevel, Sweet, SweetSnapshot, UserId,
};
use crate::domain::service::PurchaseReceipt;
use rust_decimal::Decimal;
use serde::Serialize;

/// 商品用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct SweetResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
    /// 画像未設定時はプレースホルダー
    pub display_image_url: String,
    pub stock_level: StockLevel,
    pub created_at: String,
}

/// 商品一覧用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct CatalogPageResponse {
    pub items: Vec<SweetResponse>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// 購入記録用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub user_id: String,
    pub sweet_id: String,
    pub quantity: u32,
    pub total_price: Decimal,
    pub created_at: String,
}

/// 購入完了用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct PurchaseReceiptResponse {
    pub purchase: PurchaseResponse,
    pub remaining_quantity: u32,
}

/// 購入履歴に結合した商品情報
#[derive(Debug, Serialize)]
pub struct SweetSnapshotResponse {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image_url: String,
}

/// 購入履歴の1行
#[derive(Debug, Serialize)]
pub struct PurchaseHistoryEntryResponse {
    #[serde(flatten)]
    pub purchase: PurchaseResponse,
    /// 商品が削除済みの場合はnull
    pub sweet: Option<SweetSnapshotResponse>,
    pub display_name: String,
    pub display_image_url: String,
}

/// アカウント用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user_id: String,
    pub role: Option<Role>,
}

/// サンプルデータ投入結果
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub inserted: usize,
}

impl SweetResponse {
    /// ドメインオブジェクトからSweetResponseを作成
    pub fn from_sweet(sweet: &Sweet) -> Self {
        Self {
            id: sweet.id().to_string(),
            name: sweet.name().to_string(),
            category: sweet.category().to_string(),
            price: sweet.price().amount(),
            quantity: sweet.quantity(),
            image_url: sweet.image_url().map(|s| s.to_string()),
            display_image_url: sweet.display_image_url(),
            stock_level: sweet.stock_level(),
            created_at: sweet.created_at().to_rfc3339(),
        }
    }
}

impl CatalogPageResponse {
    pub fn from_page(page: &CatalogPage) -> Self {
        Self {
            items: page.items.iter().map(SweetResponse::from_sweet).collect(),
            total_count: page.total_count,
            page: page.pagination.page(),
            page_size: page.pagination.page_size(),
            total_pages: page.total_pages(),
        }
    }
}

impl PurchaseResponse {
    pub fn from_purchase(purchase: &Purchase) -> Self {
        Self {
            id: purchase.id().to_string(),
            user_id: purchase.user_id().to_string(),
            sweet_id: purchase.sweet_id().to_string(),
            quantity: purchase.quantity(),
            total_price: purchase.total_price(),
            created_at: purchase.created_at().to_rfc3339(),
        }
    }
}

impl PurchaseReceiptResponse {
    pub fn from_receipt(receipt: &PurchaseReceipt) -> Self {
        Self {
            purchase: PurchaseResponse::from_purchase(&receipt.purchase),
            remaining_quantity: receipt.sweet.quantity(),
        }
    }
}

impl SweetSnapshotResponse {
    fn from_snapshot(snapshot: &SweetSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            category: snapshot.category.clone(),
            price: snapshot.price.amount(),
            image_url: snapshot.image_url.clone(),
        }
    }
}

impl PurchaseHistoryEntryResponse {
    pub fn from_entry(entry: &PurchaseHistoryEntry) -> Self {
        Self {
            purchase: PurchaseResponse::from_purchase(entry.purchase()),
            sweet: entry.sweet().map(SweetSnapshotResponse::from_snapshot),
            display_name: entry.display_name().to_string(),
            display_image_url: entry.display_image_url(),
        }
    }
}

impl AccountResponse {
    pub fn new(user_id: UserId, role: Option<Role>) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{NewSweet, Pagination, PurchaseId, SweetId};

    fn sweet(quantity: i64) -> Sweet {
        Sweet::create(
            SweetId::new(),
            NewSweet {
                name: "Dark Truffle".to_string(),
                category: "Chocolate".to_string(),
                price: Decimal::new(1250, 2),
                quantity,
                image_url: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_sweet_response_from_sweet() {
        let sweet = sweet(4);
        let response = SweetResponse::from_sweet(&sweet);

        assert_eq!(response.id, sweet.id().to_string());
        assert_eq!(response.price, Decimal::new(1250, 2));
        assert_eq!(response.stock_level, StockLevel::LowStock);
        assert!(response.image_url.is_none());
        assert!(response.display_image_url.contains("seed=Dark%20Truffle"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["stock_level"], "low_stock");
    }

    #[test]
    fn test_catalog_page_response() {
        let page = CatalogPage {
            items: vec![sweet(20)],
            total_count: 25,
            pagination: Pagination::new(3, 12).unwrap(),
        };
        let response = CatalogPageResponse::from_page(&page);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 3);
    }

    #[test]
    fn test_history_entry_for_deleted_sweet() {
        let sweet = sweet(5);
        let purchase = Purchase::create(PurchaseId::new(), UserId::new(), &sweet, 2).unwrap();
        let entry = PurchaseHistoryEntry::new(purchase, None);

        let response = PurchaseHistoryEntryResponse::from_entry(&entry);
        assert!(response.sweet.is_none());
        assert_eq!(response.display_name, "Unavailable item");
        assert_eq!(response.purchase.total_price, Decimal::new(2500, 2));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["sweet"].is_null());
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn test_account_response_serializes_role() {
        let response = AccountResponse::new(UserId::new(), Some(Role::Admin));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "admin");
    }
}
