use crate::domain::error::DomainError;
use crate::domain::model::sweet::placeholder_image_url;
use crate::domain::model::{Price, PurchaseId, Sweet, SweetId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 購入記録
/// 作成後は変更されない。合計金額は購入時点の価格のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    id: PurchaseId,
    user_id: UserId,
    sweet_id: SweetId,
    quantity: u32,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl Purchase {
    /// 商品の現在の価格から購入記録を作成
    /// 事前条件:
    /// - 数量が1以上
    /// - 数量が現在の在庫数以下
    pub fn create(
        id: PurchaseId,
        user_id: UserId,
        sweet: &Sweet,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidArgument(
                "購入数量は1以上である必要があります".to_string(),
            ));
        }
        if !sweet.has_available_stock(quantity) {
            return Err(DomainError::InsufficientStock {
                available: sweet.quantity(),
            });
        }

        let total_price = sweet.price().multiply(quantity)?;

        Ok(Self {
            id,
            user_id,
            sweet_id: sweet.id(),
            quantity,
            total_price,
            created_at: Utc::now(),
        })
    }

    /// データベースから取得したデータで購入記録を再構築
    pub fn reconstruct(
        id: PurchaseId,
        user_id: UserId,
        sweet_id: SweetId,
        quantity: u32,
        total_price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            sweet_id,
            quantity,
            total_price,
            created_at,
        }
    }

    pub fn id(&self) -> PurchaseId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn sweet_id(&self) -> SweetId {
        self.sweet_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 指定された利用者の購入記録かどうか
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// 購入履歴の表示用に結合する商品情報
/// 現在の商品状態から取得するため、価格は購入時点のものとは限らない
#[derive(Debug, Clone, PartialEq)]
pub struct SweetSnapshot {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub image_url: String,
}

impl SweetSnapshot {
    pub fn from_sweet(sweet: &Sweet) -> Self {
        Self {
            name: sweet.name().to_string(),
            category: sweet.category().to_string(),
            price: sweet.price(),
            image_url: sweet.display_image_url(),
        }
    }
}

/// 購入履歴の1行
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseHistoryEntry {
    purchase: Purchase,
    sweet: Option<SweetSnapshot>,
}

impl PurchaseHistoryEntry {
    /// 商品が削除済みの場合に表示する名前
    pub const UNAVAILABLE_NAME: &'static str = "Unavailable item";

    pub fn new(purchase: Purchase, sweet: Option<SweetSnapshot>) -> Self {
        Self { purchase, sweet }
    }

    pub fn purchase(&self) -> &Purchase {
        &self.purchase
    }

    /// 結合された商品情報（商品が削除済みならNone）
    pub fn sweet(&self) -> Option<&SweetSnapshot> {
        self.sweet.as_ref()
    }

    /// 表示名（商品削除済みならフォールバック）
    pub fn display_name(&self) -> &str {
        self.sweet
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or(Self::UNAVAILABLE_NAME)
    }

    /// 表示用画像URL（商品削除済みなら商品IDから生成したプレースホルダー）
    pub fn display_image_url(&self) -> String {
        match &self.sweet {
            Some(snapshot) => snapshot.image_url.clone(),
            None => placeholder_image_url(&self.purchase.sweet_id().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::NewSweet;
    use std::str::FromStr;

    fn sweet(price: &str, quantity: i64) -> Sweet {
        Sweet::create(
            SweetId::new(),
            NewSweet {
                name: "Rasgulla".to_string(),
                category: "Mithai".to_string(),
                price: Decimal::from_str(price).unwrap(),
                quantity,
                image_url: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_purchase_snapshots_total_price() {
        let sweet = sweet("100.00", 10);
        let purchase = Purchase::create(PurchaseId::new(), UserId::new(), &sweet, 3).unwrap();
        assert_eq!(purchase.total_price(), Decimal::from_str("300.00").unwrap());
        assert_eq!(purchase.sweet_id(), sweet.id());
        assert_eq!(purchase.quantity(), 3);
    }

    #[test]
    fn test_purchase_rejects_zero_quantity() {
        let sweet = sweet("10", 10);
        let result = Purchase::create(PurchaseId::new(), UserId::new(), &sweet, 0);
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn test_purchase_rejects_quantity_above_stock() {
        let sweet = sweet("10", 2);
        let result = Purchase::create(PurchaseId::new(), UserId::new(), &sweet, 3);
        assert_eq!(result, Err(DomainError::InsufficientStock { available: 2 }));
    }

    #[test]
    fn test_purchase_ownership() {
        let owner = UserId::new();
        let purchase = Purchase::create(PurchaseId::new(), owner, &sweet("10", 2), 1).unwrap();
        assert!(purchase.is_owned_by(owner));
        assert!(!purchase.is_owned_by(UserId::new()));
    }

    #[test]
    fn test_history_entry_fallback_when_sweet_deleted() {
        let purchase = Purchase::create(PurchaseId::new(), UserId::new(), &sweet("10", 2), 1).unwrap();
        let sweet_id = purchase.sweet_id();
        let entry = PurchaseHistoryEntry::new(purchase, None);
        assert_eq!(entry.display_name(), PurchaseHistoryEntry::UNAVAILABLE_NAME);
        assert_eq!(entry.display_image_url(), placeholder_image_url(&sweet_id.to_string()));
    }

    #[test]
    fn test_history_entry_uses_snapshot() {
        let sweet = sweet("10", 2);
        let purchase = Purchase::create(PurchaseId::new(), UserId::new(), &sweet, 1).unwrap();
        let entry = PurchaseHistoryEntry::new(purchase, Some(SweetSnapshot::from_sweet(&sweet)));
        assert_eq!(entry.display_name(), "Rasgulla");
        assert_eq!(entry.display_image_url(), sweet.display_image_url());
    }
}
