use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::model::{PurchaseId, SweetId, UserId};

/// イベントメタデータ
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    /// イベントID
    pub event_id: Uuid,
    /// 相関ID（同じ操作から発生したログ・イベントを結びつける）
    pub correlation_id: Uuid,
    /// イベント発生日時
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new(correlation_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id,
            occurred_at: Utc::now(),
        }
    }
}

/// ドメインイベント列挙型
/// ビジネス上の重要なイベントを表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// 商品が購入された
    SweetPurchased(SweetPurchased),
    /// 購入記録が削除された
    PurchaseDeleted(PurchaseDeleted),
    /// 在庫が補充された
    SweetRestocked(SweetRestocked),
    /// カタログが変更された（作成・更新・削除）
    CatalogChanged(CatalogChanged),
}

impl DomainEvent {
    /// イベントタイプ名
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::SweetPurchased(_) => "SweetPurchased",
            DomainEvent::PurchaseDeleted(_) => "PurchaseDeleted",
            DomainEvent::SweetRestocked(_) => "SweetRestocked",
            DomainEvent::CatalogChanged(_) => "CatalogChanged",
        }
    }

    pub fn metadata(&self) -> &EventMetadata {
        match self {
            DomainEvent::SweetPurchased(e) => &e.metadata,
            DomainEvent::PurchaseDeleted(e) => &e.metadata,
            DomainEvent::SweetRestocked(e) => &e.metadata,
            DomainEvent::CatalogChanged(e) => &e.metadata,
        }
    }
}

/// 購入完了イベント
#[derive(Debug, Clone, PartialEq)]
pub struct SweetPurchased {
    pub purchase_id: PurchaseId,
    pub buyer_id: UserId,
    pub sweet_id: SweetId,
    pub quantity: u32,
    pub total_price: Decimal,
    /// 購入後の在庫数
    pub remaining_quantity: u32,
    pub metadata: EventMetadata,
}

impl SweetPurchased {
    pub fn new(
        purchase_id: PurchaseId,
        buyer_id: UserId,
        sweet_id: SweetId,
        quantity: u32,
        total_price: Decimal,
        remaining_quantity: u32,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            purchase_id,
            buyer_id,
            sweet_id,
            quantity,
            total_price,
            remaining_quantity,
            metadata: EventMetadata::new(correlation_id),
        }
    }
}

/// 購入記録削除イベント
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseDeleted {
    pub purchase_id: PurchaseId,
    pub owner_id: UserId,
    pub metadata: EventMetadata,
}

impl PurchaseDeleted {
    pub fn new(purchase_id: PurchaseId, owner_id: UserId, correlation_id: Uuid) -> Self {
        Self {
            purchase_id,
            owner_id,
            metadata: EventMetadata::new(correlation_id),
        }
    }
}

/// 在庫補充イベント
#[derive(Debug, Clone, PartialEq)]
pub struct SweetRestocked {
    pub sweet_id: SweetId,
    pub delta: u32,
    pub new_quantity: u32,
    pub metadata: EventMetadata,
}

impl SweetRestocked {
    pub fn new(sweet_id: SweetId, delta: u32, new_quantity: u32, correlation_id: Uuid) -> Self {
        Self {
            sweet_id,
            delta,
            new_quantity,
            metadata: EventMetadata::new(correlation_id),
        }
    }
}

/// カタログ変更の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    Created,
    Updated,
    Deleted,
}

/// カタログ変更イベント
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogChanged {
    pub sweet_id: SweetId,
    pub change: CatalogChange,
    pub metadata: EventMetadata,
}

impl CatalogChanged {
    pub fn new(sweet_id: SweetId, change: CatalogChange, correlation_id: Uuid) -> Self {
        Self {
            sweet_id,
            change,
            metadata: EventMetadata::new(correlation_id),
        }
    }
}
