use crate::domain::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 商品（スイーツ）の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SweetId(Uuid);

impl SweetId {
    /// 新しい一意のSweetIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから SweetId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からSweetIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SweetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SweetId {
    fn default() -> Self {
        Self::new()
    }
}

/// 購入記録の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    /// 新しい一意のPurchaseIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから PurchaseId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からPurchaseIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for PurchaseId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者（購入者・管理者）の識別子
/// 外部の認証サービスが発行したIDをそのまま保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// 新しい一意のUserIdを生成（テスト・シード用）
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから UserId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からUserIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// 価格を表す値オブジェクト
/// 0.01〜99999999.99、小数点以下2桁まで（DECIMAL(10, 2) 列に収まる範囲）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// 許容される最小価格（0.01）
    pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
    /// 許容される最大価格（99999999.99）
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);
    /// 購入金額の上限（9999999999.99、DECIMAL(12, 2) 列に収まる範囲）
    pub const TOTAL_MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);
    /// 小数点以下の最大桁数
    pub const SCALE: u32 = 2;

    /// 価格を作成
    /// 範囲外、または小数点以下3桁以上の価格はエラー
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount < Self::MIN {
            return Err(DomainError::validation(
                "price",
                "価格は0.01以上である必要があります",
            ));
        }
        if amount > Self::MAX {
            return Err(DomainError::validation(
                "price",
                "価格は99999999.99以下である必要があります",
            ));
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(DomainError::validation(
                "price",
                "価格は小数点以下2桁までです",
            ));
        }
        Ok(Self(amount.round_dp(Self::SCALE)))
    }

    /// 検証済みの値から価格を再構築（リポジトリでの使用を想定）
    pub fn from_stored(amount: Decimal) -> Self {
        Self(amount)
    }

    /// 金額を取得
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// 数量を乗算した合計金額を計算
    /// 合計金額が上限を超える場合はエラー
    pub fn multiply(&self, quantity: u32) -> Result<Decimal, DomainError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .filter(|total| *total <= Self::TOTAL_MAX)
            .ok_or_else(|| {
                DomainError::validation("quantity", "購入金額が上限を超えています")
            })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// 利用者のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 管理者（在庫管理が可能）
    Admin,
    /// 一般利用者
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role_str = match self {
            Role::Admin => "admin",
            Role::User => "user",
        };
        write!(f, "{}", role_str)
    }
}

impl Role {
    /// 文字列からRoleを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(DomainError::InvalidArgument(format!(
                "無効なロール: {}",
                s
            ))),
        }
    }

    /// 管理者ロールかどうか
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// 在庫状況
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// 在庫切れ
    OutOfStock,
    /// 残りわずか（10個以下）
    LowStock,
    /// 在庫あり
    InStock,
}

impl StockLevel {
    /// 残りわずかと判定する上限数
    pub const LOW_STOCK_THRESHOLD: u32 = 10;

    /// 在庫数から在庫状況を判定
    pub fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => StockLevel::OutOfStock,
            1..=Self::LOW_STOCK_THRESHOLD => StockLevel::LowStock,
            _ => StockLevel::InStock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sweet_id_creation() {
        let id1 = SweetId::new();
        let id2 = SweetId::new();
        assert_ne!(id1, id2, "Each SweetId should be unique");
    }

    #[test]
    fn test_sweet_id_round_trip_through_string() {
        let id = SweetId::new();
        let parsed = SweetId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(SweetId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_price_minimum_boundary() {
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Price::new(Decimal::from_str("0.009").unwrap()).is_err());
        assert!(Price::new(Decimal::from_str("0.01").unwrap()).is_ok());
    }

    #[test]
    fn test_price_rejects_negative() {
        let result = Price::new(Decimal::from_str("-5.00").unwrap());
        assert!(matches!(
            result,
            Err(DomainError::Validation { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_price_multiply() {
        let price = Price::new(Decimal::from_str("100.00").unwrap()).unwrap();
        assert_eq!(price.multiply(3).unwrap(), Decimal::from_str("300.00").unwrap());
    }

    #[test]
    fn test_price_bounds_match_column_width() {
        assert_eq!(Price::MAX.to_string(), "99999999.99");
        assert_eq!(Price::TOTAL_MAX.to_string(), "9999999999.99");
    }

    #[test]
    fn test_price_maximum_boundary() {
        assert!(Price::new(Price::MAX).is_ok());
        assert!(Price::new(Decimal::from_str("100000000.00").unwrap()).is_err());
        assert!(matches!(
            Price::new(Decimal::MAX),
            Err(DomainError::Validation { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_price_rejects_more_than_two_decimals() {
        assert!(Price::new(Decimal::from_str("1.005").unwrap()).is_err());
        // 末尾の0は桁数に数えない
        let price = Price::new(Decimal::from_str("1.500").unwrap()).unwrap();
        assert_eq!(price.amount().to_string(), "1.50");
    }

    #[test]
    fn test_price_multiply_over_total_limit_is_error() {
        let price = Price::new(Price::MAX).unwrap();
        assert_eq!(price.multiply(100).unwrap(), Decimal::from_str("9999999999.00").unwrap());
        assert!(matches!(
            price.multiply(101),
            Err(DomainError::Validation { ref field, .. }) if field == "quantity"
        ));
        assert!(price.multiply(u32::MAX).is_err());
    }

    #[test]
    fn test_price_display_has_two_decimals() {
        let price = Price::new(Decimal::from(450)).unwrap();
        assert_eq!(price.to_string(), "450.00");
    }

    #[test]
    fn test_role_from_string() {
        assert_eq!(Role::from_string("admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_string("user").unwrap(), Role::User);
        assert!(Role::from_string("Admin").is_err()); // 大文字小文字が違う
        assert!(Role::from_string("").is_err());
    }

    #[test]
    fn test_role_default_is_user() {
        assert_eq!(Role::default(), Role::User);
        assert!(!Role::default().is_admin());
    }

    #[test]
    fn test_stock_level_from_quantity() {
        assert_eq!(StockLevel::from_quantity(0), StockLevel::OutOfStock);
        assert_eq!(StockLevel::from_quantity(1), StockLevel::LowStock);
        assert_eq!(StockLevel::from_quantity(10), StockLevel::LowStock);
        assert_eq!(StockLevel::from_quantity(11), StockLevel::InStock);
    }
}
