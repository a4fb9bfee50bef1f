use crate::domain::error::DomainError;
use crate::domain::model::{Price, StockLevel, SweetId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 商品名の最大文字数
pub const NAME_MAX_CHARS: usize = 100;
/// カテゴリ名の最大文字数
pub const CATEGORY_MAX_CHARS: usize = 50;

/// スイーツ集約
/// カタログ上の1商品と、その在庫数を管理する
#[derive(Debug, Clone, PartialEq)]
pub struct Sweet {
    id: SweetId,
    name: String,
    category: String,
    price: Price,
    quantity: u32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

/// 商品作成用の入力値（未検証）
#[derive(Debug, Clone, PartialEq)]
pub struct NewSweet {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: i64,
    pub image_url: Option<String>,
}

/// 商品の部分更新用の入力値（未検証）
/// Noneのフィールドは変更しない
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweetPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    /// Some(None)で画像URLを削除する
    pub image_url: Option<Option<String>>,
}

/// 検証済みの変更内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweetChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    pub quantity: Option<u32>,
    pub image_url: Option<Option<String>>,
}

impl SweetChanges {
    /// 変更が一つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.image_url.is_none()
    }
}

impl SweetPatch {
    /// 入力値を検証して変更内容に変換する
    pub fn validate(&self) -> Result<SweetChanges, DomainError> {
        Ok(SweetChanges {
            name: self.name.as_deref().map(validate_name).transpose()?,
            category: self.category.as_deref().map(validate_category).transpose()?,
            price: self.price.map(Price::new).transpose()?,
            quantity: self.quantity.map(validate_quantity).transpose()?,
            image_url: self.image_url.as_ref().map(|url| normalize_image_url(url.as_deref())),
        })
    }
}

impl Sweet {
    /// 入力値を検証して新しい商品を作成
    pub fn create(id: SweetId, input: NewSweet) -> Result<Self, DomainError> {
        let name = validate_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let price = Price::new(input.price)?;
        let quantity = validate_quantity(input.quantity)?;

        Ok(Self {
            id,
            name,
            category,
            price,
            quantity,
            image_url: normalize_image_url(input.image_url.as_deref()),
            created_at: Utc::now(),
        })
    }

    /// データベースから取得したデータで商品を再構築
    /// リポジトリでの使用を想定
    pub fn reconstruct(
        id: SweetId,
        name: String,
        category: String,
        price: Price,
        quantity: u32,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            category,
            price,
            quantity,
            image_url,
            created_at,
        }
    }

    pub fn id(&self) -> SweetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// 現在の在庫数を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 表示用の画像URL
    /// 画像が未設定の場合は商品名から決定的なプレースホルダーを生成する
    pub fn display_image_url(&self) -> String {
        match &self.image_url {
            Some(url) => url.clone(),
            None => placeholder_image_url(&self.name),
        }
    }

    /// 在庫状況を取得
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::from_quantity(self.quantity)
    }

    /// 指定された数量の在庫が利用可能かチェック
    pub fn has_available_stock(&self, quantity: u32) -> bool {
        self.quantity >= quantity
    }

    /// 在庫を減らす
    ///
    /// # Returns
    /// * `Ok(())` - 成功
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足（在庫数は変更されない）
    pub fn decrement(&mut self, quantity: u32) -> Result<(), DomainError> {
        if !self.has_available_stock(quantity) {
            return Err(DomainError::InsufficientStock {
                available: self.quantity,
            });
        }
        self.quantity -= quantity;
        Ok(())
    }

    /// 在庫を補充する
    pub fn restock(&mut self, delta: u32) -> Result<(), DomainError> {
        self.quantity = self.quantity.checked_add(delta).ok_or_else(|| {
            DomainError::InvalidArgument("補充後の在庫数が上限を超えています".to_string())
        })?;
        Ok(())
    }

    /// 検証済みの変更内容を適用する
    pub fn apply(&mut self, changes: &SweetChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(image_url) = &changes.image_url {
            self.image_url = image_url.clone();
        }
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name", "商品名は必須です"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(
            "name",
            "商品名は100文字以内である必要があります",
        ));
    }
    Ok(name.to_string())
}

fn validate_category(category: &str) -> Result<String, DomainError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(DomainError::validation("category", "カテゴリは必須です"));
    }
    if category.chars().count() > CATEGORY_MAX_CHARS {
        return Err(DomainError::validation(
            "category",
            "カテゴリは50文字以内である必要があります",
        ));
    }
    Ok(category.to_string())
}

fn validate_quantity(quantity: i64) -> Result<u32, DomainError> {
    if quantity < 0 {
        return Err(DomainError::validation("quantity", "在庫数は0以上である必要があります"));
    }
    u32::try_from(quantity)
        .map_err(|_| DomainError::validation("quantity", "在庫数が上限を超えています"))
}

// 空文字列は未設定として扱う
fn normalize_image_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// シード文字列から決定的なプレースホルダー画像URLを生成
pub fn placeholder_image_url(seed: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/shapes/svg?seed={}&backgroundColor=ffd5dc,ffe0e5,ffebef&size=400",
        encode_uri_component(seed)
    )
}

fn encode_uri_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
