// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod sweet;
mod purchase;
mod catalog;
mod sample;

pub use value_objects::{
    SweetId, PurchaseId, UserId,
    Price,
    Role,
    StockLevel,
};

pub use sweet::{
    placeholder_image_url, NewSweet, Sweet, SweetChanges, SweetPatch, CATEGORY_MAX_CHARS,
    NAME_MAX_CHARS,
};
pub use purchase::{Purchase, PurchaseHistoryEntry, SweetSnapshot};
pub use catalog::{CatalogPage, Pagination, SweetFilter};
pub use sample::sample_catalog;
