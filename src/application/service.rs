// アプリケーションサービス

mod access_control;
mod catalog_query_service;
mod inventory_admin_service;
mod purchase_history_refresher;
mod purchase_history_service;
mod purchase_service;

pub use access_control::{AccessControl, AccountService};
pub use catalog_query_service::CatalogQueryService;
pub use inventory_admin_service::InventoryAdminService;
pub use purchase_history_refresher::PurchaseHistoryRefresher;
pub use purchase_history_service::{PurchaseHistoryCache, PurchaseHistoryQueryService};
pub use purchase_service::PurchaseApplicationService;
