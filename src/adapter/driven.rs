// 駆動される側アダプター（リポジトリ実装など）

mod event_bus;
mod in_memory;
mod purchase_repository;
mod role_repository;
mod sweet_repository;
mod tracing_logger;

pub use event_bus::{EventBusConfig, InMemoryEventBus};
pub use in_memory::{InMemoryPurchaseRepository, InMemoryRoleRepository, InMemorySweetRepository};
pub use purchase_repository::MySqlPurchaseRepository;
pub use role_repository::MySqlRoleRepository;
pub use sweet_repository::MySqlSweetRepository;
pub use tracing_logger::TracingLogger;
