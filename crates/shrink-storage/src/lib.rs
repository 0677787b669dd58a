//! Mapping store backends for the shrink URL shortener.

pub mod memory;
pub mod mysql;
pub mod timeout;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use shrink_core::repository::{ConflictKey, InsertOutcome, Repository, UrlRecord};
pub use shrink_core::StorageError;
pub use timeout::TimeoutRepository;
