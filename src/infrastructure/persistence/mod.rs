//! Persistence - Storage backends for the trait engine
//!
//! Two interchangeable backends implement the repository ports: an
//! in-memory store for tests and development, and a SQLite store for
//! durable deployments. The factory picks one from configuration.

mod factory;
mod memory_store;
mod sqlite_store;

pub use factory::{EngineStores, StoreFactory};
pub use memory_store::InMemoryTraitStore;
pub use sqlite_store::SqliteTraitStore;
