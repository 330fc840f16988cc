//! Storage factory - Creates repository instances based on configuration
//!
//! Both backends implement every repository port on a single store type,
//! so the four handles returned here always share one backing store and
//! see each other's writes.

use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::outbound::{
    CharacterRepositoryPort, TraitCatalogRepositoryPort, TraitReviewRepositoryPort,
    VariantConfigRepositoryPort,
};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence::{InMemoryTraitStore, SqliteTraitStore};

/// The repository handles the application services are wired with
#[derive(Clone)]
pub struct EngineStores {
    pub catalog: Arc<dyn TraitCatalogRepositoryPort>,
    pub variants: Arc<dyn VariantConfigRepositoryPort>,
    pub characters: Arc<dyn CharacterRepositoryPort>,
    pub reviews: Arc<dyn TraitReviewRepositoryPort>,
}

impl EngineStores {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TraitCatalogRepositoryPort
            + VariantConfigRepositoryPort
            + CharacterRepositoryPort
            + TraitReviewRepositoryPort
            + 'static,
    {
        Self {
            catalog: store.clone(),
            variants: store.clone(),
            characters: store.clone(),
            reviews: store,
        }
    }
}

/// Storage factory for creating the configured backend
pub struct StoreFactory {
    config: EngineConfig,
}

impl StoreFactory {
    /// Create a new storage factory
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Create the repository set for the configured backend
    pub async fn create_stores(&self) -> Result<EngineStores> {
        match self.config.storage_backend.as_str() {
            "memory" => {
                tracing::info!("Using in-memory trait storage");
                Ok(EngineStores::from_store(Arc::new(InMemoryTraitStore::new())))
            }
            "sqlite" => {
                let store = SqliteTraitStore::connect(
                    &self.config.sqlite_path,
                    self.config.sqlite_max_connections,
                )
                .await?;
                Ok(EngineStores::from_store(Arc::new(store)))
            }
            backend => anyhow::bail!("Unsupported storage backend: {}", backend),
        }
    }
}
