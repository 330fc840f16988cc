//! Shared engine state

use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::outbound::{ModerationAuthorizerPort, ReviewNotifierPort};
use crate::application::services::{
    CharacterValueService, ReviewService, TraitCatalogService, VariantConfigService,
};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence::StoreFactory;

/// Shared engine state. Hosts build one of these and call the services
/// on it; all four share the storage backend picked by the config.
pub struct EngineState {
    pub config: EngineConfig,
    // Application services
    pub catalog_service: TraitCatalogService,
    pub variant_service: VariantConfigService,
    pub character_service: CharacterValueService,
    pub review_service: ReviewService,
}

impl EngineState {
    /// Wire up storage and services. The authorizer and notifier come
    /// from the host; the engine has no opinion on who may moderate or
    /// where resolution events go.
    pub async fn new(
        config: EngineConfig,
        authorizer: Arc<dyn ModerationAuthorizerPort>,
        notifier: Arc<dyn ReviewNotifierPort>,
    ) -> Result<Self> {
        // Initialize storage
        let stores = StoreFactory::new(config.clone()).create_stores().await?;

        // Initialize application services
        let catalog_service = TraitCatalogService::new(stores.catalog.clone());
        let variant_service =
            VariantConfigService::new(stores.catalog.clone(), stores.variants.clone());
        let character_service =
            CharacterValueService::new(stores.catalog.clone(), stores.characters.clone());
        let review_service = ReviewService::new(
            stores.reviews,
            stores.characters,
            stores.catalog,
            stores.variants,
            authorizer,
            notifier,
        );

        Ok(Self {
            config,
            catalog_service,
            variant_service,
            character_service,
            review_service,
        })
    }
}
