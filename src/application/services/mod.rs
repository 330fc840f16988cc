//! Application services - Use case implementations
//!
//! This module contains the application services that implement the use cases
//! for the Menagerie Engine. Each service follows hexagonal architecture
//! principles, accepting repository dependencies and returning domain entities.

pub mod character_value_service;
pub mod review_service;
pub mod trait_catalog_service;
pub mod variant_config_service;

// Re-export catalog service types
pub use trait_catalog_service::{DefineTraitRequest, TraitCatalogService};

// Re-export variant configuration service types
pub use variant_config_service::{AddTraitRequest, VariantConfigService};

// Re-export character value service
pub use character_value_service::CharacterValueService;

// Re-export review service types
pub use review_service::{ProposeChangesRequest, ReviewService};
