//! Menagerie Engine - Trait configuration and review core for character masterlists
//!
//! The engine manages:
//! - Species-level trait catalogs with typed traits and ordered enum options
//! - Per-variant trait lists with display ordering and option curation
//! - Character trait values, validated against the catalog on every write
//! - A review workflow that gates value changes behind moderation
//!
//! Hosts embed the engine by building an [`EngineState`] from an
//! [`EngineConfig`] plus their own authorization and notification hooks,
//! then calling the services on it.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::services::{
    AddTraitRequest, CharacterValueService, DefineTraitRequest, ProposeChangesRequest,
    ReviewService, TraitCatalogService, VariantConfigService,
};
pub use domain::errors::EngineError;
pub use infrastructure::config::EngineConfig;
pub use infrastructure::state::EngineState;
