//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Species, TraitDefinition, Character, TraitReview, etc.
//! - Value Objects: Typed ids and trait values
//! - Domain Events: Review resolution notifications
//! - Domain Services: Validation, diffing, reorder planning
//! - Errors: Every failure the engine reports

pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;
