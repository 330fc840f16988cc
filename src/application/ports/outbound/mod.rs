//! Outbound ports - Interfaces that the application requires from external systems

mod moderation_port;
mod repository_port;

pub use moderation_port::{ModerationAuthorizerPort, ReviewNotifierPort};
pub use repository_port::{
    CharacterRepositoryPort, PendingReviewFilter, PendingReviewPage, TraitCatalogRepositoryPort,
    TraitReviewRepositoryPort, VariantConfigRepositoryPort,
};
