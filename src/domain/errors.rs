//! Engine errors - every failure the trait engine reports to callers

use thiserror::Error;

use crate::domain::value_objects::{
    CharacterId, EnumValueId, SpeciesId, SpeciesVariantId, TraitId, TraitListEntryId,
    TraitReviewId, TraitValueType, UserId,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Species not found: {0}")]
    SpeciesNotFound(SpeciesId),

    #[error("Species variant not found: {0}")]
    VariantNotFound(SpeciesVariantId),

    #[error("Trait not found: {0}")]
    TraitNotFound(TraitId),

    #[error("Enum value not found: {0}")]
    EnumValueNotFound(EnumValueId),

    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Review not found: {0}")]
    ReviewNotFound(TraitReviewId),

    #[error("Trait list entry not found: {0}")]
    EntryNotFound(TraitListEntryId),

    #[error("Trait {trait_id} belongs to a different species than variant {variant_id}")]
    SpeciesMismatch {
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    },

    #[error("Variant {variant_id} already lists trait {trait_id}")]
    DuplicateEntry {
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    },

    #[error("Trait {0} is not enum-typed")]
    InvalidTraitType(TraitId),

    #[error("Trait {trait_id} expects a {expected} value, got {actual}")]
    TypeMismatch {
        trait_id: TraitId,
        expected: TraitValueType,
        actual: TraitValueType,
    },

    #[error("Enum value {enum_value_id} does not belong to trait {trait_id}")]
    EnumValueNotInTrait {
        trait_id: TraitId,
        enum_value_id: EnumValueId,
    },

    #[error("Trait {0} does not allow multiple values")]
    MultiplicityViolation(TraitId),

    #[error("Duplicate value for trait {0}")]
    DuplicateValue(TraitId),

    #[error("Trait {trait_id} is not listed for variant {variant_id}")]
    TraitNotInVariant {
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    },

    #[error("Reorder references trait {trait_id} which is not listed for variant {variant_id}")]
    UnknownTraitInVariant {
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    },

    #[error("Reorder for variant {variant_id} names {provided} traits but {expected} are listed")]
    IncompleteReorder {
        variant_id: SpeciesVariantId,
        expected: usize,
        provided: usize,
    },

    #[error("Character {0} already has a pending review")]
    ReviewAlreadyPending(CharacterId),

    #[error("Review already resolved: {0}")]
    ReviewAlreadyResolved(TraitReviewId),

    #[error("A resolution reason is required")]
    MissingResolutionReason,

    #[error("Not authorized: {actor} cannot moderate reviews for character {subject}")]
    NotAuthorized {
        actor: UserId,
        subject: CharacterId,
    },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
