//! Repository ports - Interfaces for data persistence
//!
//! These traits define the contracts that storage backends must implement.
//! Application services depend on these traits, not concrete implementations.
//!
//! Every method is one atomic unit: when a method validates and then
//! mutates, concurrent callers observe either none or all of its effect,
//! and a validation failure leaves the store untouched.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::entities::{
    Character, EnumValue, EnumValueSetting, ReviewSource, Species, SpeciesVariant,
    TraitDefinition, TraitListEntry, TraitReview,
};
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{
    CharacterId, EnumValueId, SpeciesId, SpeciesVariantId, TraitId, TraitListEntryId,
    TraitReviewId, TraitValue, TraitValueRecord, UserId,
};

// =============================================================================
// Trait Catalog Repository Port
// =============================================================================

/// Repository port for the species-level trait catalog
#[async_trait]
pub trait TraitCatalogRepositoryPort: Send + Sync {
    /// Create a species
    async fn create_species(&self, species: &Species) -> Result<(), EngineError>;

    /// Get a species by ID
    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, EngineError>;

    /// Create a species variant
    async fn create_variant(&self, variant: &SpeciesVariant) -> Result<(), EngineError>;

    /// Get a variant by ID
    async fn get_variant(&self, id: SpeciesVariantId)
        -> Result<Option<SpeciesVariant>, EngineError>;

    /// Create a trait definition
    async fn create_trait(&self, definition: &TraitDefinition) -> Result<(), EngineError>;

    /// Get a trait definition by ID
    async fn get_trait(&self, id: TraitId) -> Result<Option<TraitDefinition>, EngineError>;

    /// List a species' traits, by name
    async fn list_traits(&self, species_id: SpeciesId) -> Result<Vec<TraitDefinition>, EngineError>;

    /// Create an enum value for a trait
    async fn create_enum_value(&self, value: &EnumValue) -> Result<(), EngineError>;

    /// Get an enum value by ID
    async fn get_enum_value(&self, id: EnumValueId) -> Result<Option<EnumValue>, EngineError>;

    /// Move an enum value to a new sort position, returning the updated row
    async fn update_enum_value_order(
        &self,
        id: EnumValueId,
        order: f64,
    ) -> Result<EnumValue, EngineError>;

    /// Delete an enum value together with its variant settings and any
    /// character value rows referencing it
    async fn delete_enum_value(&self, id: EnumValueId) -> Result<(), EngineError>;

    /// List a trait's enum values in catalog order
    async fn list_enum_values(&self, trait_id: TraitId) -> Result<Vec<EnumValue>, EngineError>;
}

// =============================================================================
// Variant Config Repository Port
// =============================================================================

/// Repository port for per-variant trait configuration
#[async_trait]
pub trait VariantConfigRepositoryPort: Send + Sync {
    /// Create a trait list entry, stored exactly as given including its
    /// order. Fails with `DuplicateEntry` when the (variant, trait) pair
    /// already exists.
    async fn create_entry(&self, entry: &TraitListEntry) -> Result<(), EngineError>;

    /// Get an entry by ID
    async fn get_entry(&self, id: TraitListEntryId)
        -> Result<Option<TraitListEntry>, EngineError>;

    /// Get the entry linking a variant to a trait, if present
    async fn get_entry_for_trait(
        &self,
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    ) -> Result<Option<TraitListEntry>, EngineError>;

    /// List a variant's entries in display order
    async fn list_entries(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<TraitListEntry>, EngineError>;

    /// Delete an entry along with the variant's settings for that trait's
    /// enum values. Stored character values are left alone.
    async fn delete_entry(&self, id: TraitListEntryId) -> Result<(), EngineError>;

    /// Renumber all of a variant's entries to dense 0..N-1 positions in
    /// the given order. The list must cover every entry exactly once; a
    /// rejected reorder changes nothing.
    async fn apply_reorder(
        &self,
        variant_id: SpeciesVariantId,
        ordered_trait_ids: &[TraitId],
    ) -> Result<Vec<TraitListEntry>, EngineError>;

    /// Enable an enum value for a variant. Idempotent. Fails with
    /// `TraitNotInVariant` when the value's trait has no entry there.
    async fn save_setting(&self, setting: &EnumValueSetting) -> Result<(), EngineError>;

    /// Disable an enum value for a variant. Idempotent, same validation
    /// as [`save_setting`](Self::save_setting).
    async fn delete_setting(
        &self,
        variant_id: SpeciesVariantId,
        enum_value_id: EnumValueId,
    ) -> Result<(), EngineError>;

    /// List a variant's enabled enum values
    async fn list_settings(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<EnumValueSetting>, EngineError>;
}

// =============================================================================
// Character Repository Port
// =============================================================================

/// Repository port for characters and their stored trait values
#[async_trait]
pub trait CharacterRepositoryPort: Send + Sync {
    /// Create a character
    async fn create(&self, character: &Character) -> Result<(), EngineError>;

    /// Get a character by ID
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, EngineError>;

    /// Get a character's values grouped by trait, in stored row order
    async fn get_values(
        &self,
        character_id: CharacterId,
    ) -> Result<BTreeMap<TraitId, Vec<TraitValue>>, EngineError>;

    /// Replace the character's whole value set. The new set is validated
    /// against the catalog and either lands completely or not at all.
    async fn replace_values(
        &self,
        character_id: CharacterId,
        values: &[TraitValueRecord],
    ) -> Result<(), EngineError>;
}

// =============================================================================
// Trait Review Repository Port
// =============================================================================

/// Filters for the moderation queue listing
#[derive(Debug, Clone, Default)]
pub struct PendingReviewFilter {
    pub subject_id: Option<CharacterId>,
    pub source: Option<ReviewSource>,
}

/// One page of the moderation queue, oldest first
#[derive(Debug, Clone)]
pub struct PendingReviewPage {
    pub reviews: Vec<TraitReview>,
    /// Matching pending reviews across all pages
    pub total: usize,
    pub has_more: bool,
}

/// Repository port for the review workflow
#[async_trait]
pub trait TraitReviewRepositoryPort: Send + Sync {
    /// Persist a new pending review. Fails with `ReviewAlreadyPending`
    /// when the subject already has one; the check and the insert are a
    /// single atomic step.
    async fn create_pending(&self, review: &TraitReview) -> Result<(), EngineError>;

    /// Get a review by ID
    async fn get(&self, id: TraitReviewId) -> Result<Option<TraitReview>, EngineError>;

    /// Approve a pending review and apply its proposed values to the
    /// subject, both in one atomic unit. A validation failure leaves the
    /// review pending and the values untouched.
    async fn approve(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
    ) -> Result<TraitReview, EngineError>;

    /// Reject a pending review. The subject's values are not touched.
    async fn reject(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError>;

    /// Revert a pending review by re-applying its previous snapshot to
    /// the subject, both in one atomic unit.
    async fn revert(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError>;

    /// Page through pending reviews, oldest first
    async fn list_pending(
        &self,
        filter: &PendingReviewFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PendingReviewPage, EngineError>;
}
