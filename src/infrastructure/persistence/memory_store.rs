//! In-memory storage adapter
//!
//! Every table lives behind a single RwLock, so one write-locked section
//! plays the role of a transaction. Methods run all of their checks
//! before the first mutation; a failure leaves the tables untouched.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::outbound::{
    CharacterRepositoryPort, PendingReviewFilter, PendingReviewPage, TraitCatalogRepositoryPort,
    TraitReviewRepositoryPort, VariantConfigRepositoryPort,
};
use crate::domain::entities::{
    Character, EnumValue, EnumValueSetting, Species, SpeciesVariant, TraitDefinition,
    TraitListEntry, TraitReview,
};
use crate::domain::errors::EngineError;
use crate::domain::services::{plan_dense_reorder, validate_value_set};
use crate::domain::value_objects::{
    CharacterId, EnumValueId, SpeciesId, SpeciesVariantId, TraitId, TraitListEntryId,
    TraitReviewId, TraitValue, TraitValueRecord, UserId,
};

#[derive(Default)]
struct MemoryTables {
    species: BTreeMap<SpeciesId, Species>,
    variants: BTreeMap<SpeciesVariantId, SpeciesVariant>,
    traits: BTreeMap<TraitId, TraitDefinition>,
    enum_values: BTreeMap<EnumValueId, EnumValue>,
    entries: BTreeMap<TraitListEntryId, TraitListEntry>,
    settings: BTreeSet<EnumValueSetting>,
    characters: BTreeMap<CharacterId, Character>,
    character_values: BTreeMap<CharacterId, Vec<TraitValueRecord>>,
    reviews: BTreeMap<TraitReviewId, TraitReview>,
}

impl MemoryTables {
    /// Validate a replacement set against the catalog and swap it in.
    /// Mutates nothing on error.
    fn validated_replace(
        &mut self,
        character_id: CharacterId,
        values: &[TraitValueRecord],
    ) -> Result<(), EngineError> {
        if !self.characters.contains_key(&character_id) {
            return Err(EngineError::CharacterNotFound(character_id));
        }
        validate_value_set(&self.traits, &self.enum_values, values)?;
        self.character_values.insert(character_id, values.to_vec());
        Ok(())
    }

    /// The setting's trait must be on the variant's list
    fn ensure_trait_listed(
        &self,
        variant_id: SpeciesVariantId,
        enum_value_id: EnumValueId,
    ) -> Result<(), EngineError> {
        let enum_value = self
            .enum_values
            .get(&enum_value_id)
            .ok_or(EngineError::EnumValueNotFound(enum_value_id))?;
        let listed = self
            .entries
            .values()
            .any(|e| e.species_variant_id == variant_id && e.trait_id == enum_value.trait_id);
        if listed {
            Ok(())
        } else {
            Err(EngineError::TraitNotInVariant {
                variant_id,
                trait_id: enum_value.trait_id,
            })
        }
    }
}

/// In-memory storage backend implementing all repository ports
#[derive(Default)]
pub struct InMemoryTraitStore {
    tables: RwLock<MemoryTables>,
}

impl InMemoryTraitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TraitCatalogRepositoryPort for InMemoryTraitStore {
    async fn create_species(&self, species: &Species) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.species.insert(species.id, species.clone());
        Ok(())
    }

    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.species.get(&id).cloned())
    }

    async fn create_variant(&self, variant: &SpeciesVariant) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.variants.insert(variant.id, variant.clone());
        Ok(())
    }

    async fn get_variant(
        &self,
        id: SpeciesVariantId,
    ) -> Result<Option<SpeciesVariant>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.variants.get(&id).cloned())
    }

    async fn create_trait(&self, definition: &TraitDefinition) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.traits.insert(definition.id, definition.clone());
        Ok(())
    }

    async fn get_trait(&self, id: TraitId) -> Result<Option<TraitDefinition>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.traits.get(&id).cloned())
    }

    async fn list_traits(
        &self,
        species_id: SpeciesId,
    ) -> Result<Vec<TraitDefinition>, EngineError> {
        let tables = self.tables.read().await;
        let mut traits: Vec<TraitDefinition> = tables
            .traits
            .values()
            .filter(|t| t.species_id == species_id)
            .cloned()
            .collect();
        traits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(traits)
    }

    async fn create_enum_value(&self, value: &EnumValue) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.enum_values.insert(value.id, value.clone());
        Ok(())
    }

    async fn get_enum_value(&self, id: EnumValueId) -> Result<Option<EnumValue>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.enum_values.get(&id).cloned())
    }

    async fn update_enum_value_order(
        &self,
        id: EnumValueId,
        order: f64,
    ) -> Result<EnumValue, EngineError> {
        let mut tables = self.tables.write().await;
        let value = tables
            .enum_values
            .get_mut(&id)
            .ok_or(EngineError::EnumValueNotFound(id))?;
        value.order = order;
        Ok(value.clone())
    }

    async fn delete_enum_value(&self, id: EnumValueId) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        if tables.enum_values.remove(&id).is_none() {
            return Err(EngineError::EnumValueNotFound(id));
        }
        tables.settings.retain(|s| s.enum_value_id != id);
        for values in tables.character_values.values_mut() {
            values.retain(|record| record.value.as_enum_value() != Some(id));
        }
        Ok(())
    }

    async fn list_enum_values(&self, trait_id: TraitId) -> Result<Vec<EnumValue>, EngineError> {
        let tables = self.tables.read().await;
        let mut values: Vec<EnumValue> = tables
            .enum_values
            .values()
            .filter(|v| v.trait_id == trait_id)
            .cloned()
            .collect();
        values.sort_by(|a, b| a.catalog_cmp(b));
        Ok(values)
    }
}

#[async_trait]
impl VariantConfigRepositoryPort for InMemoryTraitStore {
    async fn create_entry(&self, entry: &TraitListEntry) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.entries.values().any(|e| {
            e.species_variant_id == entry.species_variant_id && e.trait_id == entry.trait_id
        });
        if duplicate {
            return Err(EngineError::DuplicateEntry {
                variant_id: entry.species_variant_id,
                trait_id: entry.trait_id,
            });
        }

        tables.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(
        &self,
        id: TraitListEntryId,
    ) -> Result<Option<TraitListEntry>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.entries.get(&id).cloned())
    }

    async fn get_entry_for_trait(
        &self,
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    ) -> Result<Option<TraitListEntry>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .values()
            .find(|e| e.species_variant_id == variant_id && e.trait_id == trait_id)
            .cloned())
    }

    async fn list_entries(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<TraitListEntry> = tables
            .entries
            .values()
            .filter(|e| e.species_variant_id == variant_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.order, e.id));
        Ok(entries)
    }

    async fn delete_entry(&self, id: TraitListEntryId) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .remove(&id)
            .ok_or(EngineError::EntryNotFound(id))?;
        let owned: BTreeSet<EnumValueId> = tables
            .enum_values
            .values()
            .filter(|v| v.trait_id == entry.trait_id)
            .map(|v| v.id)
            .collect();
        tables.settings.retain(|s| {
            !(s.species_variant_id == entry.species_variant_id && owned.contains(&s.enum_value_id))
        });
        Ok(())
    }

    async fn apply_reorder(
        &self,
        variant_id: SpeciesVariantId,
        ordered_trait_ids: &[TraitId],
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        let mut tables = self.tables.write().await;
        let entries: Vec<TraitListEntry> = tables
            .entries
            .values()
            .filter(|e| e.species_variant_id == variant_id)
            .cloned()
            .collect();
        let plan = plan_dense_reorder(variant_id, &entries, ordered_trait_ids)?;

        for (entry_id, order) in plan {
            if let Some(entry) = tables.entries.get_mut(&entry_id) {
                entry.order = order;
            }
        }

        let mut updated: Vec<TraitListEntry> = tables
            .entries
            .values()
            .filter(|e| e.species_variant_id == variant_id)
            .cloned()
            .collect();
        updated.sort_by_key(|e| (e.order, e.id));
        Ok(updated)
    }

    async fn save_setting(&self, setting: &EnumValueSetting) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.ensure_trait_listed(setting.species_variant_id, setting.enum_value_id)?;
        tables.settings.insert(*setting);
        Ok(())
    }

    async fn delete_setting(
        &self,
        variant_id: SpeciesVariantId,
        enum_value_id: EnumValueId,
    ) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.ensure_trait_listed(variant_id, enum_value_id)?;
        tables
            .settings
            .remove(&EnumValueSetting::new(enum_value_id, variant_id));
        Ok(())
    }

    async fn list_settings(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<EnumValueSetting>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables
            .settings
            .iter()
            .filter(|s| s.species_variant_id == variant_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl CharacterRepositoryPort for InMemoryTraitStore {
    async fn create(&self, character: &Character) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.characters.insert(character.id, character.clone());
        Ok(())
    }

    async fn get(&self, id: CharacterId) -> Result<Option<Character>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.characters.get(&id).cloned())
    }

    async fn get_values(
        &self,
        character_id: CharacterId,
    ) -> Result<BTreeMap<TraitId, Vec<TraitValue>>, EngineError> {
        let tables = self.tables.read().await;
        if !tables.characters.contains_key(&character_id) {
            return Err(EngineError::CharacterNotFound(character_id));
        }
        let mut grouped: BTreeMap<TraitId, Vec<TraitValue>> = BTreeMap::new();
        for record in tables.character_values.get(&character_id).into_iter().flatten() {
            grouped
                .entry(record.trait_id)
                .or_default()
                .push(record.value.clone());
        }
        Ok(grouped)
    }

    async fn replace_values(
        &self,
        character_id: CharacterId,
        values: &[TraitValueRecord],
    ) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        tables.validated_replace(character_id, values)
    }
}

#[async_trait]
impl TraitReviewRepositoryPort for InMemoryTraitStore {
    async fn create_pending(&self, review: &TraitReview) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        if !tables.characters.contains_key(&review.subject_id) {
            return Err(EngineError::CharacterNotFound(review.subject_id));
        }
        let already_pending = tables
            .reviews
            .values()
            .any(|r| r.subject_id == review.subject_id && r.is_pending());
        if already_pending {
            return Err(EngineError::ReviewAlreadyPending(review.subject_id));
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn get(&self, id: TraitReviewId) -> Result<Option<TraitReview>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.get(&id).cloned())
    }

    async fn approve(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
    ) -> Result<TraitReview, EngineError> {
        let mut tables = self.tables.write().await;
        let mut review = tables
            .reviews
            .get(&id)
            .cloned()
            .ok_or(EngineError::ReviewNotFound(id))?;
        review.approve(resolver_id)?;
        tables.validated_replace(review.subject_id, &review.proposed_values)?;
        tables.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn reject(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        let mut tables = self.tables.write().await;
        let mut review = tables
            .reviews
            .get(&id)
            .cloned()
            .ok_or(EngineError::ReviewNotFound(id))?;
        review.reject(resolver_id, reason)?;
        tables.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn revert(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        let mut tables = self.tables.write().await;
        let mut review = tables
            .reviews
            .get(&id)
            .cloned()
            .ok_or(EngineError::ReviewNotFound(id))?;
        review.revert(resolver_id, reason)?;
        tables.validated_replace(review.subject_id, &review.previous_values)?;
        tables.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn list_pending(
        &self,
        filter: &PendingReviewFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PendingReviewPage, EngineError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<TraitReview> = tables
            .reviews
            .values()
            .filter(|r| r.is_pending())
            .filter(|r| filter.subject_id.map_or(true, |subject| r.subject_id == subject))
            .filter(|r| filter.source.map_or(true, |source| r.source == source))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = pending.len();
        let reviews: Vec<TraitReview> = pending.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(reviews.len()) < total;
        Ok(PendingReviewPage {
            reviews,
            total,
            has_more,
        })
    }
}
