//! Variant Config Service - Application service for per-variant trait lists
//!
//! This service decides which catalog traits a variant's sheet carries, in
//! what order, and which enum options are selectable for that variant.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::ports::outbound::{TraitCatalogRepositoryPort, VariantConfigRepositoryPort};
use crate::domain::entities::{EnumValue, EnumValueSetting, TraitListEntry};
use crate::domain::errors::EngineError;
use crate::domain::services::validate_value;
use crate::domain::value_objects::{
    EnumValueId, SpeciesVariantId, TraitId, TraitListEntryId, TraitValue, TraitValueType,
};

/// Request to add a catalog trait to a variant's list
#[derive(Debug, Clone)]
pub struct AddTraitRequest {
    pub variant_id: SpeciesVariantId,
    pub trait_id: TraitId,
    /// Position in the variant's list; stored as given, ties sort by id
    pub order: i64,
    pub required: bool,
    pub default_value: Option<TraitValue>,
}

/// Service for managing per-variant trait configuration
pub struct VariantConfigService {
    catalog: Arc<dyn TraitCatalogRepositoryPort>,
    config: Arc<dyn VariantConfigRepositoryPort>,
}

impl VariantConfigService {
    pub fn new(
        catalog: Arc<dyn TraitCatalogRepositoryPort>,
        config: Arc<dyn VariantConfigRepositoryPort>,
    ) -> Self {
        Self { catalog, config }
    }

    /// Add a trait to a variant's list at the requested position. The trait
    /// must belong to the variant's species, and a default value must fit
    /// the trait's shape.
    #[instrument(
        skip(self),
        fields(variant_id = %request.variant_id, trait_id = %request.trait_id)
    )]
    pub async fn add_trait_to_variant(
        &self,
        request: AddTraitRequest,
    ) -> Result<TraitListEntry, EngineError> {
        let variant = self
            .catalog
            .get_variant(request.variant_id)
            .await?
            .ok_or(EngineError::VariantNotFound(request.variant_id))?;
        let definition = self
            .catalog
            .get_trait(request.trait_id)
            .await?
            .ok_or(EngineError::TraitNotFound(request.trait_id))?;

        if definition.species_id != variant.species_id {
            return Err(EngineError::SpeciesMismatch {
                variant_id: request.variant_id,
                trait_id: request.trait_id,
            });
        }

        if let Some(ref default_value) = request.default_value {
            let enum_values = self.referenced_enum_values(default_value).await?;
            validate_value(&definition, &enum_values, default_value)?;
        }

        let mut entry = TraitListEntry::new(
            request.variant_id,
            request.trait_id,
            request.order,
            definition.value_type,
        );
        if request.required {
            entry = entry.with_required();
        }
        if let Some(default_value) = request.default_value {
            entry = entry.with_default_value(default_value);
        }

        self.config.create_entry(&entry).await?;

        info!(
            entry_id = %entry.id,
            order = entry.order,
            "Added trait {} to variant {}",
            definition.name,
            variant.name
        );
        Ok(entry)
    }

    /// Remove a trait from a variant's list. The variant's settings for
    /// that trait's enum values go with it; stored character values stay.
    #[instrument(skip(self))]
    pub async fn remove_trait_from_variant(
        &self,
        entry_id: TraitListEntryId,
    ) -> Result<(), EngineError> {
        self.config.delete_entry(entry_id).await?;

        info!(entry_id = %entry_id, "Removed trait list entry");
        Ok(())
    }

    /// Reorder a variant's whole trait list at once. The input must name
    /// every listed trait exactly once and is applied all-or-nothing.
    #[instrument(
        skip(self, ordered_trait_ids),
        fields(variant_id = %variant_id, count = ordered_trait_ids.len())
    )]
    pub async fn reorder_traits(
        &self,
        variant_id: SpeciesVariantId,
        ordered_trait_ids: &[TraitId],
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        self.catalog
            .get_variant(variant_id)
            .await?
            .ok_or(EngineError::VariantNotFound(variant_id))?;

        let entries = self.config.apply_reorder(variant_id, ordered_trait_ids).await?;

        info!(variant_id = %variant_id, "Reordered {} trait list entries", entries.len());
        Ok(entries)
    }

    /// Enable or disable one enum option for a variant. Both directions
    /// are idempotent and require the option's trait to be listed for
    /// the variant.
    #[instrument(
        skip(self),
        fields(variant_id = %variant_id, enum_value_id = %enum_value_id, enabled = enabled)
    )]
    pub async fn set_enum_value_enabled(
        &self,
        variant_id: SpeciesVariantId,
        enum_value_id: EnumValueId,
        enabled: bool,
    ) -> Result<(), EngineError> {
        if enabled {
            let setting = EnumValueSetting::new(enum_value_id, variant_id);
            self.config.save_setting(&setting).await?;
        } else {
            self.config.delete_setting(variant_id, enum_value_id).await?;
        }

        debug!(
            variant_id = %variant_id,
            enum_value_id = %enum_value_id,
            "Enum value {} for variant",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// List a variant's entries in display order
    #[instrument(skip(self))]
    pub async fn list_entries(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        debug!(variant_id = %variant_id, "Listing trait list entries");

        self.catalog
            .get_variant(variant_id)
            .await?
            .ok_or(EngineError::VariantNotFound(variant_id))?;

        self.config.list_entries(variant_id).await
    }

    /// The options of one trait a character of this variant may pick, in
    /// catalog order. A trait with no enabled options yields an empty
    /// list; interpreting that as "nothing selectable" or "not curated"
    /// is left to the caller.
    #[instrument(skip(self), fields(variant_id = %variant_id, trait_id = %trait_id))]
    pub async fn effective_options(
        &self,
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    ) -> Result<Vec<EnumValue>, EngineError> {
        self.catalog
            .get_variant(variant_id)
            .await?
            .ok_or(EngineError::VariantNotFound(variant_id))?;
        self.catalog
            .get_trait(trait_id)
            .await?
            .ok_or(EngineError::TraitNotFound(trait_id))?;

        let enabled: BTreeSet<EnumValueId> = self
            .config
            .list_settings(variant_id)
            .await?
            .into_iter()
            .map(|s| s.enum_value_id)
            .collect();

        let options = self
            .catalog
            .list_enum_values(trait_id)
            .await?
            .into_iter()
            .filter(|value| enabled.contains(&value.id))
            .collect();
        Ok(options)
    }

    /// The enum value a default references, looked up by id rather than
    /// through the trait's own option list, so an option belonging to a
    /// different trait still surfaces for the wrong-trait check
    async fn referenced_enum_values(
        &self,
        value: &TraitValue,
    ) -> Result<BTreeMap<EnumValueId, EnumValue>, EngineError> {
        let mut enum_values = BTreeMap::new();
        if let Some(enum_value_id) = value.as_enum_value() {
            if let Some(enum_value) = self.catalog.get_enum_value(enum_value_id).await? {
                enum_values.insert(enum_value_id, enum_value);
            }
        }
        Ok(enum_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::trait_catalog_service::{
        DefineTraitRequest, TraitCatalogService,
    };
    use crate::domain::entities::{Species, SpeciesVariant, TraitDefinition};
    use crate::infrastructure::persistence::InMemoryTraitStore;

    struct Fixture {
        catalog: TraitCatalogService,
        config: VariantConfigService,
        species: Species,
        variant: SpeciesVariant,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTraitStore::new());
        let catalog = TraitCatalogService::new(store.clone());
        let config = VariantConfigService::new(store.clone(), store);

        let species = catalog.create_species("Dragon").await.unwrap();
        let variant = catalog.create_variant(species.id, "Royal").await.unwrap();
        Fixture {
            catalog,
            config,
            species,
            variant,
        }
    }

    impl Fixture {
        async fn define_trait(&self, name: &str, value_type: TraitValueType) -> TraitDefinition {
            self.catalog
                .define_trait(DefineTraitRequest {
                    species_id: self.species.id,
                    name: name.to_string(),
                    value_type,
                    allows_multiple_values: false,
                })
                .await
                .unwrap()
        }

        async fn add_plain(&self, trait_id: TraitId, order: i64) -> TraitListEntry {
            self.config
                .add_trait_to_variant(AddTraitRequest {
                    variant_id: self.variant.id,
                    trait_id,
                    order,
                    required: false,
                    default_value: None,
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn entry_is_stored_at_the_requested_position() {
        let fx = fixture().await;
        let age = fx.define_trait("Age", TraitValueType::Integer).await;
        let name = fx.define_trait("Nickname", TraitValueType::String).await;

        let second = fx.add_plain(age.id, 1).await;
        let first = fx.add_plain(name.id, 0).await;

        assert_eq!(second.order, 1);
        assert_eq!(first.order, 0);
        let listed = fx.config.list_entries(fx.variant.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|e| e.trait_id).collect::<Vec<_>>(),
            vec![name.id, age.id]
        );
    }

    #[tokio::test]
    async fn duplicate_entry_is_rejected() {
        let fx = fixture().await;
        let age = fx.define_trait("Age", TraitValueType::Integer).await;
        fx.add_plain(age.id, 0).await;

        let err = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: age.id,
                order: 1,
                required: true,
                default_value: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateEntry { .. }));
    }

    #[tokio::test]
    async fn trait_of_another_species_is_rejected() {
        let fx = fixture().await;
        let other_species = fx.catalog.create_species("Gryphon").await.unwrap();
        let foreign = fx
            .catalog
            .define_trait(DefineTraitRequest {
                species_id: other_species.id,
                name: "Feathers".to_string(),
                value_type: TraitValueType::String,
                allows_multiple_values: false,
            })
            .await
            .unwrap();

        let err = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: foreign.id,
                order: 0,
                required: false,
                default_value: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SpeciesMismatch { .. }));
    }

    #[tokio::test]
    async fn integer_default_must_be_integer() {
        let fx = fixture().await;
        let age = fx.define_trait("Age", TraitValueType::Integer).await;

        let accepted = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: age.id,
                order: 0,
                required: false,
                default_value: Some(TraitValue::Integer(5)),
            })
            .await
            .unwrap();
        assert_eq!(accepted.default_value, Some(TraitValue::Integer(5)));

        let height = fx.define_trait("Height", TraitValueType::Integer).await;
        let err = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: height.id,
                order: 1,
                required: false,
                default_value: Some(TraitValue::String("five".to_string())),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn enum_default_must_reference_own_option() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        let other = fx.define_trait("Eye Color", TraitValueType::Enum).await;
        let red = fx
            .catalog
            .add_enum_value(color.id, "Red", 1.0)
            .await
            .unwrap();

        let err = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: other.id,
                order: 0,
                required: false,
                default_value: Some(TraitValue::Enum(red.id)),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EnumValueNotInTrait { .. }));
    }

    #[tokio::test]
    async fn enum_default_requires_existing_option() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;

        let err = fx
            .config
            .add_trait_to_variant(AddTraitRequest {
                variant_id: fx.variant.id,
                trait_id: color.id,
                order: 0,
                required: false,
                default_value: Some(TraitValue::Enum(EnumValueId::new())),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EnumValueNotFound(_)));
    }

    #[tokio::test]
    async fn reorder_assigns_dense_positions() {
        let fx = fixture().await;
        let age = fx.define_trait("Age", TraitValueType::Integer).await;
        let name = fx.define_trait("Nickname", TraitValueType::String).await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        for (order, id) in [age.id, name.id, color.id].into_iter().enumerate() {
            fx.add_plain(id, order as i64).await;
        }

        let reordered = fx
            .config
            .reorder_traits(fx.variant.id, &[color.id, age.id, name.id])
            .await
            .unwrap();

        assert_eq!(
            reordered.iter().map(|e| e.trait_id).collect::<Vec<_>>(),
            vec![color.id, age.id, name.id]
        );
        assert_eq!(
            reordered.iter().map(|e| e.order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn incomplete_reorder_changes_nothing() {
        let fx = fixture().await;
        let age = fx.define_trait("Age", TraitValueType::Integer).await;
        let name = fx.define_trait("Nickname", TraitValueType::String).await;
        fx.add_plain(age.id, 0).await;
        fx.add_plain(name.id, 1).await;

        let err = fx
            .config
            .reorder_traits(fx.variant.id, &[name.id])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IncompleteReorder { .. }));

        let listed = fx.config.list_entries(fx.variant.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|e| e.trait_id).collect::<Vec<_>>(),
            vec![age.id, name.id]
        );
    }

    #[tokio::test]
    async fn enabling_option_requires_listed_trait() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        let red = fx
            .catalog
            .add_enum_value(color.id, "Red", 1.0)
            .await
            .unwrap();

        let err = fx
            .config
            .set_enum_value_enabled(fx.variant.id, red.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TraitNotInVariant { .. }));
    }

    #[tokio::test]
    async fn effective_options_intersects_catalog_and_settings() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        fx.add_plain(color.id, 0).await;

        let red = fx
            .catalog
            .add_enum_value(color.id, "Red", 1.0)
            .await
            .unwrap();
        let blue = fx
            .catalog
            .add_enum_value(color.id, "Blue", 2.0)
            .await
            .unwrap();
        let green = fx
            .catalog
            .add_enum_value(color.id, "Green", 3.0)
            .await
            .unwrap();

        fx.config
            .set_enum_value_enabled(fx.variant.id, green.id, true)
            .await
            .unwrap();
        fx.config
            .set_enum_value_enabled(fx.variant.id, red.id, true)
            .await
            .unwrap();
        // toggling off again leaves only red enabled
        fx.config
            .set_enum_value_enabled(fx.variant.id, green.id, false)
            .await
            .unwrap();

        let options = fx
            .config
            .effective_options(fx.variant.id, color.id)
            .await
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].id, red.id);
        assert_ne!(options[0].id, blue.id);
    }

    #[tokio::test]
    async fn disabling_is_idempotent() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        fx.add_plain(color.id, 0).await;
        let red = fx
            .catalog
            .add_enum_value(color.id, "Red", 1.0)
            .await
            .unwrap();

        // never enabled; disabling is still fine
        fx.config
            .set_enum_value_enabled(fx.variant.id, red.id, false)
            .await
            .unwrap();
        fx.config
            .set_enum_value_enabled(fx.variant.id, red.id, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn removed_entry_no_longer_accepts_settings() {
        let fx = fixture().await;
        let color = fx.define_trait("Scale Color", TraitValueType::Enum).await;
        let entry = fx.add_plain(color.id, 0).await;
        let red = fx
            .catalog
            .add_enum_value(color.id, "Red", 1.0)
            .await
            .unwrap();
        fx.config
            .set_enum_value_enabled(fx.variant.id, red.id, true)
            .await
            .unwrap();

        fx.config
            .remove_trait_from_variant(entry.id)
            .await
            .unwrap();

        let err = fx
            .config
            .set_enum_value_enabled(fx.variant.id, red.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TraitNotInVariant { .. }));
    }
}
