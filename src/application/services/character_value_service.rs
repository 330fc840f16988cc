//! Character Value Service - Application service for stored trait values
//!
//! Characters are registered against a variant; their trait values are
//! stored flat and replaced wholesale, never patched row by row.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::ports::outbound::{CharacterRepositoryPort, TraitCatalogRepositoryPort};
use crate::domain::entities::Character;
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{
    CharacterId, SpeciesVariantId, TraitId, TraitValue, TraitValueRecord,
};

/// Service for character registration and trait value storage
pub struct CharacterValueService {
    catalog: Arc<dyn TraitCatalogRepositoryPort>,
    characters: Arc<dyn CharacterRepositoryPort>,
}

impl CharacterValueService {
    pub fn new(
        catalog: Arc<dyn TraitCatalogRepositoryPort>,
        characters: Arc<dyn CharacterRepositoryPort>,
    ) -> Self {
        Self {
            catalog,
            characters,
        }
    }

    #[instrument(skip(self), fields(variant_id = %variant_id, name = %name))]
    pub async fn register_character(
        &self,
        name: &str,
        variant_id: SpeciesVariantId,
    ) -> Result<Character, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidName("name cannot be empty".to_string()));
        }
        if name.len() > 255 {
            return Err(EngineError::InvalidName(
                "name cannot exceed 255 characters".to_string(),
            ));
        }

        self.catalog
            .get_variant(variant_id)
            .await?
            .ok_or(EngineError::VariantNotFound(variant_id))?;

        let character = Character::new(name, variant_id);
        self.characters.create(&character).await?;

        info!(character_id = %character.id, "Registered character: {}", character.name);
        Ok(character)
    }

    #[instrument(skip(self))]
    pub async fn get_character(&self, id: CharacterId) -> Result<Character, EngineError> {
        self.characters
            .get(id)
            .await?
            .ok_or(EngineError::CharacterNotFound(id))
    }

    /// A character's stored values grouped by trait. Multi-value traits
    /// map to several values in stored order.
    #[instrument(skip(self))]
    pub async fn get_values(
        &self,
        character_id: CharacterId,
    ) -> Result<BTreeMap<TraitId, Vec<TraitValue>>, EngineError> {
        debug!(character_id = %character_id, "Fetching trait values");
        self.characters.get_values(character_id).await
    }

    /// Replace the character's whole value set. Validation and the swap
    /// happen in one atomic step, so a bad set leaves the old one intact.
    #[instrument(skip(self, values), fields(character_id = %character_id, count = values.len()))]
    pub async fn replace_values(
        &self,
        character_id: CharacterId,
        values: &[TraitValueRecord],
    ) -> Result<(), EngineError> {
        self.characters.replace_values(character_id, values).await?;

        info!(
            character_id = %character_id,
            count = values.len(),
            "Replaced trait values"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::trait_catalog_service::{
        DefineTraitRequest, TraitCatalogService,
    };
    use crate::domain::value_objects::TraitValueType;
    use crate::infrastructure::persistence::InMemoryTraitStore;

    async fn setup() -> (TraitCatalogService, CharacterValueService, SpeciesVariantId) {
        let store = Arc::new(InMemoryTraitStore::new());
        let catalog = TraitCatalogService::new(store.clone());
        let values = CharacterValueService::new(store.clone(), store);

        let species = catalog.create_species("Dragon").await.unwrap();
        let variant = catalog.create_variant(species.id, "Royal").await.unwrap();
        (catalog, values, variant.id)
    }

    #[tokio::test]
    async fn register_requires_existing_variant() {
        let (_, values, _) = setup().await;
        let missing = SpeciesVariantId::new();

        let err = values
            .register_character("Ember", missing)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::VariantNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn replace_values_round_trips_grouped_by_trait() {
        let (catalog, values, variant_id) = setup().await;
        let species_id = catalog.get_variant(variant_id).await.unwrap().species_id;
        let age = catalog
            .define_trait(DefineTraitRequest {
                species_id,
                name: "Age".to_string(),
                value_type: TraitValueType::Integer,
                allows_multiple_values: false,
            })
            .await
            .unwrap();

        let character = values
            .register_character("Ember", variant_id)
            .await
            .unwrap();
        values
            .replace_values(
                character.id,
                &[TraitValueRecord::new(age.id, TraitValue::Integer(5))],
            )
            .await
            .unwrap();

        let stored = values.get_values(character.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[&age.id], vec![TraitValue::Integer(5)]);
    }

    #[tokio::test]
    async fn invalid_set_leaves_previous_values() {
        let (catalog, values, variant_id) = setup().await;
        let species_id = catalog.get_variant(variant_id).await.unwrap().species_id;
        let age = catalog
            .define_trait(DefineTraitRequest {
                species_id,
                name: "Age".to_string(),
                value_type: TraitValueType::Integer,
                allows_multiple_values: false,
            })
            .await
            .unwrap();

        let character = values
            .register_character("Ember", variant_id)
            .await
            .unwrap();
        values
            .replace_values(
                character.id,
                &[TraitValueRecord::new(age.id, TraitValue::Integer(5))],
            )
            .await
            .unwrap();

        let err = values
            .replace_values(
                character.id,
                &[
                    TraitValueRecord::new(age.id, TraitValue::Integer(6)),
                    TraitValueRecord::new(age.id, TraitValue::Integer(7)),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MultiplicityViolation(_)));

        let stored = values.get_values(character.id).await.unwrap();
        assert_eq!(stored[&age.id], vec![TraitValue::Integer(5)]);
    }

    #[tokio::test]
    async fn replace_with_empty_set_clears_values() {
        let (catalog, values, variant_id) = setup().await;
        let species_id = catalog.get_variant(variant_id).await.unwrap().species_id;
        let age = catalog
            .define_trait(DefineTraitRequest {
                species_id,
                name: "Age".to_string(),
                value_type: TraitValueType::Integer,
                allows_multiple_values: false,
            })
            .await
            .unwrap();

        let character = values
            .register_character("Ember", variant_id)
            .await
            .unwrap();
        values
            .replace_values(
                character.id,
                &[TraitValueRecord::new(age.id, TraitValue::Integer(5))],
            )
            .await
            .unwrap();
        values.replace_values(character.id, &[]).await.unwrap();

        let stored = values.get_values(character.id).await.unwrap();
        assert!(stored.is_empty());
    }
}
